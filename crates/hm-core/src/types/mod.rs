pub mod enums;
pub mod event;
pub mod ids;
pub mod io;
pub mod media;

pub use enums::Category;
pub use event::{expiry_cutoff, Event, NewEvent, EVENT_TTL_SECS};
pub use ids::{EventId, IdError, MediaId, UserId};
pub use io::{CreateEventInput, NearbyQuery, DEFAULT_RADIUS_M};
pub use media::{MediaDownload, MediaFile, MediaRef, MediaUpload};
