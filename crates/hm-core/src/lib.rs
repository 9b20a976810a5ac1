pub mod clock;
pub mod error;
pub mod events;
pub mod geo;
pub mod hazardmap;
pub mod media;
pub mod store;
pub mod validation;

pub mod types;

#[cfg(test)]
mod testing;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::error::HazardError;
pub use crate::hazardmap::{Hazardmap, RequestContext};
pub use crate::store::Store;
