use crate::error::HazardError;
use crate::events::EventRepository;
use crate::media::MediaRepository;

pub trait Store {
    type Events<'a>: EventRepository
    where
        Self: 'a;
    type Media<'a>: MediaRepository
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_>;
    fn media(&self) -> Self::Media<'_>;

    fn with_tx<F, T>(&self, f: F) -> Result<T, HazardError>
    where
        F: FnOnce(&Self) -> Result<T, HazardError>;
}
