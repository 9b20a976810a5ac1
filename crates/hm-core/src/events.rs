use crate::error::EventError;
use crate::types::{Event, EventId, NearbyQuery, NewEvent};
use chrono::{DateTime, Utc};

/// Persistence for events. Every read takes `now` and must hide records
/// whose TTL has elapsed at that instant, whether or not they were swept.
pub trait EventRepository {
    fn insert(&self, event: NewEvent, now: DateTime<Utc>) -> Result<Event, EventError>;
    fn get(&self, id: &EventId, now: DateTime<Utc>) -> Result<Option<Event>, EventError>;
    /// Live events within the radius, newest first.
    fn near(&self, query: &NearbyQuery, now: DateTime<Utc>) -> Result<Vec<Event>, EventError>;
    fn delete(&self, id: &EventId) -> Result<(), EventError>;
    /// Physically removes expired records, returning how many went.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, EventError>;
}
