use crate::geo::GeoPoint;
use crate::types::enums::Category;
use crate::types::ids::{EventId, UserId};
use crate::types::media::MediaRef;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifetime of an event; older records are unreachable and get swept.
pub const EVENT_TTL_SECS: i64 = 86_400;

/// Events created at or before this instant are expired at `now`.
pub fn expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::seconds(EVENT_TTL_SECS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[schema(value_type = crate::geo::GeoJsonPoint)]
    pub location: GeoPoint,
    pub category: Category,
    pub description: String,
    pub media: Vec<MediaRef>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub created_by: UserId,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created_at <= expiry_cutoff(now)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + TimeDelta::seconds(EVENT_TTL_SECS)
    }
}

/// A validated submission, ready for the store to assign id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub location: GeoPoint,
    pub category: Category,
    pub description: String,
    pub media: Vec<MediaRef>,
    pub created_by: UserId,
}
