use crate::error::EventError;
use crate::geo::GeoPoint;
use crate::types::media::MAX_MEDIA_PER_EVENT;
use crate::types::{Category, CreateEventInput, NewEvent, UserId};

/// Checks a raw submission and produces a record without media attached.
pub fn validate_new_event(
    input: &CreateEventInput,
    created_by: UserId,
) -> Result<NewEvent, EventError> {
    let mut missing = Vec::new();
    if input.lat.is_none() {
        missing.push("lat");
    }
    if input.lng.is_none() {
        missing.push("lng");
    }
    if input.category.as_deref().is_none_or(|value| value.trim().is_empty()) {
        missing.push("category");
    }
    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if description.is_none() {
        missing.push("description");
    }
    let (Some(lat), Some(lng), Some(category), Some(description)) =
        (input.lat, input.lng, input.category.as_deref(), description)
    else {
        return Err(EventError::InvalidInput {
            message: format!("missing required fields: {}", missing.join(", ")),
        });
    };

    let location = GeoPoint::new(lat, lng).map_err(|err| EventError::InvalidInput {
        message: err.to_string(),
    })?;
    let category = category
        .trim()
        .parse::<Category>()
        .map_err(|err| EventError::InvalidInput {
            message: err.to_string(),
        })?;

    Ok(NewEvent {
        location,
        category,
        description: description.to_string(),
        media: Vec::new(),
        created_by,
    })
}

pub fn validate_media_count(count: usize) -> Result<(), EventError> {
    if count > MAX_MEDIA_PER_EVENT {
        return Err(EventError::InvalidInput {
            message: format!("at most {MAX_MEDIA_PER_EVENT} media attachments allowed, got {count}"),
        });
    }
    Ok(())
}

/// Record-level invariants the store re-checks before persisting.
pub fn validate_event_record(event: &NewEvent) -> Result<(), EventError> {
    if event.description.trim().is_empty() {
        return Err(EventError::InvalidInput {
            message: "description must not be empty".to_string(),
        });
    }
    validate_media_count(event.media.len())
}
