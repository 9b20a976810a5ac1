use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_RADIUS_M: u32 = 5_000;

/// Raw submission fields; every one is optional so missing input surfaces
/// as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateEventInput {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub center: GeoPoint,
    pub radius_m: u32,
}

impl NearbyQuery {
    pub fn new(center: GeoPoint, radius_m: Option<u32>) -> Self {
        Self {
            center,
            radius_m: radius_m.unwrap_or(DEFAULT_RADIUS_M),
        }
    }
}
