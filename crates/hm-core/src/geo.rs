//! Spherical geometry for proximity queries.
//!
//! Distances use a spherical Earth with the equatorial radius MongoDB's
//! `2dsphere` index uses for meter distances.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;
use utoipa::ToSchema;

/// Earth's radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Slack added to the bounding box so points sitting exactly on the radius
/// survive the prefilter and are decided by the exact distance check.
const BOX_EPSILON_DEG: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// A validated WGS84 position. Wire form is a GeoJSON point, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "GeoJsonPoint", try_from = "GeoJsonPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() {
            return Err(GeoError::NotFinite { field: "lat" });
        }
        if !lng.is_finite() {
            return Err(GeoError::NotFinite { field: "lng" });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::OutOfRange {
                field: "lat",
                value: lat,
            });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::OutOfRange {
                field: "lng",
                value: lng,
            });
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// `[longitude, latitude]`, the order the record is stored in.
    pub fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeoJsonPoint {
    /// Always `"Point"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(value: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: value.coordinates(),
        }
    }
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = String;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(format!("unsupported geometry type: {}", value.kind));
        }
        let [lng, lat] = value.coordinates;
        GeoPoint::new(lat, lng).map_err(|err| err.to_string())
    }
}

/// Great-circle distance in meters (haversine).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat * DEG_TO_RAD;
    let lat2 = b.lat * DEG_TO_RAD;
    let dlat = (b.lat - a.lat) * DEG_TO_RAD;
    let dlng = (b.lng - a.lng) * DEG_TO_RAD;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let central_angle = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_M * central_angle
}

/// Coordinate window guaranteed to contain every point within a radius.
///
/// Longitude is expressed as one or two closed ranges; a window crossing the
/// antimeridian is split so each range stays inside `[-180, 180]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lng_ranges: Vec<(f64, f64)>,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_m: u32) -> Self {
        let angular = f64::from(radius_m) / EARTH_RADIUS_M;
        let dlat = angular * RAD_TO_DEG + BOX_EPSILON_DEG;
        let min_lat = center.lat - dlat;
        let max_lat = center.lat + dlat;

        if min_lat <= -90.0 || max_lat >= 90.0 || angular >= PI {
            return Self {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                lng_ranges: vec![(-180.0, 180.0)],
            };
        }

        // Widest longitude spread over the latitude band, per the tangent
        // meridian bound: asin(sin(d) / cos(lat)).
        let lat_rad = center.lat * DEG_TO_RAD;
        let ratio = angular.sin() / lat_rad.cos();
        if ratio >= 1.0 {
            return Self {
                min_lat,
                max_lat,
                lng_ranges: vec![(-180.0, 180.0)],
            };
        }
        let dlng = ratio.asin() * RAD_TO_DEG + BOX_EPSILON_DEG;
        let min_lng = center.lng - dlng;
        let max_lng = center.lng + dlng;

        let lng_ranges = if min_lng < -180.0 {
            vec![(min_lng + 360.0, 180.0), (-180.0, max_lng)]
        } else if max_lng > 180.0 {
            vec![(min_lng, 180.0), (-180.0, max_lng - 360.0)]
        } else {
            vec![(min_lng, max_lng)]
        };

        Self {
            min_lat,
            max_lat,
            lng_ranges,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && self
                .lng_ranges
                .iter()
                .any(|(min, max)| (*min..=*max).contains(&point.lng))
    }
}
