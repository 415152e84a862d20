use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds coordinates only when both halves of the pair are present.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }

    /// Like [`Coordinates::from_parts`], but a half pair or an out-of-range
    /// value is a validation error instead of being dropped.
    pub fn parse_pair(lat: Option<f64>, lng: Option<f64>) -> AppResult<Option<Self>> {
        match (lat, lng) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(AppError::invalid_field("lng", "lng is required when lat is given")),
            (None, Some(_)) => Err(AppError::invalid_field("lat", "lat is required when lng is given")),
            (Some(lat), Some(lng)) => {
                if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                    return Err(AppError::invalid_field("lat", "lat must be between -90 and 90"));
                }
                if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
                    return Err(AppError::invalid_field("lng", "lng must be between -180 and 180"));
                }
                Ok(Some(Self { lat, lng }))
            }
        }
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(*self, *other)
    }
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}
