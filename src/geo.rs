// src/geo.rs
//! Geo primitives: validated lat/lng points, haversine distance, and the
//! radius filter used by location-scoped feeds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::types::CandidateResult;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Rejects out-of-range coordinates instead of clamping them.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&lat) || lat.is_nan() {
            return Err(ValidationError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) || lng.is_nan() {
            return Err(ValidationError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }
}

/// Great-circle distance in kilometers between two points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Keep candidates within `radius_km` of `center`.
///
/// Candidates without coordinates fall back to a case-insensitive substring
/// containment check between their location-name hint and
/// `fallback_location_name`. Candidates with neither are excluded: for a
/// geo-scoped feed, precision beats recall.
pub fn filter_by_radius(
    pool: Vec<CandidateResult>,
    center: GeoPoint,
    radius_km: f64,
    fallback_location_name: Option<&str>,
) -> Vec<CandidateResult> {
    pool.into_iter()
        .filter(|c| match c.coordinates {
            Some(coords) => haversine_km(center, coords) <= radius_km,
            None => {
                let hit = name_hint_matches(c.location_name_hint.as_deref(), fallback_location_name);
                if hit {
                    debug!(id = %c.id, "geo filter: kept via location-name fallback");
                }
                hit
            }
        })
        .collect()
}

fn name_hint_matches(hint: Option<&str>, fallback: Option<&str>) -> bool {
    let (Some(hint), Some(fallback)) = (hint, fallback) else {
        return false;
    };
    let hint = hint.trim().to_lowercase();
    let fallback = fallback.trim().to_lowercase();
    if hint.is_empty() || fallback.is_empty() {
        return false;
    }
    hint.contains(&fallback) || fallback.contains(&hint)
}
