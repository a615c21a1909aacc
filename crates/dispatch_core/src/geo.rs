//! Geographic primitives: validated coordinates, great-circle distance, and H3 cell lookup.
//!
//! Distances are haversine distances on a spherical Earth, the same metric geospatial
//! indexes use for "near" queries.

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on the globe in decimal degrees.
///
/// Deserialization accepts either JSON numbers or numeric strings, since mobile clients
/// send the coordinates of a ride start as strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: f64,
}

impl Coordinate {
    /// Build a validated coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, StoreError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let valid = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// The H3 cell containing this coordinate at `resolution`.
    pub fn to_cell(self, resolution: Resolution) -> Result<CellIndex, StoreError> {
        self.validate()?;
        let latlng = LatLng::new(self.latitude, self.longitude).map_err(|_| {
            StoreError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            }
        })?;
        Ok(latlng.to_cell(resolution))
    }
}

/// Great-circle distance between two coordinates in metres.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
