use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Identity of a connected participant (rider or driver).
///
/// This is the transport's connection identity, so a participant that reconnects gets a
/// new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Last known position of a connected driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverPosition {
    pub driver: ParticipantId,
    pub coordinate: Coordinate,
    /// When the driver last reported this coordinate.
    pub reported_at: DateTime<Utc>,
}

/// A driver returned by a nearby search, with its distance from the search origin.
///
/// Serialized as the driver record sent to the rider in `DRIVER_FOUND`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyDriver {
    #[serde(rename = "socketId")]
    pub driver: ParticipantId,
    pub coordinate: Coordinate,
    #[serde(rename = "distanceMeters")]
    pub distance_m: f64,
}
