//! Dispatch and location-store configuration.
//!
//! Both structs deserialize with defaults for every field and can be loaded from
//! environment variables:
//!
//! - `DISPATCH_SEARCH_RADIUS_M` -- nearby search radius in metres (default 50 000)
//! - `DISPATCH_PROPOSAL_TIMEOUT_MS` -- how long a driver has to answer (default 15 000)
//! - `DISPATCH_EXCLUDE_BUSY` -- skip drivers already on a ride (default `true`)
//! - `LOCATION_H3_RESOLUTION` -- H3 bucket resolution, 0-15 (default 5)
//! - `LOCATION_POSITION_TTL_SECS` -- positions older than this are ignored (default unset)

use std::str::FromStr;
use std::time::Duration;

use h3o::Resolution;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SEARCH_RADIUS_M: f64 = 50_000.0;
const DEFAULT_PROPOSAL_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_H3_RESOLUTION: u8 = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchConfig {
    /// Only drivers within this great-circle distance of the pickup are candidates.
    #[serde(default = "default_search_radius_m")]
    pub search_radius_m: f64,
    /// Bound on the wait for one candidate's answer.
    #[serde(default = "default_proposal_timeout_ms")]
    pub proposal_timeout_ms: u64,
    /// When true, a driver matched to a notified rider is left out of other searches
    /// until the ride finishes or the driver disconnects.
    #[serde(default = "default_true")]
    pub exclude_busy_drivers: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            proposal_timeout_ms: DEFAULT_PROPOSAL_TIMEOUT_MS,
            exclude_busy_drivers: true,
        }
    }
}

impl DispatchConfig {
    pub fn proposal_timeout(&self) -> Duration {
        Duration::from_millis(self.proposal_timeout_ms)
    }

    pub fn with_proposal_timeout(mut self, timeout: Duration) -> Self {
        self.proposal_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_search_radius_m(mut self, radius_m: f64) -> Self {
        self.search_radius_m = radius_m;
        self
    }

    pub fn with_exclude_busy_drivers(mut self, exclude: bool) -> Self {
        self.exclude_busy_drivers = exclude;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let search_radius_m: f64 =
            parse_or(&lookup, "DISPATCH_SEARCH_RADIUS_M", defaults.search_radius_m)?;
        if !search_radius_m.is_finite() || search_radius_m < 0.0 {
            return Err(ConfigError::Invalid {
                key: "DISPATCH_SEARCH_RADIUS_M",
                message: format!("{search_radius_m} is not a non-negative distance"),
            });
        }
        Ok(Self {
            search_radius_m,
            proposal_timeout_ms: parse_or(
                &lookup,
                "DISPATCH_PROPOSAL_TIMEOUT_MS",
                defaults.proposal_timeout_ms,
            )?,
            exclude_busy_drivers: parse_or(
                &lookup,
                "DISPATCH_EXCLUDE_BUSY",
                defaults.exclude_busy_drivers,
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationConfig {
    /// H3 resolution drivers are bucketed at. Coarse cells keep 50 km searches cheap.
    #[serde(default = "default_h3_resolution")]
    pub h3_resolution: u8,
    /// Positions not refreshed within this many seconds are treated as absent.
    #[serde(default)]
    pub position_ttl_secs: Option<u64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            h3_resolution: DEFAULT_H3_RESOLUTION,
            position_ttl_secs: None,
        }
    }
}

impl LocationConfig {
    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        Resolution::try_from(self.h3_resolution).map_err(|error| ConfigError::Invalid {
            key: "LOCATION_H3_RESOLUTION",
            message: error.to_string(),
        })
    }

    pub fn position_ttl(&self) -> Option<chrono::Duration> {
        self.position_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }

    pub fn with_position_ttl_secs(mut self, secs: u64) -> Self {
        self.position_ttl_secs = Some(secs);
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            h3_resolution: parse_or(&lookup, "LOCATION_H3_RESOLUTION", DEFAULT_H3_RESOLUTION)?,
            position_ttl_secs: lookup("LOCATION_POSITION_TTL_SECS")
                .map(|raw| parse_value("LOCATION_POSITION_TTL_SECS", &raw))
                .transpose()?,
        };
        config.resolution()?;
        Ok(config)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|error: T::Err| ConfigError::Invalid {
        key,
        message: format!("{raw:?}: {error}"),
    })
}

fn default_search_radius_m() -> f64 {
    DEFAULT_SEARCH_RADIUS_M
}

fn default_proposal_timeout_ms() -> u64 {
    DEFAULT_PROPOSAL_TIMEOUT_MS
}

fn default_h3_resolution() -> u8 {
    DEFAULT_H3_RESOLUTION
}

fn default_true() -> bool {
    true
}
