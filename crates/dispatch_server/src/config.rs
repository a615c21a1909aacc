//! Command-line and environment configuration for the server binary.

use std::time::Duration;

use clap::Parser;
use dispatch_core::config::{DispatchConfig, LocationConfig};
use dispatch_core::error::ConfigError;

/// Real-time ride dispatch over WebSocket.
#[derive(Parser, Debug, Clone)]
#[command(name = "dispatch_server")]
#[command(version)]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(long, env = "DISPATCH_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on
    #[arg(long, env = "DISPATCH_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds between stale-position sweeps; 0 disables the sweeper
    #[arg(long, env = "DISPATCH_SWEEP_INTERVAL_SECS", default_value_t = 30)]
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
            sweep_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Core settings read from the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    pub dispatch: DispatchConfig,
    pub location: LocationConfig,
}

impl CoreSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dispatch: DispatchConfig::from_env()?,
            location: LocationConfig::from_env()?,
        })
    }
}
