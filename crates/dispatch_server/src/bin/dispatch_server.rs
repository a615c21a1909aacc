//! Dispatch server binary.
//!
//! ```bash
//! DISPATCH_PORT=9000 LOCATION_POSITION_TTL_SECS=120 RUST_LOG=debug dispatch_server
//! ```

use std::sync::Arc;

use clap::Parser;
use dispatch_server::config::CoreSettings;
use dispatch_server::{start_server, AppState, ServerConfig, ServerError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ServerConfig::parse();
    let settings = CoreSettings::from_env()?;
    info!(
        search_radius_m = settings.dispatch.search_radius_m,
        proposal_timeout_ms = settings.dispatch.proposal_timeout_ms,
        exclude_busy_drivers = settings.dispatch.exclude_busy_drivers,
        h3_resolution = settings.location.h3_resolution,
        position_ttl_secs = ?settings.location.position_ttl_secs,
        "dispatch server starting"
    );

    let state = Arc::new(AppState::new(settings.dispatch, &settings.location)?);
    start_server(&config, state).await
}
