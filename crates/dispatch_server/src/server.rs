//! Server lifecycle: bind, serve until `Ctrl-C`, and sweep stale driver positions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dispatch_core::location::InMemoryLocationStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::router::build_router;
use crate::state::AppState;

/// Bind to the configured address and serve until the process is interrupted.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot bind, or serving
/// fails with a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;
    info!(%addr, "dispatch server listening");

    serve(listener, config, state).await
}

/// Serve on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<(), ServerError> {
    let sweeper = config
        .sweep_interval()
        .map(|period| spawn_sweeper(Arc::clone(state.store()), period));

    let result = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")));

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    result
}

/// Periodically drop positions older than the store's TTL. A store without a TTL makes
/// every sweep a no-op.
pub fn spawn_sweeper(store: Arc<InMemoryLocationStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_stale(Utc::now()) {
                Ok(0) => {}
                Ok(purged) => info!(purged, "swept stale driver positions"),
                Err(error) => warn!(%error, "stale position sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use dispatch_core::config::LocationConfig;
    use dispatch_core::ParticipantId;

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_positions_past_ttl() {
        let config = LocationConfig::default().with_position_ttl_secs(60);
        let store = Arc::new(InMemoryLocationStore::new(&config).expect("store"));
        let coordinate = dispatch_core::test_helpers::ORIGIN;
        store
            .upsert_at(
                &ParticipantId::from("stale"),
                coordinate,
                Utc::now() - ChronoDuration::minutes(10),
            )
            .expect("upsert");
        store
            .upsert_at(&ParticipantId::from("fresh"), coordinate, Utc::now())
            .expect("upsert");

        let sweeper = spawn_sweeper(Arc::clone(&store), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(1)).await;
        sweeper.abort();

        assert_eq!(store.len().expect("len"), 1);
        assert!(store.get(&ParticipantId::from("fresh")).expect("get").is_some());
    }
}
