//! WebSocket transport for the dispatch core.
//!
//! Every connection gets a fresh identity, is bound in the connection registry, and has its
//! JSON frames decoded into [`dispatch_core::events::InboundEvent`]s. Outbound events queued
//! by the core are written back on the same socket.

pub mod config;
pub mod error;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use error::{ProtocolError, ServerError};
pub use server::start_server;
pub use state::AppState;
