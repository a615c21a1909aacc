use dispatch_core::error::ConfigError;

/// Errors that can occur when starting or running the dispatch server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind error: {0}")]
    Bind(String),

    /// The server hit a fatal I/O error while serving.
    #[error("serve error: {0}")]
    Serve(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A frame the client sent could not be turned into an inbound event.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
