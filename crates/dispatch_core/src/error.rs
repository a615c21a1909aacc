use crate::dispatch::ProposalToken;
use crate::types::ParticipantId;

/// Failures of the driver location store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not serve the request.
    #[error("location store unavailable: {0}")]
    Unavailable(String),

    /// The coordinate is not a valid point on the globe.
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// A driver's answer could not be matched to a pending proposal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposalError {
    /// Never issued, already answered, expired, or withdrawn.
    #[error("no pending proposal for token {0}")]
    UnknownToken(ProposalToken),

    #[error("proposal {token} is addressed to {addressee}, not {responder}")]
    NotAddressee {
        token: ProposalToken,
        addressee: ParticipantId,
        responder: ParticipantId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
