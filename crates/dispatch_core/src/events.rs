//! Wire events exchanged with riders and drivers.
//!
//! Every frame is `{"event": "<NAME>", "data": <payload>}`; events without a payload omit
//! `data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::ProposalToken;
use crate::geo::Coordinate;
use crate::types::{NearbyDriver, ParticipantId};

/// Events a client sends to the dispatch core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundEvent {
    UpdateDriverPos(PositionReport),
    SearchDriver(SearchRequest),
    /// A driver's answer to a `DRIVER_RIDE_PROPOSAL`.
    ProposalResponse {
        token: ProposalToken,
        accepted: bool,
    },
    /// Carries the counterpart's identity.
    ConfirmPickup(ParticipantId),
    /// Carries the counterpart's identity.
    FinishRide(ParticipantId),
}

/// Events the dispatch core sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundEvent {
    /// First frame on every connection: the identity the client is known by.
    Connected {
        #[serde(rename = "socketId")]
        socket_id: ParticipantId,
    },
    DriverRideProposal {
        token: ProposalToken,
        rider: RiderPayload,
    },
    /// The driver did not answer in time; the offer has moved on.
    ProposalExpired { token: ProposalToken },
    DriverFound(NearbyDriver),
    DriverNotFound,
    ConfirmPickup { from: ParticipantId },
    FinishRide { from: ParticipantId },
    /// The counterpart of a relayed signal or of a fresh match has no live channel.
    PeerUnreachable { peer: ParticipantId },
    /// The last inbound frame could not be decoded.
    Error { message: String },
}

impl OutboundEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "CONNECTED",
            Self::DriverRideProposal { .. } => "DRIVER_RIDE_PROPOSAL",
            Self::ProposalExpired { .. } => "PROPOSAL_EXPIRED",
            Self::DriverFound(_) => "DRIVER_FOUND",
            Self::DriverNotFound => "DRIVER_NOT_FOUND",
            Self::ConfirmPickup { .. } => "CONFIRM_PICKUP",
            Self::FinishRide { .. } => "FINISH_RIDE",
            Self::PeerUnreachable { .. } => "PEER_UNREACHABLE",
            Self::Error { .. } => "ERROR",
        }
    }
}

/// A driver's position update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    /// Identity the client believes it has. The connection identity is authoritative.
    #[serde(rename = "socketId", default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<ParticipantId>,
    pub coordinate: Coordinate,
}

/// A rider's search request as sent on the wire.
///
/// Fields other than `rideStart` are not interpreted; they travel to candidate drivers
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "rideStart")]
    pub ride_start: RideStart,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideStart {
    pub coords: Coordinate,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The rider request shown to a candidate driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderPayload {
    #[serde(rename = "socketId")]
    pub socket_id: ParticipantId,
    #[serde(flatten)]
    pub request: SearchRequest,
}
