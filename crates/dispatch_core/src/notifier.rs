//! Ride session notifier: relays pickup and completion signals between matched parties.

use std::sync::Arc;

use tracing::debug;

use crate::events::OutboundEvent;
use crate::registry::ConnectionRegistry;
use crate::types::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideSignal {
    ConfirmPickup,
    FinishRide,
}

impl RideSignal {
    fn event(self, from: ParticipantId) -> OutboundEvent {
        match self {
            Self::ConfirmPickup => OutboundEvent::ConfirmPickup { from },
            Self::FinishRide => OutboundEvent::FinishRide { from },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Delivered,
    RecipientUnreachable,
}

/// Fire-and-forget relay. Never alters dispatch state.
pub struct SessionNotifier {
    registry: Arc<ConnectionRegistry>,
}

impl SessionNotifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `signal` from `from` to `to`. If `to` has no live channel, `from` is told
    /// with `PEER_UNREACHABLE` instead.
    pub fn relay(&self, from: &ParticipantId, to: &ParticipantId, signal: RideSignal) -> Relay {
        if self.registry.send(to, signal.event(from.clone())) {
            return Relay::Delivered;
        }
        debug!(%from, %to, ?signal, "relay recipient unreachable");
        self.registry
            .send(from, OutboundEvent::PeerUnreachable { peer: to.clone() });
        Relay::RecipientUnreachable
    }
}
