//! Connection registry: which participant is reachable over which live channel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::OutboundEvent;
use crate::types::ParticipantId;

/// A live, outbound half of a participant's connection.
pub trait Channel: Send + Sync {
    /// Hand `event` to the transport. Returns `false` when the peer is gone.
    fn deliver(&self, event: OutboundEvent) -> bool;
}

/// Channel backed by an unbounded tokio mpsc sender, drained by the connection task.
#[derive(Debug, Clone)]
pub struct MpscChannel(mpsc::UnboundedSender<OutboundEvent>);

impl MpscChannel {
    /// Create a channel and the receiver its connection task forwards from.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl Channel for MpscChannel {
    fn deliver(&self, event: OutboundEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Maps participant identities to their live channels.
///
/// Shared by every component; all operations are safe under concurrent use and never
/// fail because a participant is absent.
#[derive(Default)]
pub struct ConnectionRegistry {
    channels: DashMap<ParticipantId, Arc<dyn Channel>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `channel` with `participant`, replacing any earlier binding.
    pub fn bind(&self, participant: ParticipantId, channel: Arc<dyn Channel>) {
        if self.channels.insert(participant.clone(), channel).is_some() {
            debug!(%participant, "replaced existing channel binding");
        }
    }

    /// Remove the binding. Returns whether one existed.
    pub fn unbind(&self, participant: &ParticipantId) -> bool {
        self.channels.remove(participant).is_some()
    }

    pub fn is_reachable(&self, participant: &ParticipantId) -> bool {
        self.channels.contains_key(participant)
    }

    /// Best-effort delivery. Returns `false` if `participant` has no live channel; nothing
    /// is queued or retried.
    pub fn send(&self, participant: &ParticipantId, event: OutboundEvent) -> bool {
        // Clone the handle out so no map shard stays locked while the transport runs.
        let Some(channel) = self
            .channels
            .get(participant)
            .map(|entry| Arc::clone(entry.value()))
        else {
            debug!(%participant, event = event.name(), "recipient unreachable");
            return false;
        };
        let name = event.name();
        let delivered = channel.deliver(event);
        if !delivered {
            debug!(%participant, event = name, "channel closed before delivery");
        }
        delivered
    }

    /// Number of bound participants.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(registry: &ConnectionRegistry, id: &str) -> mpsc::UnboundedReceiver<OutboundEvent> {
        let (channel, rx) = MpscChannel::pair();
        registry.bind(ParticipantId::from(id), Arc::new(channel));
        rx
    }

    #[test]
    fn send_to_unknown_participant_reports_undelivered() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.is_reachable(&ParticipantId::from("ghost")));
        assert!(!registry.send(&ParticipantId::from("ghost"), OutboundEvent::DriverNotFound));
    }

    #[test]
    fn send_delivers_to_bound_channel() {
        let registry = ConnectionRegistry::new();
        let mut rx = bound(&registry, "rider-1");

        assert!(registry.send(&ParticipantId::from("rider-1"), OutboundEvent::DriverNotFound));
        assert_eq!(rx.try_recv().expect("event"), OutboundEvent::DriverNotFound);
    }

    #[test]
    fn bind_replaces_previous_channel() {
        let registry = ConnectionRegistry::new();
        let mut first = bound(&registry, "driver-1");
        let mut second = bound(&registry, "driver-1");

        assert!(registry.send(&ParticipantId::from("driver-1"), OutboundEvent::DriverNotFound));
        assert!(first.try_recv().is_err());
        assert!(second.try_recv().is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unbind_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let _rx = bound(&registry, "rider-1");
        let id = ParticipantId::from("rider-1");

        assert!(registry.unbind(&id));
        assert!(!registry.unbind(&id));
        assert!(!registry.is_reachable(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn closed_channel_reports_undelivered() {
        let registry = ConnectionRegistry::new();
        let rx = bound(&registry, "rider-1");
        drop(rx);

        assert!(!registry.send(&ParticipantId::from("rider-1"), OutboundEvent::DriverNotFound));
    }
}
