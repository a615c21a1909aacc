//! Transport-independent entry point: wires the components together and routes inbound
//! events to them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::dispatch::{Coordinator, DispatchOutcome, RideRequest};
use crate::events::{InboundEvent, OutboundEvent};
use crate::location::DriverLocationStore;
use crate::notifier::{Relay, RideSignal, SessionNotifier};
use crate::presence::PresenceHandler;
use crate::registry::{Channel, ConnectionRegistry};
use crate::types::ParticipantId;

/// What handling an inbound event produced.
#[derive(Debug)]
pub enum Handled {
    /// The event was applied synchronously.
    Done,
    /// A dispatch attempt was started in the background.
    Search(JoinHandle<DispatchOutcome>),
    Relayed(Relay),
    /// The event was understood but refused; the reason has been logged.
    Refused,
}

pub struct DispatchService {
    store: Arc<dyn DriverLocationStore>,
    registry: Arc<ConnectionRegistry>,
    coordinator: Arc<Coordinator>,
    notifier: SessionNotifier,
    presence: PresenceHandler,
}

impl DispatchService {
    pub fn new(store: Arc<dyn DriverLocationStore>, config: DispatchConfig) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            config,
        ));
        Arc::new(Self {
            notifier: SessionNotifier::new(Arc::clone(&registry)),
            presence: PresenceHandler::new(
                Arc::clone(&store),
                Arc::clone(&registry),
                Arc::clone(&coordinator),
            ),
            store,
            registry,
            coordinator,
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<dyn DriverLocationStore> {
        &self.store
    }

    /// Bind `participant` and greet it with its identity.
    pub fn connect(&self, participant: ParticipantId, channel: Arc<dyn Channel>) {
        self.presence.on_connect(participant.clone(), channel);
        self.registry.send(
            &participant,
            OutboundEvent::Connected {
                socket_id: participant.clone(),
            },
        );
    }

    pub fn disconnect(&self, participant: &ParticipantId) {
        self.presence.on_disconnect(participant);
    }

    /// Apply one inbound event from `from`. Searches run on their own task so the caller's
    /// read loop is never held up by a proposal wait.
    pub fn handle(self: &Arc<Self>, from: &ParticipantId, event: InboundEvent) -> Handled {
        match event {
            InboundEvent::UpdateDriverPos(report) => {
                if let Some(claimed) = report.socket_id.as_ref().filter(|id| *id != from) {
                    debug!(%from, %claimed, "position report names another identity; using connection identity");
                }
                match self.presence.on_position_report(from, report.coordinate) {
                    Ok(()) => Handled::Done,
                    Err(error) => {
                        warn!(driver = %from, %error, "position update rejected");
                        Handled::Refused
                    }
                }
            }
            InboundEvent::SearchDriver(request) => {
                let request = RideRequest::new(from.clone(), request);
                let coordinator = Arc::clone(&self.coordinator);
                Handled::Search(tokio::spawn(async move { coordinator.search(request).await }))
            }
            InboundEvent::ProposalResponse { token, accepted } => {
                match self.coordinator.respond(token, from, accepted) {
                    Ok(()) => Handled::Done,
                    Err(error) => {
                        debug!(driver = %from, %error, "late or misaddressed proposal response");
                        Handled::Refused
                    }
                }
            }
            InboundEvent::ConfirmPickup(to) => {
                Handled::Relayed(self.notifier.relay(from, &to, RideSignal::ConfirmPickup))
            }
            InboundEvent::FinishRide(to) => {
                if let Some(driver) = self.coordinator.finish_ride(from, &to) {
                    debug!(%driver, "ride finished; driver available again");
                }
                Handled::Relayed(self.notifier.relay(from, &to, RideSignal::FinishRide))
            }
        }
    }
}
