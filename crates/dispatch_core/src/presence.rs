//! Presence lifecycle: binds a participant's channel on connect, records driver positions,
//! and purges everything tied to a connection when it drops.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::dispatch::Coordinator;
use crate::error::StoreError;
use crate::geo::Coordinate;
use crate::location::DriverLocationStore;
use crate::registry::{Channel, ConnectionRegistry};
use crate::types::ParticipantId;

pub struct PresenceHandler {
    store: Arc<dyn DriverLocationStore>,
    registry: Arc<ConnectionRegistry>,
    coordinator: Arc<Coordinator>,
}

impl PresenceHandler {
    pub fn new(
        store: Arc<dyn DriverLocationStore>,
        registry: Arc<ConnectionRegistry>,
        coordinator: Arc<Coordinator>,
    ) -> Self {
        Self {
            store,
            registry,
            coordinator,
        }
    }

    pub fn on_connect(&self, participant: ParticipantId, channel: Arc<dyn Channel>) {
        debug!(%participant, "participant connected");
        self.registry.bind(participant, channel);
    }

    pub fn on_position_report(
        &self,
        driver: &ParticipantId,
        coordinate: Coordinate,
    ) -> Result<(), StoreError> {
        self.store.upsert(driver, coordinate)
    }

    /// Forget everything tied to `participant`. Safe for riders and for drivers that never
    /// reported a position.
    pub fn on_disconnect(&self, participant: &ParticipantId) {
        self.registry.unbind(participant);
        match self.store.remove(participant) {
            Ok(true) => debug!(%participant, "driver position removed"),
            Ok(false) => {}
            Err(error) => warn!(%participant, %error, "failed to remove driver position"),
        }
        let withdrawn = self.coordinator.withdraw_proposals(participant);
        if withdrawn > 0 {
            debug!(%participant, withdrawn, "withdrew open proposals");
        }
        if let Some(rider) = self.coordinator.release_driver(participant) {
            debug!(%participant, %rider, "released driver from active ride");
        }
    }
}
