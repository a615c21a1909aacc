use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::ParticipantId;

/// Drivers currently committed to a ride, with the rider they serve.
#[derive(Debug, Default)]
pub struct ActiveRides {
    rider_by_driver: DashMap<ParticipantId, ParticipantId>,
}

impl ActiveRides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `driver` busy with `rider`. False if the driver is already busy.
    pub fn claim(&self, driver: &ParticipantId, rider: &ParticipantId) -> bool {
        match self.rider_by_driver.entry(driver.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(rider.clone());
                true
            }
        }
    }

    /// Free `driver`. Returns the rider it was serving, if any.
    pub fn release(&self, driver: &ParticipantId) -> Option<ParticipantId> {
        self.rider_by_driver.remove(driver).map(|(_, rider)| rider)
    }

    /// Free `driver` only if it is serving `rider`.
    pub fn release_ride(&self, driver: &ParticipantId, rider: &ParticipantId) -> bool {
        self.rider_by_driver
            .remove_if(driver, |_, current| current == rider)
            .is_some()
    }

    pub fn is_busy(&self, driver: &ParticipantId) -> bool {
        self.rider_by_driver.contains_key(driver)
    }

    pub fn len(&self) -> usize {
        self.rider_by_driver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rider_by_driver.is_empty()
    }
}
