//! Driver location store: the authoritative last-known position of every connected driver.
//!
//! [`DriverLocationStore`] is the seam a persistent geospatial backend plugs into;
//! [`InMemoryLocationStore`] is the H3-bucketed implementation the server runs with.

mod index;
mod memory;

pub use memory::InMemoryLocationStore;

use crate::error::StoreError;
use crate::geo::Coordinate;
use crate::types::{NearbyDriver, ParticipantId};

/// Upsert / remove / nearest-first radius query over driver positions.
///
/// Mutations must be atomic with respect to `find_nearby`: a reader never observes a
/// half-written record, and a query issued after `upsert` or `remove` returns reflects it.
pub trait DriverLocationStore: Send + Sync {
    /// Create or overwrite the position of `driver`.
    fn upsert(&self, driver: &ParticipantId, coordinate: Coordinate) -> Result<(), StoreError>;

    /// Delete the position of `driver`. Returns whether a record existed.
    fn remove(&self, driver: &ParticipantId) -> Result<bool, StoreError>;

    /// Drivers within `max_distance_m` of `origin`, nearest first.
    ///
    /// Equal distances keep the store's own order.
    fn find_nearby(
        &self,
        origin: Coordinate,
        max_distance_m: f64,
    ) -> Result<Vec<NearbyDriver>, StoreError>;
}
