use dispatch_core::error::StoreError;
use dispatch_core::geo::Coordinate;
use dispatch_core::location::DriverLocationStore;
use dispatch_core::types::NearbyDriver;
use dispatch_core::ParticipantId;

/// A location store whose backend is down.
#[derive(Debug, Default)]
pub struct UnreachableStore;

impl DriverLocationStore for UnreachableStore {
    fn upsert(&self, _driver: &ParticipantId, _coordinate: Coordinate) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn remove(&self, _driver: &ParticipantId) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn find_nearby(
        &self,
        _origin: Coordinate,
        _max_distance_m: f64,
    ) -> Result<Vec<NearbyDriver>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// A store that returns a fixed candidate list regardless of the query.
#[derive(Debug, Default)]
pub struct FixedStore(pub Vec<NearbyDriver>);

impl DriverLocationStore for FixedStore {
    fn upsert(&self, _driver: &ParticipantId, _coordinate: Coordinate) -> Result<(), StoreError> {
        Ok(())
    }

    fn remove(&self, _driver: &ParticipantId) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn find_nearby(
        &self,
        _origin: Coordinate,
        _max_distance_m: f64,
    ) -> Result<Vec<NearbyDriver>, StoreError> {
        Ok(self.0.clone())
    }
}
