use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use h3o::{CellIndex, Resolution};
use lru::LruCache;
use tracing::debug;

use super::index::DriverCellIndex;
use super::DriverLocationStore;
use crate::config::LocationConfig;
use crate::error::{ConfigError, StoreError};
use crate::geo::{distance_m, Coordinate};
use crate::types::{DriverPosition, NearbyDriver, ParticipantId};

/// Beyond this many rings a grid disk costs more than scanning every driver.
const MAX_DISK_RING: u32 = 64;

/// Grid disks reused across searches starting in the same cell.
const DISK_CACHE_CAPACITY: usize = 1_000;

/// In-process driver location store bucketed by H3 cell.
///
/// `find_nearby` gathers the drivers in the grid disk that covers the search radius,
/// keeps those whose haversine distance is within it, and orders them nearest first.
pub struct InMemoryLocationStore {
    index: RwLock<DriverCellIndex>,
    resolution: Resolution,
    position_ttl: Option<chrono::Duration>,
    disk_cache: GridDiskCache,
}

impl InMemoryLocationStore {
    pub fn new(config: &LocationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            index: RwLock::new(DriverCellIndex::default()),
            resolution: config.resolution()?,
            position_ttl: config.position_ttl(),
            disk_cache: GridDiskCache::new(),
        })
    }

    /// Upsert with an explicit report time.
    pub fn upsert_at(
        &self,
        driver: &ParticipantId,
        coordinate: Coordinate,
        reported_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let cell = coordinate.to_cell(self.resolution)?;
        let position = DriverPosition {
            driver: driver.clone(),
            coordinate,
            reported_at,
        };
        self.write()?.upsert(position, cell);
        Ok(())
    }

    /// `find_nearby` evaluated as of `now` for the staleness policy.
    pub fn find_nearby_at(
        &self,
        origin: Coordinate,
        max_distance_m: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbyDriver>, StoreError> {
        let origin_cell = origin.to_cell(self.resolution)?;
        if max_distance_m.is_nan() || max_distance_m < 0.0 {
            return Ok(Vec::new());
        }

        let index = self.read()?;
        let keep = |position: &DriverPosition| {
            if !self.is_fresh(position, now) {
                return None;
            }
            let distance = distance_m(origin, position.coordinate);
            (distance <= max_distance_m).then(|| NearbyDriver {
                driver: position.driver.clone(),
                coordinate: position.coordinate,
                distance_m: distance,
            })
        };

        let mut nearby: Vec<NearbyDriver> = match self.ring_span(max_distance_m) {
            Some(k) => {
                let cells = self.disk_cache.get_or_compute(origin_cell, k);
                index.in_cells(&cells).filter_map(keep).collect()
            }
            None => index.all().filter_map(keep).collect(),
        };
        drop(index);

        // Stable: equal distances keep bucket order.
        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(nearby)
    }

    /// Delete every position older than the configured TTL. Returns how many were removed.
    pub fn purge_stale(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        if self.position_ttl.is_none() {
            return Ok(0);
        }
        let mut index = self.write()?;
        let stale: Vec<ParticipantId> = index
            .all()
            .filter(|position| !self.is_fresh(position, now))
            .map(|position| position.driver.clone())
            .collect();
        for driver in &stale {
            index.remove(driver);
        }
        if !stale.is_empty() {
            debug!(purged = stale.len(), "purged stale driver positions");
        }
        Ok(stale.len())
    }

    pub fn get(&self, driver: &ParticipantId) -> Result<Option<DriverPosition>, StoreError> {
        Ok(self.read()?.get(driver).cloned())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn is_fresh(&self, position: &DriverPosition, now: DateTime<Utc>) -> bool {
        self.position_ttl
            .map_or(true, |ttl| now.signed_duration_since(position.reported_at) <= ttl)
    }

    /// Grid-disk radius (in rings) guaranteed to contain every cell holding a point within
    /// `max_distance_m`, or `None` when a full scan is cheaper.
    fn ring_span(&self, max_distance_m: f64) -> Option<u32> {
        let edge_m = self.resolution.edge_length_m();
        // Neighbouring centres sit ~1.7 edges apart; stepping by one edge plus two rings of
        // slack covers cell-size variation and both endpoints' offsets from their centres.
        let rings = (max_distance_m / edge_m).ceil() + 2.0;
        (rings <= f64::from(MAX_DISK_RING)).then_some(rings as u32)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, DriverCellIndex>, StoreError> {
        self.index
            .read()
            .map_err(|_| StoreError::Unavailable("driver index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, DriverCellIndex>, StoreError> {
        self.index
            .write()
            .map_err(|_| StoreError::Unavailable("driver index lock poisoned".to_string()))
    }
}

impl DriverLocationStore for InMemoryLocationStore {
    fn upsert(&self, driver: &ParticipantId, coordinate: Coordinate) -> Result<(), StoreError> {
        self.upsert_at(driver, coordinate, Utc::now())
    }

    fn remove(&self, driver: &ParticipantId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(driver).is_some())
    }

    fn find_nearby(
        &self,
        origin: Coordinate,
        max_distance_m: f64,
    ) -> Result<Vec<NearbyDriver>, StoreError> {
        self.find_nearby_at(origin, max_distance_m, Utc::now())
    }
}

/// LRU of grid disks keyed by (origin cell, ring count).
struct GridDiskCache {
    cache: Mutex<LruCache<(CellIndex, u32), Arc<[CellIndex]>>>,
}

impl GridDiskCache {
    fn new() -> Self {
        let capacity = NonZeroUsize::new(DISK_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get_or_compute(&self, origin: CellIndex, k: u32) -> Arc<[CellIndex]> {
        let compute = || Arc::<[CellIndex]>::from(origin.grid_disk::<Vec<_>>(k));
        let Ok(mut cache) = self.cache.lock() else {
            // Poisoned cache: compute without it.
            return compute();
        };
        Arc::clone(cache.get_or_insert((origin, k), compute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{offset_north, ORIGIN};

    fn store() -> InMemoryLocationStore {
        InMemoryLocationStore::new(&LocationConfig::default()).expect("store")
    }

    fn ids(found: &[NearbyDriver]) -> Vec<&str> {
        found.iter().map(|d| d.driver.as_str()).collect()
    }

    #[test]
    fn orders_results_nearest_first() {
        let store = store();
        store.upsert(&"far".into(), offset_north(ORIGIN, 3_000.0)).expect("upsert");
        store.upsert(&"near".into(), offset_north(ORIGIN, 1_000.0)).expect("upsert");
        store.upsert(&"mid".into(), offset_north(ORIGIN, 2_000.0)).expect("upsert");

        let found = store.find_nearby(ORIGIN, 50_000.0).expect("query");
        assert_eq!(ids(&found), vec!["near", "mid", "far"]);
        assert!((found[0].distance_m - 1_000.0).abs() < 1.0);
    }

    #[test]
    fn excludes_drivers_beyond_radius() {
        let store = store();
        store.upsert(&"inside".into(), offset_north(ORIGIN, 49_000.0)).expect("upsert");
        store.upsert(&"outside".into(), offset_north(ORIGIN, 51_000.0)).expect("upsert");

        let found = store.find_nearby(ORIGIN, 50_000.0).expect("query");
        assert_eq!(ids(&found), vec!["inside"]);
    }

    #[test]
    fn upsert_then_query_sees_latest_coordinate() {
        let store = store();
        let driver = ParticipantId::from("driver-1");
        store.upsert(&driver, offset_north(ORIGIN, 10_000.0)).expect("upsert");
        let moved = offset_north(ORIGIN, 500.0);
        store.upsert(&driver, moved).expect("upsert");

        let found = store.find_nearby(ORIGIN, 50_000.0).expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].coordinate, moved);
        assert_eq!(store.len().expect("len"), 1);
    }

    #[test]
    fn removed_driver_is_never_returned() {
        let store = store();
        let driver = ParticipantId::from("driver-1");
        store.upsert(&driver, ORIGIN).expect("upsert");

        assert!(store.remove(&driver).expect("remove"));
        assert!(!store.remove(&driver).expect("remove again"));
        assert!(store.find_nearby(ORIGIN, 50_000.0).expect("query").is_empty());
    }

    #[test]
    fn rejects_invalid_coordinates_without_storing() {
        let store = store();
        let bad = Coordinate {
            latitude: 120.0,
            longitude: 0.0,
        };
        assert!(matches!(
            store.upsert(&"driver-1".into(), bad),
            Err(StoreError::InvalidCoordinate { .. })
        ));
        assert!(store.is_empty().expect("len"));
        assert!(store.find_nearby(bad, 10.0).is_err());
    }

    #[test]
    fn huge_radius_falls_back_to_full_scan() {
        let store = store();
        store.upsert(&"antipode".into(), Coordinate::new(-52.52, -166.595).expect("valid"))
            .expect("upsert");

        let found = store.find_nearby(ORIGIN, 25_000_000.0).expect("query");
        assert_eq!(ids(&found), vec!["antipode"]);
    }

    #[test]
    fn stale_positions_are_skipped_and_purged() {
        let config = LocationConfig::default().with_position_ttl_secs(60);
        let store = InMemoryLocationStore::new(&config).expect("store");
        let now = Utc::now();
        store
            .upsert_at(&"stale".into(), ORIGIN, now - chrono::Duration::seconds(120))
            .expect("upsert");
        store.upsert_at(&"fresh".into(), ORIGIN, now).expect("upsert");

        let found = store.find_nearby_at(ORIGIN, 1_000.0, now).expect("query");
        assert_eq!(ids(&found), vec!["fresh"]);

        assert_eq!(store.purge_stale(now).expect("purge"), 1);
        assert!(store.get(&"stale".into()).expect("get").is_none());
        assert_eq!(store.len().expect("len"), 1);
    }

    #[test]
    fn without_ttl_nothing_is_stale() {
        let store = store();
        let long_ago = Utc::now() - chrono::Duration::days(30);
        store.upsert_at(&"driver-1".into(), ORIGIN, long_ago).expect("upsert");

        assert_eq!(store.purge_stale(Utc::now()).expect("purge"), 0);
        assert_eq!(store.find_nearby(ORIGIN, 10.0).expect("query").len(), 1);
    }
}
