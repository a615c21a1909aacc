//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests, integration tests, and benches (feature `test-helpers`).

use std::sync::Arc;

use h3o::{CellIndex, Resolution};
use serde_json::Map;
use tokio::sync::mpsc;

use crate::events::{OutboundEvent, RideStart, SearchRequest};
use crate::geo::{Coordinate, EARTH_RADIUS_M};
use crate::registry::{ConnectionRegistry, MpscChannel};
use crate::types::ParticipantId;

/// Alexanderplatz, Berlin: the reference pickup point used across tests.
pub const ORIGIN: Coordinate = Coordinate {
    latitude: 52.52,
    longitude: 13.405,
};

/// `origin` moved `meters` due north (negative moves south).
pub fn offset_north(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate {
        latitude: origin.latitude + (meters / EARTH_RADIUS_M).to_degrees(),
        longitude: origin.longitude,
    }
}

/// The resolution-5 cell containing [`ORIGIN`].
///
/// # Panics
///
/// Panics if [`ORIGIN`] is not a valid coordinate (should never happen).
pub fn test_cell() -> CellIndex {
    ORIGIN
        .to_cell(Resolution::Five)
        .expect("ORIGIN should map to a cell")
}

/// A neighbour of [`test_cell`].
///
/// # Panics
///
/// Panics if the test cell has no neighbours (should never happen).
pub fn test_neighbor_cell() -> CellIndex {
    test_cell()
        .grid_disk::<Vec<_>>(1)
        .into_iter()
        .find(|c| *c != test_cell())
        .expect("test cell should have neighbors")
}

/// A search request with no extra fields.
pub fn search_request(pickup: Coordinate) -> SearchRequest {
    SearchRequest {
        ride_start: RideStart {
            coords: pickup,
            extra: Map::new(),
        },
        extra: Map::new(),
    }
}

/// Bind `id` to a fresh mpsc channel and return the receiving end.
pub fn connect(registry: &ConnectionRegistry, id: &str) -> mpsc::UnboundedReceiver<OutboundEvent> {
    let (channel, rx) = MpscChannel::pair();
    registry.bind(ParticipantId::from(id), Arc::new(channel));
    rx
}

/// Everything currently queued on `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
