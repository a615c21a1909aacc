//! H3 cell buckets over driver positions.
//!
//! Maintains cell → drivers buckets plus the reverse driver → (cell, position) mapping so
//! moves and removals touch a single bucket instead of scanning.

use std::collections::HashMap;

use h3o::CellIndex;

use crate::types::{DriverPosition, ParticipantId};

#[derive(Debug, Default)]
pub(crate) struct DriverCellIndex {
    drivers_by_cell: HashMap<CellIndex, Vec<ParticipantId>>,
    positions: HashMap<ParticipantId, (CellIndex, DriverPosition)>,
}

impl DriverCellIndex {
    /// Insert or move a driver. Buckets keep arrival order.
    pub(crate) fn upsert(&mut self, position: DriverPosition, cell: CellIndex) {
        let driver = position.driver.clone();
        match self.positions.get(&driver).map(|(old_cell, _)| *old_cell) {
            Some(old_cell) if old_cell == cell => {}
            Some(old_cell) => {
                self.detach(&driver, old_cell);
                self.drivers_by_cell.entry(cell).or_default().push(driver.clone());
            }
            None => {
                self.drivers_by_cell.entry(cell).or_default().push(driver.clone());
            }
        }
        self.positions.insert(driver, (cell, position));
    }

    pub(crate) fn remove(&mut self, driver: &ParticipantId) -> Option<DriverPosition> {
        let (cell, position) = self.positions.remove(driver)?;
        self.detach(driver, cell);
        Some(position)
    }

    pub(crate) fn get(&self, driver: &ParticipantId) -> Option<&DriverPosition> {
        self.positions.get(driver).map(|(_, position)| position)
    }

    /// Positions of all drivers bucketed in `cells`, in cell order.
    pub(crate) fn in_cells<'a>(
        &'a self,
        cells: &'a [CellIndex],
    ) -> impl Iterator<Item = &'a DriverPosition> + 'a {
        cells
            .iter()
            .filter_map(|cell| self.drivers_by_cell.get(cell))
            .flatten()
            .filter_map(|driver| self.get(driver))
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &DriverPosition> {
        self.positions.values().map(|(_, position)| position)
    }

    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    fn detach(&mut self, driver: &ParticipantId, cell: CellIndex) {
        if let Some(drivers) = self.drivers_by_cell.get_mut(&cell) {
            drivers.retain(|d| d != driver);
            if drivers.is_empty() {
                self.drivers_by_cell.remove(&cell);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn bucket(&self, cell: CellIndex) -> &[ParticipantId] {
        self.drivers_by_cell.get(&cell).map_or(&[], Vec::as_slice)
    }
}
