//! Building and mineral registration.

use colony_defence_core::{CellCoord, Footprint};

use crate::SpatialGrid;

impl SpatialGrid {
    /// Marks every in-bounds cell of the footprint as built on.
    ///
    /// Returns the number of cells whose flag changed.
    pub fn register_building(&mut self, origin: CellCoord, footprint: &Footprint) -> usize {
        let changed = footprint
            .cells(origin)
            .filter(|cell| self.set_building(*cell, true))
            .count();
        tracing::debug!(x = origin.x(), z = origin.z(), changed, "building registered");
        changed
    }

    /// Clears the building flag from every in-bounds cell of the footprint.
    ///
    /// Returns the number of cells whose flag changed.
    pub fn deregister_building(&mut self, origin: CellCoord, footprint: &Footprint) -> usize {
        let changed = footprint
            .cells(origin)
            .filter(|cell| self.set_building(*cell, false))
            .count();
        tracing::debug!(x = origin.x(), z = origin.z(), changed, "building deregistered");
        changed
    }

    /// Marks the cell as carrying a mineral deposit.
    pub fn register_mineral(&mut self, cell: CellCoord) -> bool {
        self.set_mineral(cell, true)
    }

    /// Clears the mineral flag from the cell.
    pub fn deregister_mineral(&mut self, cell: CellCoord) -> bool {
        self.set_mineral(cell, false)
    }

    /// Whether a building with the given footprint fits at `origin`.
    ///
    /// Every footprint cell must be in bounds and free.
    #[must_use]
    pub fn is_available_for_building(&self, origin: CellCoord, footprint: &Footprint) -> bool {
        footprint.cells(origin).all(|cell| self.is_occupiable(cell))
    }

    pub(crate) fn set_building(&mut self, cell: CellCoord, present: bool) -> bool {
        let changed = self
            .position_mut(cell)
            .is_some_and(|data| data.set_building(present));
        if changed {
            self.refresh_membership(cell);
        }
        changed
    }

    fn set_mineral(&mut self, cell: CellCoord, present: bool) -> bool {
        let changed = self
            .position_mut(cell)
            .is_some_and(|data| data.set_mineral(present));
        if changed {
            self.refresh_membership(cell);
        }
        changed
    }
}
