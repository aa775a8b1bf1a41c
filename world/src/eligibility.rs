//! Eligibility lists cached over the authoritative cell flags.

use std::collections::HashMap;

use colony_defence_core::{CellCoord, PlayMode, Sector};

use crate::SpatialGrid;

/// Identifies one of the cached eligibility lists maintained by the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EligibilityList {
    /// Cells eligible while the combat tutorial runs.
    Tutorial,
    /// Cells eligible during regular gameplay.
    Gameplay,
    /// Snapshot of the mode's master list still available to the running wave.
    CurrentWave,
    /// Current-wave cells inside the wave's sector.
    Majority,
    /// Current-wave cells outside the wave's sector.
    Minority,
}

impl EligibilityList {
    /// Every list, master lists first.
    pub const ALL: [EligibilityList; 5] = [
        EligibilityList::Tutorial,
        EligibilityList::Gameplay,
        EligibilityList::CurrentWave,
        EligibilityList::Majority,
        EligibilityList::Minority,
    ];
}

/// Ordered set of cells with constant-time membership and removal.
///
/// Removal swaps the last element into the vacated slot, so iteration order is
/// deterministic for a given sequence of operations but not sorted.
#[derive(Clone, Debug, Default)]
pub(crate) struct SpawnList {
    cells: Vec<CellCoord>,
    slots: HashMap<CellCoord, usize>,
}

impl SpawnList {
    pub(crate) fn insert(&mut self, cell: CellCoord) -> bool {
        if self.slots.contains_key(&cell) {
            return false;
        }
        let _ = self.slots.insert(cell, self.cells.len());
        self.cells.push(cell);
        true
    }

    pub(crate) fn remove(&mut self, cell: CellCoord) -> bool {
        let Some(slot) = self.slots.remove(&cell) else {
            return false;
        };
        let _ = self.cells.swap_remove(slot);
        if let Some(moved) = self.cells.get(slot).copied() {
            let _ = self.slots.insert(moved, slot);
        }
        true
    }

    pub(crate) fn contains(&self, cell: CellCoord) -> bool {
        self.slots.contains_key(&cell)
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
        self.slots.clear();
    }

    pub(crate) fn as_slice(&self) -> &[CellCoord] {
        &self.cells
    }
}

impl SpatialGrid {
    /// Snapshots the master list of `mode` into the current-wave list.
    ///
    /// The sector lists are cleared; `GameOver` leaves every wave list empty.
    pub fn reset_current_wave_eligibility(&mut self, mode: PlayMode) {
        self.current_wave = match mode {
            PlayMode::Tutorial => self.tutorial.clone(),
            PlayMode::Normal => self.gameplay.clone(),
            PlayMode::GameOver => SpawnList::default(),
        };
        self.wave_mode = mode.admits_spawning().then_some(mode);
        self.wave_sector = None;
        self.majority.clear();
        self.minority.clear();
        self.suspended.clear();
        tracing::debug!(
            ?mode,
            cells = self.current_wave.as_slice().len(),
            "current wave eligibility reset"
        );
    }

    /// Partitions the current-wave list into the majority and minority lists.
    ///
    /// Cells whose angle falls inside `sector` go to the majority list, all
    /// others to the minority list.
    pub fn partition_current_wave(&mut self, sector: &Sector) {
        self.majority.clear();
        self.minority.clear();
        self.wave_sector = Some(*sector);
        let cells: Vec<CellCoord> = self.current_wave.as_slice().to_vec();
        for cell in cells {
            self.insert_into_sector_list(cell);
        }
    }

    /// Drops a cell from the running wave without touching its flags.
    ///
    /// Returns whether the cell was still part of the wave.
    pub fn discard_from_current_wave(&mut self, cell: CellCoord) -> bool {
        self.drop_from_wave_lists(cell)
    }

    /// Drops every cell within `radius` of `centre` from the running wave.
    ///
    /// The square neighbourhood is clamped to the grid bounds. Returns the
    /// number of cells that were removed.
    pub fn remove_neighbourhood_from_current_wave(&mut self, centre: CellCoord, radius: u32) -> usize {
        let cells: Vec<CellCoord> = self.neighbourhood(centre, radius).collect();
        cells
            .into_iter()
            .filter(|cell| self.drop_from_wave_lists(*cell))
            .count()
    }

    /// Empties the majority and minority lists.
    pub fn clear_sector_lists(&mut self) {
        self.majority.clear();
        self.minority.clear();
        self.wave_sector = None;
    }

    pub(crate) fn list(&self, list: EligibilityList) -> &SpawnList {
        match list {
            EligibilityList::Tutorial => &self.tutorial,
            EligibilityList::Gameplay => &self.gameplay,
            EligibilityList::CurrentWave => &self.current_wave,
            EligibilityList::Majority => &self.majority,
            EligibilityList::Minority => &self.minority,
        }
    }

    /// Re-derives list membership for a cell from its flags.
    ///
    /// A cell that stops being usable leaves the wave lists and is held back
    /// for the running wave; once usable again it rejoins the lists it left.
    /// Cells dropped by discard, crowding margins or bans never return
    /// before the next wave reset.
    pub(crate) fn refresh_membership(&mut self, cell: CellCoord) {
        let Some(data) = self.position(cell) else {
            return;
        };
        let tutorial = data.admits_hostiles(PlayMode::Tutorial);
        let gameplay = data.admits_hostiles(PlayMode::Normal);
        let usable = data.is_buildable() && !data.is_banned();
        let wave_eligible = self.wave_mode.is_some_and(|mode| data.admits_hostiles(mode));

        let _ = if tutorial {
            self.tutorial.insert(cell)
        } else {
            self.tutorial.remove(cell)
        };
        let _ = if gameplay {
            self.gameplay.insert(cell)
        } else {
            self.gameplay.remove(cell)
        };

        if !usable {
            if self.remove_from_wave_lists(cell) {
                let _ = self.suspended.insert(cell);
            }
        } else if wave_eligible && self.suspended.remove(cell) {
            let _ = self.current_wave.insert(cell);
            self.insert_into_sector_list(cell);
        }
    }

    pub(crate) fn drop_from_all_lists(&mut self, cell: CellCoord) {
        let _ = self.tutorial.remove(cell);
        let _ = self.gameplay.remove(cell);
        let _ = self.drop_from_wave_lists(cell);
    }

    fn drop_from_wave_lists(&mut self, cell: CellCoord) -> bool {
        let suspended = self.suspended.remove(cell);
        self.remove_from_wave_lists(cell) || suspended
    }

    fn remove_from_wave_lists(&mut self, cell: CellCoord) -> bool {
        let removed = self.current_wave.remove(cell);
        let _ = self.majority.remove(cell);
        let _ = self.minority.remove(cell);
        removed
    }

    fn insert_into_sector_list(&mut self, cell: CellCoord) {
        let Some(sector) = self.wave_sector else {
            return;
        };
        let Some(data) = self.position(cell) else {
            return;
        };
        let _ = if sector.contains(data.angle_from_centre()) {
            self.majority.insert(cell)
        } else {
            self.minority.insert(cell)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_keeps_index_consistent() {
        let mut list = SpawnList::default();
        for x in 0..4 {
            assert!(list.insert(CellCoord::new(x, 0)));
        }
        assert!(!list.insert(CellCoord::new(2, 0)), "duplicates are rejected");

        assert!(list.remove(CellCoord::new(0, 0)));
        assert_eq!(
            list.as_slice(),
            &[CellCoord::new(3, 0), CellCoord::new(1, 0), CellCoord::new(2, 0)]
        );
        assert!(list.remove(CellCoord::new(3, 0)));
        assert!(!list.remove(CellCoord::new(3, 0)));
        assert!(list.contains(CellCoord::new(1, 0)));
        assert!(list.remove(CellCoord::new(2, 0)));
        assert_eq!(list.as_slice(), &[CellCoord::new(1, 0)]);
    }

    #[test]
    fn clear_forgets_membership() {
        let mut list = SpawnList::default();
        let _ = list.insert(CellCoord::new(1, 1));
        list.clear();
        assert!(!list.contains(CellCoord::new(1, 1)));
        assert!(list.insert(CellCoord::new(1, 1)));
    }
}
