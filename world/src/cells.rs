//! Per-cell records stored in the dense spatial grid.

use colony_defence_core::{CellCoord, MoverClass, PathRecord, PlayMode};

/// Everything the grid knows about a single cell.
///
/// Coordinates, angle and zone membership are fixed at construction. Building
/// and mineral flags follow registrations, the ban flag only ever turns on, and
/// each path record is written at most once.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionData {
    cell: CellCoord,
    angle_from_centre: f32,
    in_tutorial_zone: bool,
    in_exclusion_zone: bool,
    has_building: bool,
    has_mineral: bool,
    hostiles_banned: bool,
    paths: [Option<PathRecord>; MoverClass::COUNT],
}

impl PositionData {
    pub(crate) fn new(
        cell: CellCoord,
        angle_from_centre: f32,
        in_tutorial_zone: bool,
        in_exclusion_zone: bool,
    ) -> Self {
        Self {
            cell,
            angle_from_centre,
            in_tutorial_zone,
            in_exclusion_zone,
            has_building: false,
            has_mineral: false,
            hostiles_banned: false,
            paths: [None; MoverClass::COUNT],
        }
    }

    /// Coordinates of the cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Angle in degrees from the map centre, in `[0, 360)`.
    #[must_use]
    pub const fn angle_from_centre(&self) -> f32 {
        self.angle_from_centre
    }

    /// Whether the cell lies inside the tutorial spawn rectangle.
    #[must_use]
    pub const fn is_in_tutorial_zone(&self) -> bool {
        self.in_tutorial_zone
    }

    /// Whether the cell lies inside the hostile exclusion rectangle.
    #[must_use]
    pub const fn is_in_exclusion_zone(&self) -> bool {
        self.in_exclusion_zone
    }

    /// Whether a building currently covers the cell.
    #[must_use]
    pub const fn has_building(&self) -> bool {
        self.has_building
    }

    /// Whether a mineral deposit currently covers the cell.
    #[must_use]
    pub const fn has_mineral(&self) -> bool {
        self.has_mineral
    }

    /// Whether hostiles are permanently banned from the cell.
    #[must_use]
    pub const fn is_banned(&self) -> bool {
        self.hostiles_banned
    }

    /// Whether nothing occupies the cell.
    #[must_use]
    pub const fn is_buildable(&self) -> bool {
        !self.has_building && !self.has_mineral
    }

    /// Whether the cell satisfies the zone rule of the provided mode.
    #[must_use]
    pub const fn satisfies_zone_rule(&self, mode: PlayMode) -> bool {
        match mode {
            PlayMode::Tutorial => self.in_tutorial_zone,
            PlayMode::Normal => !self.in_exclusion_zone,
            PlayMode::GameOver => false,
        }
    }

    /// Whether the cell's flags admit a hostile under the provided mode.
    ///
    /// Terrain probing is not part of this check; see
    /// [`SpatialGrid::is_spawnable`](crate::SpatialGrid::is_spawnable).
    #[must_use]
    pub const fn admits_hostiles(&self, mode: PlayMode) -> bool {
        self.is_buildable() && !self.hostiles_banned && self.satisfies_zone_rule(mode)
    }

    /// Precomputed path record for the mover class, if one was stored.
    #[must_use]
    pub fn path(&self, mover: MoverClass) -> Option<PathRecord> {
        self.paths[mover.index()]
    }

    pub(crate) fn set_building(&mut self, present: bool) -> bool {
        let changed = self.has_building != present;
        self.has_building = present;
        changed
    }

    pub(crate) fn set_mineral(&mut self, present: bool) -> bool {
        let changed = self.has_mineral != present;
        self.has_mineral = present;
        changed
    }

    pub(crate) fn ban(&mut self) -> bool {
        let newly_banned = !self.hostiles_banned;
        self.hostiles_banned = true;
        newly_banned
    }

    pub(crate) fn store_path(&mut self, mover: MoverClass, record: PathRecord) -> bool {
        let slot = &mut self.paths[mover.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(record);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> PositionData {
        PositionData::new(CellCoord::new(2, 3), 45.0, true, false)
    }

    #[test]
    fn ban_is_sticky() {
        let mut cell = data();
        assert!(cell.ban(), "first ban should report a change");
        assert!(!cell.ban(), "second ban should be a no-op");
        assert!(cell.is_banned());
        assert!(!cell.admits_hostiles(PlayMode::Tutorial));
    }

    #[test]
    fn zone_rules_follow_mode() {
        let tutorial_only = data();
        assert!(tutorial_only.admits_hostiles(PlayMode::Tutorial));
        assert!(tutorial_only.admits_hostiles(PlayMode::Normal));
        assert!(!tutorial_only.admits_hostiles(PlayMode::GameOver));

        let excluded = PositionData::new(CellCoord::new(0, 0), 0.0, false, true);
        assert!(!excluded.admits_hostiles(PlayMode::Tutorial));
        assert!(!excluded.admits_hostiles(PlayMode::Normal));
    }

    #[test]
    fn minerals_and_buildings_block_hostiles() {
        let mut cell = data();
        assert!(cell.set_mineral(true));
        assert!(!cell.is_buildable());
        assert!(!cell.admits_hostiles(PlayMode::Tutorial));
        assert!(cell.set_mineral(false));
        assert!(cell.set_building(true));
        assert!(!cell.set_building(true), "repeated registration is idempotent");
        assert!(!cell.admits_hostiles(PlayMode::Tutorial));
    }

    #[test]
    fn path_records_are_write_once() {
        let mut cell = data();
        assert!(cell.store_path(MoverClass::Crawler, PathRecord::reachable(4.0)));
        assert!(!cell.store_path(MoverClass::Crawler, PathRecord::unreachable()));
        assert_eq!(cell.path(MoverClass::Crawler), Some(PathRecord::reachable(4.0)));
        assert_eq!(cell.path(MoverClass::Scuttler), None);
    }
}
