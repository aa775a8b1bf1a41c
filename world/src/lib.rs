#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative spatial grid for Colony Defence.
//!
//! The grid owns one [`PositionData`] per cell and the eligibility lists the
//! wave spawner draws from. The lists are caches over the per-cell flags and
//! are only ever mutated through the grid's own update methods, so they never
//! contain a cell that carries a building or a hostile ban.

mod buildings;
mod cells;
mod eligibility;
mod spawnability;

use colony_defence_core::{
    angle_from_centre, BanReason, CellCoord, CellRect, Command, Event, MoverClass, PathRecord,
    PlayMode, Sector,
};
use glam::Vec2;
use serde::Deserialize;

pub use cells::PositionData;
pub use eligibility::EligibilityList;

use eligibility::SpawnList;

const DEFAULT_EXTENT: i32 = 63;
const DEFAULT_MIN_SPAWN_HEIGHT: f32 = 0.0;

/// Errors raised while constructing a [`SpatialGrid`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The inclusive upper bounds were negative.
    #[error("grid bounds must be non-negative (x_max = {x_max}, z_max = {z_max})")]
    InvalidBounds {
        /// Requested inclusive upper bound along x.
        x_max: i32,
        /// Requested inclusive upper bound along z.
        z_max: i32,
    },
}

/// Static description of the map used to build the grid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Inclusive upper bound along x.
    pub x_max: i32,
    /// Inclusive upper bound along z.
    pub z_max: i32,
    /// Point angles are measured from; defaults to the middle of the map.
    pub centre: Option<Vec2>,
    /// Rectangle hostiles are confined to during the combat tutorial.
    pub tutorial_zone: Option<CellRect>,
    /// Rectangle hostiles may never appear in during regular play.
    pub exclusion_zone: Option<CellRect>,
    /// Ground below this height is treated as a pit or cliff.
    pub min_spawn_height: f32,
}

impl GridConfig {
    /// Creates a configuration covering `0..=x_max` by `0..=z_max` with no zones.
    #[must_use]
    pub fn new(x_max: i32, z_max: i32) -> Self {
        Self {
            x_max,
            z_max,
            ..Self::default()
        }
    }

    /// Overrides the map centre.
    #[must_use]
    pub fn with_centre(mut self, centre: Vec2) -> Self {
        self.centre = Some(centre);
        self
    }

    /// Sets the tutorial spawn rectangle.
    #[must_use]
    pub fn with_tutorial_zone(mut self, zone: CellRect) -> Self {
        self.tutorial_zone = Some(zone);
        self
    }

    /// Sets the hostile exclusion rectangle.
    #[must_use]
    pub fn with_exclusion_zone(mut self, zone: CellRect) -> Self {
        self.exclusion_zone = Some(zone);
        self
    }

    /// Sets the minimum ground height accepted around spawn cells.
    #[must_use]
    pub fn with_min_spawn_height(mut self, height: f32) -> Self {
        self.min_spawn_height = height;
        self
    }

    fn resolved_centre(&self) -> Vec2 {
        self.centre
            .unwrap_or_else(|| Vec2::new(self.x_max as f32 * 0.5, self.z_max as f32 * 0.5))
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x_max: DEFAULT_EXTENT,
            z_max: DEFAULT_EXTENT,
            centre: None,
            tutorial_zone: None,
            exclusion_zone: None,
            min_spawn_height: DEFAULT_MIN_SPAWN_HEIGHT,
        }
    }
}

/// Dense grid of cells plus the eligibility lists derived from them.
#[derive(Debug)]
pub struct SpatialGrid {
    x_max: i32,
    z_max: i32,
    centre: Vec2,
    min_spawn_height: f32,
    cells: Vec<PositionData>,
    tutorial: SpawnList,
    gameplay: SpawnList,
    current_wave: SpawnList,
    majority: SpawnList,
    minority: SpawnList,
    suspended: SpawnList,
    wave_mode: Option<PlayMode>,
    wave_sector: Option<Sector>,
    banned: usize,
}

impl SpatialGrid {
    /// Builds the grid described by `config`.
    ///
    /// Every cell starts buildable and unbanned, so the master lists initially
    /// hold each cell that satisfies the list's zone rule, in row-major order.
    pub fn new(config: &GridConfig) -> Result<Self, GridError> {
        if config.x_max < 0 || config.z_max < 0 {
            return Err(GridError::InvalidBounds {
                x_max: config.x_max,
                z_max: config.z_max,
            });
        }

        let centre = config.resolved_centre();
        let width = usize::try_from(config.x_max).unwrap_or(0) + 1;
        let depth = usize::try_from(config.z_max).unwrap_or(0) + 1;
        let mut cells = Vec::with_capacity(width.saturating_mul(depth));
        for z in 0..=config.z_max {
            for x in 0..=config.x_max {
                let cell = CellCoord::new(x, z);
                let in_zone = |zone: Option<CellRect>| zone.is_some_and(|rect| rect.contains(cell));
                cells.push(PositionData::new(
                    cell,
                    angle_from_centre(centre, cell.plane_position()),
                    in_zone(config.tutorial_zone),
                    in_zone(config.exclusion_zone),
                ));
            }
        }

        let mut grid = Self {
            x_max: config.x_max,
            z_max: config.z_max,
            centre,
            min_spawn_height: config.min_spawn_height,
            cells,
            tutorial: SpawnList::default(),
            gameplay: SpawnList::default(),
            current_wave: SpawnList::default(),
            majority: SpawnList::default(),
            minority: SpawnList::default(),
            suspended: SpawnList::default(),
            wave_mode: None,
            wave_sector: None,
            banned: 0,
        };
        for index in 0..grid.cells.len() {
            let cell = grid.cells[index].cell();
            grid.refresh_membership(cell);
        }

        tracing::info!(
            x_max = grid.x_max,
            z_max = grid.z_max,
            tutorial = grid.tutorial.as_slice().len(),
            gameplay = grid.gameplay.as_slice().len(),
            "spatial grid initialised"
        );
        Ok(grid)
    }

    /// Number of cells along x.
    #[must_use]
    pub fn width(&self) -> u32 {
        u32::try_from(self.x_max).unwrap_or(0).saturating_add(1)
    }

    /// Number of cells along z.
    #[must_use]
    pub fn depth(&self) -> u32 {
        u32::try_from(self.z_max).unwrap_or(0).saturating_add(1)
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell stored at the provided row-major index.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<CellCoord> {
        self.cells.get(index).map(PositionData::cell)
    }

    /// Whether the cell lies within the inclusive bounds.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        (0..=self.x_max).contains(&cell.x()) && (0..=self.z_max).contains(&cell.z())
    }

    /// Whether the cell is in bounds and free of buildings and minerals.
    #[must_use]
    pub fn is_occupiable(&self, cell: CellCoord) -> bool {
        self.position(cell).is_some_and(PositionData::is_buildable)
    }

    /// Permanently bans hostiles from the cell and drops it from every list.
    ///
    /// Returns whether the cell was newly banned. Out-of-bounds cells are ignored.
    pub fn register_off_navigable_position(&mut self, cell: CellCoord) -> bool {
        let newly_banned = self.ban(cell);
        if newly_banned {
            tracing::debug!(x = cell.x(), z = cell.z(), "cell registered off-navigable");
        }
        newly_banned
    }

    /// Stores the path record for the cell and mover class.
    ///
    /// Records are written once; returns `false` when one already existed or
    /// the cell is out of bounds.
    pub fn record_path(&mut self, cell: CellCoord, mover: MoverClass, record: PathRecord) -> bool {
        self.position_mut(cell)
            .is_some_and(|data| data.store_path(mover, record))
    }

    pub(crate) fn position(&self, cell: CellCoord) -> Option<&PositionData> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    fn position_mut(&mut self, cell: CellCoord) -> Option<&mut PositionData> {
        self.index(cell).and_then(|index| self.cells.get_mut(index))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let x = usize::try_from(cell.x()).ok()?;
        let z = usize::try_from(cell.z()).ok()?;
        let width = usize::try_from(self.width()).ok()?;
        Some(z * width + x)
    }

    pub(crate) fn ban(&mut self, cell: CellCoord) -> bool {
        let newly_banned = self.position_mut(cell).is_some_and(PositionData::ban);
        if newly_banned {
            self.banned += 1;
            self.drop_from_all_lists(cell);
        }
        newly_banned
    }

    /// Cells within `radius` of `centre` in row-major order, clamped to bounds.
    pub(crate) fn neighbourhood(
        &self,
        centre: CellCoord,
        radius: u32,
    ) -> impl Iterator<Item = CellCoord> {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX);
        let min_x = centre.x().saturating_sub(radius).max(0);
        let max_x = centre.x().saturating_add(radius).min(self.x_max);
        let min_z = centre.z().saturating_sub(radius).max(0);
        let max_z = centre.z().saturating_add(radius).min(self.z_max);
        (min_z..=max_z).flat_map(move |z| (min_x..=max_x).map(move |x| CellCoord::new(x, z)))
    }
}

/// Applies the provided command to the grid, emitting the resulting events.
pub fn apply(grid: &mut SpatialGrid, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::RegisterBuilding { origin, footprint } => {
            for cell in footprint.cells(origin) {
                if grid.set_building(cell, true) {
                    out_events.push(Event::CellOccupancyChanged {
                        cell,
                        occupiable: grid.is_occupiable(cell),
                    });
                }
            }
        }
        Command::DeregisterBuilding { origin, footprint } => {
            for cell in footprint.cells(origin) {
                if grid.set_building(cell, false) {
                    out_events.push(Event::CellOccupancyChanged {
                        cell,
                        occupiable: grid.is_occupiable(cell),
                    });
                }
            }
        }
        Command::RegisterMineral { cell } => {
            if grid.register_mineral(cell) {
                out_events.push(Event::CellOccupancyChanged {
                    cell,
                    occupiable: false,
                });
            }
        }
        Command::DeregisterMineral { cell } => {
            if grid.deregister_mineral(cell) {
                out_events.push(Event::CellOccupancyChanged {
                    cell,
                    occupiable: grid.is_occupiable(cell),
                });
            }
        }
        Command::RegisterOffNavigable { cell } => {
            if grid.register_off_navigable_position(cell) {
                out_events.push(Event::CellBanned {
                    cell,
                    reason: BanReason::OffNavigable,
                });
            }
        }
    }
}

/// Query functions that provide read-only access to the grid.
pub mod query {
    use colony_defence_core::CellCoord;
    use glam::Vec2;

    use super::{EligibilityList, PositionData, SpatialGrid};

    /// Inclusive upper bounds of the grid as `(x_max, z_max)`.
    #[must_use]
    pub fn bounds(grid: &SpatialGrid) -> (i32, i32) {
        (grid.x_max, grid.z_max)
    }

    /// Point angles are measured from.
    #[must_use]
    pub fn centre(grid: &SpatialGrid) -> Vec2 {
        grid.centre
    }

    /// Ground height threshold used by terrain probing.
    #[must_use]
    pub fn min_spawn_height(grid: &SpatialGrid) -> f32 {
        grid.min_spawn_height
    }

    /// Record for the cell, or `None` when it lies out of bounds.
    #[must_use]
    pub fn position_data(grid: &SpatialGrid, cell: CellCoord) -> Option<&PositionData> {
        grid.position(cell)
    }

    /// Cells currently held by the requested list.
    #[must_use]
    pub fn eligible_cells(grid: &SpatialGrid, list: EligibilityList) -> &[CellCoord] {
        grid.list(list).as_slice()
    }

    /// Whether the requested list currently holds the cell.
    #[must_use]
    pub fn is_listed(grid: &SpatialGrid, list: EligibilityList, cell: CellCoord) -> bool {
        grid.list(list).contains(cell)
    }

    /// Number of cells permanently banned for hostiles.
    #[must_use]
    pub fn banned_count(grid: &SpatialGrid) -> usize {
        grid.banned
    }

    /// Iterates over every cell record in row-major order.
    pub fn positions(grid: &SpatialGrid) -> impl Iterator<Item = &PositionData> {
        grid.cells.iter()
    }
}
