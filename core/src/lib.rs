#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Colony Defence hostile placement engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative spatial grid, and the time-sliced systems. Adapters submit
//! [`Command`] values describing terrain and building mutations, the grid
//! executes those commands via its `apply` entry point, and systems broadcast
//! [`Event`] values describing waves and spawns. Everything the core needs from
//! the host engine is expressed as a narrow collaborator trait:
//! [`GroundSampler`], [`PathOracle`], [`SpawnExecutor`], [`StageSource`] and
//! [`Clock`].

mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the simulation boots.
pub const WELCOME_BANNER: &str = "Welcome to Colony Defence.";

/// Width of a full revolution measured in degrees.
pub const FULL_CIRCLE_DEGREES: f32 = 360.0;

/// Describes the active stage of the game as reported by the stage collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    /// Combat tutorial where hostiles only appear inside the tutorial rectangle.
    Tutorial,
    /// Regular gameplay where hostiles appear anywhere outside the exclusion rectangle.
    Normal,
    /// The session ended; nothing may spawn and running waves are cancelled.
    GameOver,
}

impl PlayMode {
    /// Reports whether hostiles may be spawned while this mode is active.
    #[must_use]
    pub const fn admits_spawning(self) -> bool {
        matches!(self, Self::Tutorial | Self::Normal)
    }
}

/// Category of spawned unit with distinct movement and path requirements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoverClass {
    /// Light, common hostile.
    Scuttler,
    /// Heavy hostile released at the configured crawler frequency.
    Crawler,
}

impl MoverClass {
    /// Every mover class in declaration order.
    pub const ALL: [MoverClass; Self::COUNT] = [MoverClass::Scuttler, MoverClass::Crawler];

    /// Number of mover classes.
    pub const COUNT: usize = 2;

    /// Dense index of the mover class, stable across runs.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Scuttler => 0,
            Self::Crawler => 1,
        }
    }

    /// Default radius of the neighbourhood cleared around a freshly spawned hostile.
    #[must_use]
    pub const fn default_crowding_margin(self) -> u32 {
        match self {
            Self::Scuttler => 1,
            Self::Crawler => 2,
        }
    }
}

/// Location of a single grid cell expressed as integer `x` and `z` coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Coordinate along the x axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Coordinate along the z axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns the cell displaced by the provided offset, saturating on overflow.
    #[must_use]
    pub const fn offset(self, offset: CellOffset) -> Self {
        Self {
            x: self.x.saturating_add(offset.dx),
            z: self.z.saturating_add(offset.dz),
        }
    }

    /// Position of the cell centre on the ground plane.
    #[must_use]
    pub fn plane_position(self) -> Vec2 {
        Vec2::new(self.x as f32, self.z as f32)
    }

    /// World position of the cell centre lifted to the provided height.
    #[must_use]
    pub fn world_position(self, height: f32) -> Vec3 {
        Vec3::new(self.x as f32, height, self.z as f32)
    }

    /// Rounds a world position onto the cell grid.
    #[must_use]
    pub fn from_world(position: Vec3) -> Self {
        Self {
            x: position.x.round() as i32,
            z: position.z.round() as i32,
        }
    }
}

/// Relative displacement between two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellOffset {
    dx: i32,
    dz: i32,
}

impl CellOffset {
    /// Creates a new offset.
    #[must_use]
    pub const fn new(dx: i32, dz: i32) -> Self {
        Self { dx, dz }
    }

    /// Displacement along the x axis.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Displacement along the z axis.
    #[must_use]
    pub const fn dz(&self) -> i32 {
        self.dz
    }
}

/// Axis-aligned rectangle of cells with inclusive bounds on both corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    min: CellCoord,
    max: CellCoord,
}

impl CellRect {
    /// Builds a rectangle from two opposite corners in any order.
    #[must_use]
    pub fn from_corners(a: CellCoord, b: CellCoord) -> Self {
        Self {
            min: CellCoord::new(a.x().min(b.x()), a.z().min(b.z())),
            max: CellCoord::new(a.x().max(b.x()), a.z().max(b.z())),
        }
    }

    /// Corner with the smallest coordinates.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Corner with the largest coordinates.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Reports whether the cell lies inside the rectangle, edges included.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.z >= self.min.z && cell.z <= self.max.z
    }
}

/// Set of cells covered by a building relative to its origin cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    offsets: Vec<CellOffset>,
}

impl Footprint {
    /// Creates a footprint from explicit offsets.
    #[must_use]
    pub fn new(offsets: Vec<CellOffset>) -> Self {
        Self { offsets }
    }

    /// Footprint that covers only the origin cell.
    #[must_use]
    pub fn single() -> Self {
        Self::square(1)
    }

    /// Square footprint anchored at its minimum corner.
    #[must_use]
    pub fn square(size: u32) -> Self {
        let side = i32::try_from(size).unwrap_or(i32::MAX);
        let mut offsets = Vec::with_capacity((size as usize).saturating_mul(size as usize));
        for dz in 0..side {
            for dx in 0..side {
                offsets.push(CellOffset::new(dx, dz));
            }
        }
        Self { offsets }
    }

    /// Offsets making up the footprint.
    #[must_use]
    pub fn offsets(&self) -> &[CellOffset] {
        &self.offsets
    }

    /// Iterates over the absolute cells covered when anchored at `origin`.
    pub fn cells(&self, origin: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        self.offsets.iter().map(move |offset| origin.offset(*offset))
    }
}

/// Contiguous angular slice of the map measured in degrees with wraparound at 360.
///
/// The slice is half-open: `min_angle` is inside, `max_angle` is not. A sector
/// whose width reaches a full revolution contains every angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sector {
    min_angle: f32,
    max_angle: f32,
    full: bool,
}

impl Sector {
    /// Creates a sector starting at `min_angle` and spanning `width` degrees.
    #[must_use]
    pub fn new(min_angle: f32, width: f32) -> Self {
        let min_angle = normalize_degrees(min_angle);
        if width >= FULL_CIRCLE_DEGREES {
            return Self::full_circle_from(min_angle);
        }
        let max_angle = normalize_degrees(min_angle + width.max(0.0));
        Self {
            min_angle,
            max_angle,
            full: false,
        }
    }

    /// Sector that contains every angle.
    #[must_use]
    pub fn full_circle() -> Self {
        Self::full_circle_from(0.0)
    }

    fn full_circle_from(min_angle: f32) -> Self {
        Self {
            min_angle,
            max_angle: min_angle,
            full: true,
        }
    }

    /// Inclusive starting angle.
    #[must_use]
    pub const fn min_angle(&self) -> f32 {
        self.min_angle
    }

    /// Exclusive ending angle, already wrapped into `[0, 360)`.
    #[must_use]
    pub const fn max_angle(&self) -> f32 {
        self.max_angle
    }

    /// Reports whether the angle falls inside the sector.
    #[must_use]
    pub fn contains(&self, angle: f32) -> bool {
        if self.full {
            return true;
        }
        let angle = normalize_degrees(angle);
        if self.min_angle <= self.max_angle {
            angle >= self.min_angle && angle < self.max_angle
        } else {
            angle >= self.min_angle || angle < self.max_angle
        }
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(FULL_CIRCLE_DEGREES);
    if wrapped >= FULL_CIRCLE_DEGREES {
        0.0
    } else {
        wrapped
    }
}

/// Angle in degrees from `centre` to `point`, counter-clockwise from +x toward +z.
///
/// A point that coincides with the centre reports an angle of zero.
#[must_use]
pub fn angle_from_centre(centre: Vec2, point: Vec2) -> f32 {
    let delta = point - centre;
    if delta.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    normalize_degrees(delta.y.atan2(delta.x).to_degrees())
}

/// Precomputed path record from a cell to the fixed destination.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    exists: bool,
    cost: f32,
}

impl PathRecord {
    /// Record describing a reachable destination with the provided cost.
    #[must_use]
    pub const fn reachable(cost: f32) -> Self {
        Self { exists: true, cost }
    }

    /// Record describing a destination that cannot be reached.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            exists: false,
            cost: f32::INFINITY,
        }
    }

    /// Whether a complete path exists.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.exists
    }

    /// Cost of the path; infinite when no path exists.
    #[must_use]
    pub const fn cost(&self) -> f32 {
        self.cost
    }
}

/// Opaque handle to a node of the host's movement graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphNode(u64);

impl GraphNode {
    /// Wraps a host-defined node identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the host-defined identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Handle returned by the spawn executor for a spawned hostile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnHandle(u32);

impl SpawnHandle {
    /// Wraps an executor-defined identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifies a wave by night and its one-based position within the night.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaveId {
    night: u32,
    wave: u32,
}

impl WaveId {
    /// Creates a new wave identifier.
    #[must_use]
    pub const fn new(night: u32, wave: u32) -> Self {
        Self { night, wave }
    }

    /// Zero-based night index.
    #[must_use]
    pub const fn night(&self) -> u32 {
        self.night
    }

    /// One-based wave number within the night; zero for tutorial waves.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }
}

/// Why a cell was permanently banned for hostiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BanReason {
    /// Ground under or next to the cell lies below the minimum spawn height.
    LowGround,
    /// The cell does not resolve onto the navigation surface.
    OffNavigable,
}

/// Commands that express all permissible grid mutations from collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Marks every cell of the footprint as carrying a building.
    RegisterBuilding {
        /// Cell anchoring the footprint.
        origin: CellCoord,
        /// Cells covered relative to the origin.
        footprint: Footprint,
    },
    /// Clears the building flag from every cell of the footprint.
    DeregisterBuilding {
        /// Cell anchoring the footprint.
        origin: CellCoord,
        /// Cells covered relative to the origin.
        footprint: Footprint,
    },
    /// Marks a cell as carrying a mineral deposit.
    RegisterMineral {
        /// Cell occupied by the mineral.
        cell: CellCoord,
    },
    /// Clears the mineral flag from a cell.
    DeregisterMineral {
        /// Cell previously occupied by the mineral.
        cell: CellCoord,
    },
    /// Reports that a cell failed to resolve onto the navigation surface.
    RegisterOffNavigable {
        /// Offending cell.
        cell: CellCoord,
    },
}

/// Events broadcast by the grid and systems after processing work.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A cell's occupancy changed as a result of a registration command.
    CellOccupancyChanged {
        /// Cell whose flags changed.
        cell: CellCoord,
        /// Whether the cell is now free of buildings and minerals.
        occupiable: bool,
    },
    /// A cell became permanently unavailable to hostiles.
    CellBanned {
        /// Cell that was banned.
        cell: CellCoord,
        /// Reason the ban was applied.
        reason: BanReason,
    },
    /// The path precomputation job finished.
    PathsPrecomputed {
        /// Number of cells visited.
        cells: u32,
        /// Number of cells registered off-navigable along the way.
        off_navigable: u32,
    },
    /// A wave began placing hostiles.
    WaveStarted {
        /// Identifier of the wave.
        wave: WaveId,
        /// Nominal number of hostiles in the wave.
        hostiles: u32,
        /// Quota for cells inside the sector.
        majority_quota: u32,
        /// Quota for cells outside the sector.
        minority_quota: u32,
        /// Sector receiving the majority of the wave.
        sector: Sector,
    },
    /// A hostile was accepted onto the map.
    HostileSpawned {
        /// Handle issued by the spawn executor.
        handle: SpawnHandle,
        /// Cell the hostile was spawned at.
        cell: CellCoord,
        /// Class of the spawned hostile.
        mover: MoverClass,
        /// Whether the cell lies inside the majority sector.
        in_majority: bool,
    },
    /// A spawned hostile failed to land on the navigation surface and was discarded.
    PlacementFailed {
        /// Handle of the discarded hostile.
        handle: SpawnHandle,
        /// Cell that is now banned.
        cell: CellCoord,
    },
    /// A wave finished placing hostiles.
    WaveCompleted {
        /// Identifier of the wave.
        wave: WaveId,
        /// Number of hostiles accepted.
        spawned: u32,
        /// Number of hostiles abandoned because no eligible cells remained.
        abandoned: u32,
    },
    /// A wave was cancelled before completion.
    WaveAborted {
        /// Identifier of the wave.
        wave: WaveId,
        /// Number of hostiles accepted before cancellation.
        spawned: u32,
    },
}

/// Ground queries answered by the host engine.
pub trait GroundSampler {
    /// Height of the ground under `(x, z)`, or `None` when there is no ground.
    fn sample_ground_height(&self, x: f32, z: f32) -> Option<f32>;

    /// Resolves a world position onto the movement graph, if a navigable surface is nearby.
    fn resolve_onto_movement_graph(&self, position: Vec3) -> Option<GraphNode>;
}

/// Path queries against the movement graph toward the single fixed destination.
pub trait PathOracle {
    /// Computes the path record from `node` for hostiles of class `mover`.
    fn compute_path(&self, node: GraphNode, mover: MoverClass) -> PathRecord;
}

/// Host collaborator that instantiates and discards hostiles.
pub trait SpawnExecutor {
    /// Instantiates a hostile at `position` and returns its handle.
    fn on_spawn_requested(&mut self, position: Vec3, mover: MoverClass) -> SpawnHandle;

    /// Discards a hostile that failed to land on the navigation surface.
    fn on_placement_failed(&mut self, handle: SpawnHandle, cell: CellCoord);
}

/// Host collaborator reporting the current game stage.
pub trait StageSource {
    /// Mode driving zone eligibility and spawn gating.
    fn current_mode(&self) -> PlayMode;

    /// Whether it is currently night; waves only start at night.
    fn is_night(&self) -> bool {
        true
    }
}

impl StageSource for PlayMode {
    fn current_mode(&self) -> PlayMode {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_edges_regardless_of_corner_order() {
        let rect = CellRect::from_corners(CellCoord::new(4, 1), CellCoord::new(1, 3));
        assert_eq!(rect.min(), CellCoord::new(1, 1));
        assert_eq!(rect.max(), CellCoord::new(4, 3));
        assert!(rect.contains(CellCoord::new(1, 1)));
        assert!(rect.contains(CellCoord::new(4, 3)));
        assert!(!rect.contains(CellCoord::new(5, 3)));
        assert!(!rect.contains(CellCoord::new(2, 0)));
    }

    #[test]
    fn square_footprint_covers_expected_cells() {
        let footprint = Footprint::square(2);
        let cells: Vec<_> = footprint.cells(CellCoord::new(3, 5)).collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(3, 5),
                CellCoord::new(4, 5),
                CellCoord::new(3, 6),
                CellCoord::new(4, 6),
            ]
        );
        assert_eq!(Footprint::single().offsets().len(), 1);
    }

    #[test]
    fn angle_from_centre_follows_axes() {
        let centre = Vec2::new(5.0, 5.0);
        assert!((angle_from_centre(centre, Vec2::new(9.0, 5.0)) - 0.0).abs() < 1e-4);
        assert!((angle_from_centre(centre, Vec2::new(5.0, 9.0)) - 90.0).abs() < 1e-4);
        assert!((angle_from_centre(centre, Vec2::new(1.0, 5.0)) - 180.0).abs() < 1e-4);
        assert!((angle_from_centre(centre, Vec2::new(5.0, 1.0)) - 270.0).abs() < 1e-4);
        assert_eq!(angle_from_centre(centre, centre), 0.0);
    }

    #[test]
    fn sector_wraps_past_full_revolution() {
        let sector = Sector::new(300.0, 120.0);
        assert!((sector.max_angle() - 60.0).abs() < 1e-4);
        assert!(sector.contains(300.0));
        assert!(sector.contains(359.5));
        assert!(sector.contains(0.0));
        assert!(sector.contains(59.9));
        assert!(!sector.contains(60.0));
        assert!(!sector.contains(180.0));
    }

    #[test]
    fn sector_is_half_open_without_wrap() {
        let sector = Sector::new(0.0, 120.0);
        assert!(sector.contains(0.0));
        assert!(sector.contains(119.9));
        assert!(!sector.contains(120.0));
        assert!(!sector.contains(240.0));
    }

    #[test]
    fn full_circle_sector_contains_everything() {
        let sector = Sector::new(42.0, 360.0);
        for angle in [0.0, 41.9, 42.0, 180.0, 359.9] {
            assert!(sector.contains(angle), "angle {angle} should be inside");
        }
        assert!(Sector::full_circle().contains(123.0));
    }

    #[test]
    fn world_positions_round_onto_cells() {
        let cell = CellCoord::from_world(Vec3::new(2.4, 7.0, 3.6));
        assert_eq!(cell, CellCoord::new(2, 4));
        let lifted = cell.world_position(1.5);
        assert_eq!(lifted, Vec3::new(2.0, 1.5, 4.0));
    }

    #[test]
    fn crowding_margins_scale_with_weight() {
        assert_eq!(MoverClass::Scuttler.default_crowding_margin(), 1);
        assert_eq!(MoverClass::Crawler.default_crowding_margin(), 2);
        assert_eq!(MoverClass::ALL.map(MoverClass::index), [0, 1]);
    }

    #[test]
    fn play_mode_parses_from_toml_configuration() {
        #[derive(serde::Deserialize)]
        struct Stage {
            mode: PlayMode,
            rect: CellRect,
        }

        let stage: Stage = toml::from_str(
            "mode = \"Tutorial\"\nrect = { min = { x = 1, z = 2 }, max = { x = 3, z = 4 } }\n",
        )
        .expect("parse stage");
        assert_eq!(stage.mode, PlayMode::Tutorial);
        assert!(stage.mode.admits_spawning());
        assert!(!PlayMode::GameOver.admits_spawning());
        assert!(stage.rect.contains(CellCoord::new(2, 3)));
    }
}
