//! Synthetic ground used by the headless driver.

use colony_defence_core::{CellCoord, CellRect, GraphNode, GroundSampler};
use glam::{Vec2, Vec3};
use serde::Deserialize;

/// Shape of the generated ground.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct TerrainConfig {
    /// Height of the outer rim.
    pub(crate) plateau_height: f32,
    /// How far the ground dips towards the colony.
    pub(crate) bowl_depth: f32,
    /// Cells sunk below the plateau.
    pub(crate) pits: Vec<CellCoord>,
    /// Depth of every pit below the plateau.
    pub(crate) pit_depth: f32,
    /// Shallow water: ground exists but hostiles cannot walk it.
    pub(crate) water: Vec<CellRect>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            plateau_height: 2.0,
            bowl_depth: 1.0,
            pits: vec![CellCoord::new(10, 12), CellCoord::new(52, 20)],
            pit_depth: 3.0,
            water: vec![CellRect::from_corners(
                CellCoord::new(44, 44),
                CellCoord::new(49, 47),
            )],
        }
    }
}

/// Bowl-shaped ground centred on the colony, with pits and water.
#[derive(Clone, Debug)]
pub(crate) struct SyntheticTerrain {
    x_max: i32,
    z_max: i32,
    centre: Vec2,
    radius: f32,
    config: TerrainConfig,
}

impl SyntheticTerrain {
    pub(crate) fn new(x_max: i32, z_max: i32, centre: Vec2, config: TerrainConfig) -> Self {
        let radius = Vec2::new(x_max as f32, z_max as f32).length().max(1.0) * 0.5;
        Self {
            x_max,
            z_max,
            centre,
            radius,
            config,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        u32::try_from(self.x_max + 1).unwrap_or(0)
    }

    pub(crate) fn depth(&self) -> u32 {
        u32::try_from(self.z_max + 1).unwrap_or(0)
    }

    pub(crate) fn contains(&self, cell: CellCoord) -> bool {
        (0..=self.x_max).contains(&cell.x()) && (0..=self.z_max).contains(&cell.z())
    }

    pub(crate) fn is_pit(&self, cell: CellCoord) -> bool {
        self.config.pits.contains(&cell)
    }

    pub(crate) fn is_water(&self, cell: CellCoord) -> bool {
        self.config.water.iter().any(|rect| rect.contains(cell))
    }

    /// Row-major index doubling as the movement graph node of a cell.
    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let x = usize::try_from(cell.x()).ok()?;
        let z = usize::try_from(cell.z()).ok()?;
        Some(z * self.width() as usize + x)
    }

    fn height_at(&self, cell: CellCoord) -> f32 {
        if self.is_pit(cell) {
            return self.config.plateau_height - self.config.pit_depth;
        }
        let distance = cell.plane_position().distance(self.centre) / self.radius;
        self.config.plateau_height - self.config.bowl_depth * (1.0 - distance.min(1.0))
    }
}

impl GroundSampler for SyntheticTerrain {
    fn sample_ground_height(&self, x: f32, z: f32) -> Option<f32> {
        let cell = CellCoord::from_world(Vec3::new(x, 0.0, z));
        self.contains(cell).then(|| self.height_at(cell))
    }

    fn resolve_onto_movement_graph(&self, position: Vec3) -> Option<GraphNode> {
        let cell = CellCoord::from_world(position);
        if self.is_water(cell) {
            return None;
        }
        let index = self.index(cell)?;
        Some(GraphNode::new(index as u64))
    }
}
