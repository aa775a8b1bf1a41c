//! Versioned TOML description of a simulated colony.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use colony_defence_core::{CellCoord, CellOffset, CellRect, Footprint, PlayMode};
use colony_defence_system_scheduler::SchedulerConfig;
use colony_defence_system_spawning::SpawnerConfig;
use colony_defence_world::GridConfig;
use serde::Deserialize;

use crate::terrain::TerrainConfig;

/// Scenario format understood by this build.
pub(crate) const SCENARIO_VERSION: u32 = 1;

/// Everything needed to build and drive one simulated colony.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    pub(crate) version: u32,
    pub(crate) grid: GridConfig,
    pub(crate) scheduler: SchedulerConfig,
    pub(crate) spawner: SpawnerConfig,
    pub(crate) terrain: TerrainConfig,
    pub(crate) simulation: SimulationConfig,
    pub(crate) buildings: Vec<BuildingPlacement>,
    pub(crate) minerals: Vec<CellCoord>,
}

impl Default for Scenario {
    fn default() -> Self {
        let colony = CellRect::from_corners(CellCoord::new(26, 26), CellCoord::new(37, 37));
        Self {
            version: SCENARIO_VERSION,
            grid: GridConfig::new(63, 63)
                .with_exclusion_zone(colony)
                .with_tutorial_zone(CellRect::from_corners(
                    CellCoord::new(8, 40),
                    CellCoord::new(18, 52),
                )),
            scheduler: SchedulerConfig::default(),
            spawner: SpawnerConfig::default(),
            terrain: TerrainConfig::default(),
            simulation: SimulationConfig::default(),
            buildings: [(28, 28), (32, 28), (28, 32), (32, 32), (30, 35)]
                .into_iter()
                .map(|(x, z)| BuildingPlacement {
                    origin: CellCoord::new(x, z),
                    width: 2,
                    depth: 2,
                })
                .collect(),
            minerals: vec![CellCoord::new(24, 30), CellCoord::new(40, 33)],
        }
    }
}

/// Pacing of the simulated session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SimulationConfig {
    /// Stage the session plays in.
    pub(crate) mode: PlayMode,
    /// Simulated time advanced per frame.
    pub(crate) frame_ms: u64,
    /// Simulated time a hostile survives before the colony kills it.
    pub(crate) hostile_lifetime_ms: u64,
    /// Frames after which an unfinished night is cut off.
    pub(crate) max_frames_per_night: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: PlayMode::Normal,
            frame_ms: 16,
            hostile_lifetime_ms: 20_000,
            max_frames_per_night: 200_000,
        }
    }
}

/// Rectangular building placed before the first night.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct BuildingPlacement {
    pub(crate) origin: CellCoord,
    pub(crate) width: i32,
    pub(crate) depth: i32,
}

impl BuildingPlacement {
    pub(crate) fn footprint(&self) -> Footprint {
        Footprint::new(
            (0..self.depth)
                .flat_map(|dz| (0..self.width).map(move |dx| CellOffset::new(dx, dz)))
                .collect(),
        )
    }
}

/// Reads and validates the scenario stored at `path`.
pub(crate) fn load(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid scenario {}", path.display()))
}

fn parse(contents: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(contents).context("scenario is not valid TOML")?;
    if scenario.version != SCENARIO_VERSION {
        bail!(
            "unsupported scenario version {} (expected {SCENARIO_VERSION})",
            scenario.version
        );
    }
    if scenario.simulation.frame_ms == 0 {
        bail!("simulation.frame_ms must be positive");
    }
    for building in &scenario.buildings {
        if building.width <= 0 || building.depth <= 0 {
            bail!(
                "building at ({}, {}) has an empty footprint",
                building.origin.x(),
                building.origin.z()
            );
        }
    }
    Ok(scenario)
}
