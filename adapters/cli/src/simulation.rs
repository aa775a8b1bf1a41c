//! Frame loop wiring the grid, path precomputer and wave spawner together.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use colony_defence_core::{
    CellCoord, Clock, Command, Event, ManualClock, MonotonicClock, MoverClass, PlayMode,
    SpawnExecutor, SpawnHandle, StageSource,
};
use colony_defence_system_pathing::{PathPrecomputer, PrecomputeContext};
use colony_defence_system_scheduler::TimeSlicedScheduler;
use colony_defence_system_spawning::{SpawnContext, WaveSpawner};
use colony_defence_world::{apply, query, SpatialGrid};
use glam::Vec3;

use crate::{
    navigation::NavigationField,
    scenario::{Scenario, SimulationConfig},
    terrain::SyntheticTerrain,
};

/// Stage reported to the spawner.
#[derive(Clone, Copy, Debug)]
struct Stage {
    mode: PlayMode,
    night: bool,
}

impl StageSource for Stage {
    fn current_mode(&self) -> PlayMode {
        self.mode
    }

    fn is_night(&self) -> bool {
        self.night
    }
}

/// Stand-in for the host game: every hostile dies after a fixed lifetime.
#[derive(Debug)]
struct Roster {
    clock: ManualClock,
    lifetime: Duration,
    next: u32,
    alive: Vec<(SpawnHandle, Duration)>,
    crawlers: u32,
}

impl Roster {
    fn expired(&mut self, now: Duration) -> Vec<SpawnHandle> {
        let (dead, alive) = self
            .alive
            .drain(..)
            .partition::<Vec<_>, _>(|(_, deadline)| *deadline <= now);
        self.alive = alive;
        dead.into_iter().map(|(handle, _)| handle).collect()
    }
}

impl SpawnExecutor for Roster {
    fn on_spawn_requested(&mut self, _position: Vec3, mover: MoverClass) -> SpawnHandle {
        let handle = SpawnHandle::new(self.next);
        self.next = self.next.wrapping_add(1);
        self.alive.push((handle, self.clock.now() + self.lifetime));
        if mover == MoverClass::Crawler {
            self.crawlers += 1;
        }
        handle
    }

    fn on_placement_failed(&mut self, handle: SpawnHandle, cell: CellCoord) {
        self.alive.retain(|(alive, _)| *alive != handle);
        tracing::debug!(handle = handle.get(), x = cell.x(), z = cell.z(), "hostile despawned");
    }
}

/// Totals gathered over a simulated session.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Report {
    pub(crate) nights: u32,
    pub(crate) waves: u32,
    pub(crate) short_waves: u32,
    pub(crate) hostiles: u32,
    pub(crate) crawlers: u32,
    pub(crate) placement_failures: u32,
    pub(crate) banned_cells: usize,
    pub(crate) slices: u64,
    pub(crate) simulated: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nights simulated:    {}", self.nights)?;
        writeln!(f, "waves completed:     {} ({} cut short)", self.waves, self.short_waves)?;
        writeln!(f, "hostiles placed:     {} ({} crawlers)", self.hostiles, self.crawlers)?;
        writeln!(f, "placement failures:  {}", self.placement_failures)?;
        writeln!(f, "banned cells:        {}", self.banned_cells)?;
        writeln!(f, "scheduler slices:    {}", self.slices)?;
        write!(f, "simulated time:      {:.1}s", self.simulated.as_secs_f32())
    }
}

/// Headless colony session.
#[derive(Debug)]
pub(crate) struct Simulation {
    grid: SpatialGrid,
    terrain: SyntheticTerrain,
    navigation: NavigationField,
    precomputer: PathPrecomputer,
    spawner: WaveSpawner,
    scheduler: TimeSlicedScheduler<MonotonicClock>,
    clock: ManualClock,
    roster: Roster,
    stage: Stage,
    settings: SimulationConfig,
    building_count: u32,
    events: Vec<Event>,
}

impl Simulation {
    pub(crate) fn new(scenario: Scenario) -> Result<Self> {
        let mut grid = SpatialGrid::new(&scenario.grid).context("invalid grid bounds")?;
        let spawner = WaveSpawner::new(scenario.spawner).context("invalid spawner settings")?;

        let (x_max, z_max) = query::bounds(&grid);
        let centre = query::centre(&grid);
        let terrain = SyntheticTerrain::new(x_max, z_max, centre, scenario.terrain);
        let colony = CellCoord::from_world(Vec3::new(centre.x, 0.0, centre.y));
        let navigation = NavigationField::build(&terrain, colony);

        let mut events = Vec::new();
        let mut building_count = 0;
        for building in &scenario.buildings {
            let footprint = building.footprint();
            if !grid.is_available_for_building(building.origin, &footprint) {
                tracing::warn!(
                    x = building.origin.x(),
                    z = building.origin.z(),
                    "building overlaps the map edge or another building, skipped"
                );
                continue;
            }
            apply(
                &mut grid,
                Command::RegisterBuilding {
                    origin: building.origin,
                    footprint,
                },
                &mut events,
            );
            building_count += 1;
        }
        for &cell in &scenario.minerals {
            apply(&mut grid, Command::RegisterMineral { cell }, &mut events);
        }

        let clock = ManualClock::new();
        let roster = Roster {
            clock: clock.clone(),
            lifetime: Duration::from_millis(scenario.simulation.hostile_lifetime_ms),
            next: 0,
            alive: Vec::new(),
            crawlers: 0,
        };

        Ok(Self {
            precomputer: PathPrecomputer::new(&grid),
            grid,
            terrain,
            navigation,
            spawner,
            scheduler: TimeSlicedScheduler::new(MonotonicClock::new(), scenario.scheduler),
            clock,
            roster,
            stage: Stage {
                mode: scenario.simulation.mode,
                night: false,
            },
            settings: scenario.simulation,
            building_count,
            events,
        })
    }

    /// Precomputes paths, then simulates `nights` nights of waves.
    pub(crate) fn run(&mut self, nights: u32) -> Report {
        while !self.precomputer.is_finished() {
            self.precompute_frame();
        }

        for _ in 0..nights {
            self.spawner.begin_night();
            self.stage.night = true;
            let mut frames = 0;
            while !self.night_is_over() {
                if frames >= self.settings.max_frames_per_night {
                    tracing::warn!(frames, "night cut off before its waves were fought off");
                    break;
                }
                self.spawn_frame();
                frames += 1;
            }
            self.stage.night = false;
        }

        self.report(nights)
    }

    fn frame(&self) -> Duration {
        Duration::from_millis(self.settings.frame_ms)
    }

    fn precompute_frame(&mut self) {
        self.clock.advance(self.frame());
        let mut ctx = PrecomputeContext {
            grid: &mut self.grid,
            sampler: &self.terrain,
            oracle: &self.navigation,
            events: &mut self.events,
        };
        let _ = self.scheduler.run_slice(&mut self.precomputer, &mut ctx);
    }

    fn spawn_frame(&mut self) {
        self.clock.advance(self.frame());
        let now = self.clock.now();
        for handle in self.roster.expired(now) {
            let _ = self.spawner.deregister_hostile(handle, now);
        }

        let mut ctx = SpawnContext {
            grid: &mut self.grid,
            sampler: &self.terrain,
            executor: &mut self.roster,
            stage: &self.stage,
            building_count: self.building_count,
            now,
            paths_ready: self.precomputer.is_finished(),
            events: &mut self.events,
        };
        let _ = self.spawner.update(&mut self.scheduler, &mut ctx);
    }

    fn night_is_over(&self) -> bool {
        self.spawner.current_wave() >= self.spawner.config().waves_per_night
            && !self.spawner.phase().is_running()
            && self.spawner.active_hostiles() == 0
    }

    fn report(&self, nights: u32) -> Report {
        let mut report = Report {
            nights,
            crawlers: self.roster.crawlers,
            banned_cells: query::banned_count(&self.grid),
            slices: self.scheduler.stats().slices,
            simulated: self.clock.now(),
            ..Report::default()
        };
        for event in &self.events {
            match event {
                Event::WaveCompleted { abandoned, .. } => {
                    report.waves += 1;
                    if *abandoned > 0 {
                        report.short_waves += 1;
                    }
                }
                Event::HostileSpawned { .. } => report.hostiles += 1,
                Event::PlacementFailed { .. } => report.placement_failures += 1,
                _ => {}
            }
        }
        report
    }
}
