#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave spawning system that places hostiles around the colony.
//!
//! Each wave draws a random sector, splits its hostiles between cells inside
//! and outside that sector, and places them one per unit of work under the
//! time-sliced scheduler. Cells that turn out to be unusable are excluded for
//! the rest of the wave, or permanently when the terrain is at fault, and the
//! wave is cut short rather than spinning once no candidates remain.

mod cadence;
mod config;
mod seed;
mod wave;

use std::{collections::BTreeSet, time::Duration};

use colony_defence_core::{
    BanReason, CellCoord, Clock, Event, GroundSampler, PlayMode, Sector, SpawnExecutor,
    SpawnHandle, StageSource, WaveId,
};
use colony_defence_system_scheduler::{Job, Slice, Step, TimeSlicedScheduler};
use colony_defence_world::{query, EligibilityList, SpatialGrid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use config::{ConfigError, SpawnerConfig};
pub use wave::{hostiles_in_wave, majority_quota, wave_multiplier, WavePhase, WaveState};

use cadence::CrawlerCadence;
use seed::derive_wave_seed;

/// Collaborators and frame inputs the spawner consults while placing hostiles.
pub struct SpawnContext<'a> {
    /// Grid providing eligibility and receiving exclusion updates.
    pub grid: &'a mut SpatialGrid,
    /// Ground and movement graph queries.
    pub sampler: &'a dyn GroundSampler,
    /// Host collaborator that instantiates hostiles.
    pub executor: &'a mut dyn SpawnExecutor,
    /// Reports the game stage and time of day.
    pub stage: &'a dyn StageSource,
    /// Number of buildings the colony currently owns.
    pub building_count: u32,
    /// Current simulation time.
    pub now: Duration,
    /// Whether path precomputation has finished.
    pub paths_ready: bool,
    /// Sink for emitted events.
    pub events: &'a mut Vec<Event>,
}

impl std::fmt::Debug for SpawnContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnContext")
            .field("mode", &self.stage.current_mode())
            .field("building_count", &self.building_count)
            .field("now", &self.now)
            .field("paths_ready", &self.paths_ready)
            .finish()
    }
}

/// Outcome of a single placement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    Accepted,
    QuotaRejected,
    Discarded,
    Failed,
    NoCandidates,
    Exhausted,
}

/// Recurring job that releases hostiles in waves.
#[derive(Debug)]
pub struct WaveSpawner {
    config: SpawnerConfig,
    max_per_building: f32,
    night: u32,
    night_started: bool,
    current_wave: u32,
    waves_started: u64,
    phase: WavePhase,
    wave: WaveState,
    wave_mode: PlayMode,
    rng: ChaCha8Rng,
    cadence: CrawlerCadence,
    active: BTreeSet<SpawnHandle>,
    killed_this_wave: u32,
    last_death: Option<Duration>,
    paths_ready: bool,
    empty_retries: u32,
    consecutive_rejections: u32,
}

impl WaveSpawner {
    /// Creates a spawner after validating `config`.
    pub fn new(config: SpawnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            max_per_building: config.max_per_building,
            night: 0,
            night_started: false,
            current_wave: 0,
            waves_started: 0,
            phase: WavePhase::Idle,
            wave: WaveState::idle(),
            wave_mode: PlayMode::Normal,
            rng: ChaCha8Rng::seed_from_u64(derive_wave_seed(config.seed, 0, 0, 0)),
            cadence: CrawlerCadence::new(config.crawler_frequency),
            active: BTreeSet::new(),
            killed_this_wave: 0,
            last_death: None,
            paths_ready: false,
            empty_retries: 0,
            consecutive_rejections: 0,
            config,
        })
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Quotas and counters of the current or most recent wave.
    #[must_use]
    pub fn wave_state(&self) -> &WaveState {
        &self.wave
    }

    /// Zero-based index of the current night.
    #[must_use]
    pub fn night(&self) -> u32 {
        self.night
    }

    /// Regular waves started during the current night.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.current_wave
    }

    /// Hostiles per building used to size the last wave of the night.
    #[must_use]
    pub fn max_per_building(&self) -> f32 {
        self.max_per_building
    }

    /// Number of placed hostiles that are still alive.
    #[must_use]
    pub fn active_hostiles(&self) -> usize {
        self.active.len()
    }

    /// Starts a new night, resetting the wave counter.
    ///
    /// Every night after the first raises the per-building cap by the
    /// configured increment.
    pub fn begin_night(&mut self) {
        if self.night_started {
            self.night = self.night.saturating_add(1);
            self.max_per_building += self.config.per_building_increment_per_night;
        }
        self.night_started = true;
        self.current_wave = 0;
        tracing::info!(
            night = self.night,
            max_per_building = self.max_per_building,
            "night started"
        );
    }

    /// Forgets a dead hostile and stamps the time of death.
    ///
    /// Returns whether the handle belonged to a live hostile.
    pub fn deregister_hostile(&mut self, handle: SpawnHandle, now: Duration) -> bool {
        if !self.active.remove(&handle) {
            return false;
        }
        self.last_death = Some(now);
        self.killed_this_wave = self.killed_this_wave.saturating_add(1);
        true
    }

    /// Fraction of the night's waves that has been fought off.
    ///
    /// Completed waves count fully; the current wave contributes the share of
    /// its hostiles killed so far.
    #[must_use]
    pub fn kill_progress(&self) -> f32 {
        if self.current_wave == 0 {
            return 0.0;
        }
        let within_wave = if self.wave.hostiles() == 0 {
            1.0
        } else {
            (self.killed_this_wave as f32 / self.wave.hostiles() as f32).min(1.0)
        };
        ((self.current_wave - 1) as f32 + within_wave) / self.config.waves_per_night as f32
    }

    /// Advances wave spawning by at most one scheduler slice.
    ///
    /// Starts a wave when the entry conditions hold, continues a wave in
    /// progress, and cancels it once the game is over. The update that
    /// starts a wave spends its slice selecting the sector and places nothing.
    pub fn update<'a, C: Clock>(
        &mut self,
        scheduler: &mut TimeSlicedScheduler<C>,
        ctx: &mut SpawnContext<'a>,
    ) -> Option<Step> {
        if ctx.paths_ready && !self.paths_ready {
            self.paths_ready = true;
            tracing::debug!("spawning gate opened");
        }

        let mode = ctx.stage.current_mode();
        if self.phase.is_running() {
            if mode == PlayMode::GameOver {
                scheduler.cancel(self, ctx);
                return None;
            }
            return Some(scheduler.run_slice(self, ctx));
        }

        if !self.can_start_wave(ctx) {
            return None;
        }
        self.start_wave(ctx);
        Some(Step::Continue)
    }

    fn can_start_wave(&self, ctx: &SpawnContext<'_>) -> bool {
        let delay_elapsed = self
            .last_death
            .map_or(true, |death| ctx.now.saturating_sub(death) > self.config.wave_delay());
        self.paths_ready
            && ctx.stage.current_mode().admits_spawning()
            && ctx.stage.is_night()
            && self.active.is_empty()
            && delay_elapsed
            && self.current_wave < self.config.waves_per_night
    }

    fn start_wave(&mut self, ctx: &mut SpawnContext<'_>) {
        self.phase = WavePhase::SelectingSector;
        let mode = ctx.stage.current_mode();
        let tutorial = mode == PlayMode::Tutorial;
        if !tutorial {
            self.current_wave += 1;
        }
        let wave_number = if tutorial { 0 } else { self.current_wave };
        let id = WaveId::new(self.night, wave_number);

        self.rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(
            self.config.seed,
            self.night,
            wave_number,
            self.waves_started,
        ));
        self.waves_started = self.waves_started.saturating_add(1);

        let (hostiles, sector) = if tutorial {
            (self.config.tutorial_wave_size, Sector::full_circle())
        } else {
            let hostiles = hostiles_in_wave(
                ctx.building_count,
                self.max_per_building,
                self.current_wave,
                self.config.waves_per_night,
            );
            let start = self.rng.gen_range(0..360_u32) as f32;
            (hostiles, Sector::new(start, self.config.sector_width_degrees))
        };

        self.wave = WaveState::new(id, tutorial, hostiles, self.config.majority_share, sector);
        self.wave_mode = mode;
        self.killed_this_wave = 0;
        self.empty_retries = 0;
        self.consecutive_rejections = 0;

        ctx.grid.reset_current_wave_eligibility(mode);
        ctx.grid.partition_current_wave(&sector);

        ctx.events.push(Event::WaveStarted {
            wave: id,
            hostiles,
            majority_quota: self.wave.majority_quota(),
            minority_quota: self.wave.minority_quota(),
            sector,
        });
        tracing::info!(
            night = id.night(),
            wave = id.wave(),
            hostiles,
            majority_quota = self.wave.majority_quota(),
            minority_quota = self.wave.minority_quota(),
            sector_min = sector.min_angle(),
            candidates = query::eligible_cells(ctx.grid, EligibilityList::CurrentWave).len(),
            "wave started"
        );
    }

    fn has_open_candidates(&self, grid: &SpatialGrid) -> bool {
        let open = |in_majority: bool, list: EligibilityList| {
            self.wave.has_room(in_majority) && !query::eligible_cells(grid, list).is_empty()
        };
        open(true, EligibilityList::Majority) || open(false, EligibilityList::Minority)
    }

    fn place_one(&mut self, ctx: &mut SpawnContext<'_>) -> Attempt {
        if !self.has_open_candidates(ctx.grid) {
            self.empty_retries = self.empty_retries.saturating_add(1);
            if self.empty_retries >= self.config.max_empty_retries {
                return Attempt::Exhausted;
            }
            return Attempt::NoCandidates;
        }
        self.empty_retries = 0;

        let candidates = query::eligible_cells(ctx.grid, EligibilityList::CurrentWave);
        if candidates.is_empty() {
            return Attempt::NoCandidates;
        }
        let cell = candidates[self.rng.gen_range(0..candidates.len())];
        let in_majority = query::is_listed(ctx.grid, EligibilityList::Majority, cell);

        if !self.wave.has_room(in_majority) {
            self.consecutive_rejections = self.consecutive_rejections.saturating_add(1);
            if self.consecutive_rejections >= self.config.max_consecutive_rejections {
                return Attempt::Exhausted;
            }
            return Attempt::QuotaRejected;
        }
        self.consecutive_rejections = 0;

        if !ctx.grid.is_spawnable(cell, self.wave_mode, ctx.sampler, ctx.events) {
            let _ = ctx.grid.discard_from_current_wave(cell);
            tracing::trace!(x = cell.x(), z = cell.z(), "candidate discarded for this wave");
            return Attempt::Discarded;
        }

        let Some(height) = ctx.sampler.sample_ground_height(cell.x() as f32, cell.z() as f32)
        else {
            self.ban_off_navigable(ctx, cell);
            return Attempt::Failed;
        };

        let mover = self.cadence.peek();
        let position = cell.world_position(height);
        let handle = ctx.executor.on_spawn_requested(position, mover);
        if ctx.sampler.resolve_onto_movement_graph(position).is_none() {
            self.ban_off_navigable(ctx, cell);
            ctx.executor.on_placement_failed(handle, cell);
            ctx.events.push(Event::PlacementFailed { handle, cell });
            tracing::debug!(
                x = cell.x(),
                z = cell.z(),
                handle = handle.get(),
                "hostile missed the navigation surface"
            );
            return Attempt::Failed;
        }

        let _ = self.cadence.commit();
        self.wave.record(in_majority);
        let _ = self.active.insert(handle);
        let cleared = ctx
            .grid
            .remove_neighbourhood_from_current_wave(cell, self.config.margin(mover));
        ctx.events.push(Event::HostileSpawned {
            handle,
            cell,
            mover,
            in_majority,
        });
        tracing::trace!(
            x = cell.x(),
            z = cell.z(),
            ?mover,
            in_majority,
            cleared,
            "hostile placed"
        );
        Attempt::Accepted
    }

    fn ban_off_navigable(&mut self, ctx: &mut SpawnContext<'_>, cell: CellCoord) {
        if ctx.grid.register_off_navigable_position(cell) {
            ctx.events.push(Event::CellBanned {
                cell,
                reason: BanReason::OffNavigable,
            });
        }
    }

    fn complete(&mut self, ctx: &mut SpawnContext<'_>) {
        let spawned = self.wave.spawned();
        let abandoned = self.wave.hostiles().saturating_sub(spawned);
        if abandoned > 0 {
            tracing::warn!(
                wave = self.wave.id().wave(),
                spawned,
                abandoned,
                "no eligible cells left, wave cut short"
            );
        }
        if !self.wave.is_tutorial() && self.current_wave >= self.config.waves_per_night {
            ctx.grid.clear_sector_lists();
        }
        ctx.events.push(Event::WaveCompleted {
            wave: self.wave.id(),
            spawned,
            abandoned,
        });
        tracing::info!(wave = self.wave.id().wave(), spawned, abandoned, "wave completed");
        self.phase = WavePhase::Complete;
    }
}

impl<'a> Job<SpawnContext<'a>> for WaveSpawner {
    fn step(&mut self, ctx: &mut SpawnContext<'a>, slice: &mut Slice<'_>) -> Step {
        if !self.phase.is_running() {
            return Step::Done;
        }
        if self.phase == WavePhase::SelectingSector {
            self.phase = WavePhase::Placing;
        }

        loop {
            if self.wave.is_filled() {
                self.complete(ctx);
                return Step::Done;
            }

            match self.place_one(ctx) {
                Attempt::Exhausted => {
                    self.complete(ctx);
                    return Step::Done;
                }
                Attempt::Accepted => self.phase = WavePhase::Placing,
                Attempt::QuotaRejected
                | Attempt::Discarded
                | Attempt::Failed
                | Attempt::NoCandidates => self.phase = WavePhase::Retrying,
            }

            if slice.finish_unit() && !self.wave.is_filled() {
                return Step::Continue;
            }
        }
    }

    fn abort(&mut self, ctx: &mut SpawnContext<'a>) {
        if !self.phase.is_running() {
            return;
        }
        ctx.grid.reset_current_wave_eligibility(PlayMode::GameOver);
        ctx.events.push(Event::WaveAborted {
            wave: self.wave.id(),
            spawned: self.wave.spawned(),
        });
        tracing::info!(
            wave = self.wave.id().wave(),
            spawned = self.wave.spawned(),
            "wave aborted"
        );
        self.phase = WavePhase::Idle;
    }
}
