#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative time-sliced execution for long-running simulation jobs.
//!
//! A [`Job`] performs its work in small units and keeps its own cursors, so a
//! caller can run it for a bounded slice of time each frame and resume it on
//! the next. The scheduler measures each slice against the configured budget
//! and tells the job to yield once the budget is spent. At least one unit runs
//! per slice, so every job makes progress even under a zero budget.

use std::time::Duration;

use colony_defence_core::Clock;
use serde::Deserialize;

const DEFAULT_SLICE_BUDGET_MS: u64 = 2;

/// Outcome of running a job for one slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The job yielded with work remaining.
    Continue,
    /// The job has no work left.
    Done,
}

/// Resumable unit of batch work driven by the [`TimeSlicedScheduler`].
pub trait Job<Ctx> {
    /// Performs units of work until the job completes or `slice` is spent.
    ///
    /// Implementations call [`Slice::finish_unit`] after each unit and return
    /// [`Step::Continue`] as soon as it reports that the budget is gone.
    fn step(&mut self, ctx: &mut Ctx, slice: &mut Slice<'_>) -> Step;

    /// Abandons remaining work, leaving shared state valid.
    fn abort(&mut self, _ctx: &mut Ctx) {}
}

/// Budget bookkeeping for a single slice.
pub struct Slice<'a> {
    clock: &'a dyn Clock,
    started: Duration,
    budget: Duration,
    units: u32,
}

impl<'a> Slice<'a> {
    /// Starts a slice measured against `clock`.
    #[must_use]
    pub fn new(clock: &'a dyn Clock, budget: Duration) -> Self {
        Self {
            clock,
            started: clock.now(),
            budget,
            units: 0,
        }
    }

    /// Records a completed unit and reports whether the job must now yield.
    pub fn finish_unit(&mut self) -> bool {
        self.units = self.units.saturating_add(1);
        self.elapsed() >= self.budget
    }

    /// Units completed so far in this slice.
    #[must_use]
    pub fn units(&self) -> u32 {
        self.units
    }

    /// Time spent in this slice so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started)
    }
}

impl std::fmt::Debug for Slice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slice")
            .field("started", &self.started)
            .field("budget", &self.budget)
            .field("units", &self.units)
            .finish()
    }
}

/// Tuning parameters for the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall time a job may consume per slice, in milliseconds.
    pub slice_budget_ms: u64,
}

impl SchedulerConfig {
    /// Creates a configuration with the provided per-slice budget.
    #[must_use]
    pub const fn new(slice_budget_ms: u64) -> Self {
        Self { slice_budget_ms }
    }

    /// Per-slice budget as a duration.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        Duration::from_millis(self.slice_budget_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SLICE_BUDGET_MS)
    }
}

/// Counters describing the slices run so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceStats {
    /// Slices executed.
    pub slices: u64,
    /// Units completed across all slices.
    pub units: u64,
    /// Jobs that reported [`Step::Done`].
    pub jobs_completed: u64,
    /// Jobs cancelled before completion.
    pub jobs_cancelled: u64,
    /// Duration of the most recent slice.
    pub last_slice: Duration,
    /// Longest slice observed.
    pub longest_slice: Duration,
}

/// Single-threaded cooperative scheduler that bounds the time spent per slice.
#[derive(Debug)]
pub struct TimeSlicedScheduler<C: Clock> {
    clock: C,
    config: SchedulerConfig,
    stats: SliceStats,
}

impl<C: Clock> TimeSlicedScheduler<C> {
    /// Creates a scheduler reading time from `clock`.
    #[must_use]
    pub fn new(clock: C, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            stats: SliceStats::default(),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Statistics gathered so far.
    #[must_use]
    pub fn stats(&self) -> SliceStats {
        self.stats
    }

    /// Runs `job` for one slice.
    pub fn run_slice<Ctx, J>(&mut self, job: &mut J, ctx: &mut Ctx) -> Step
    where
        J: Job<Ctx> + ?Sized,
    {
        let _span = tracing::trace_span!("scheduler_slice", slice = self.stats.slices).entered();
        let mut slice = Slice::new(&self.clock, self.config.budget());
        let step = job.step(ctx, &mut slice);
        let units = slice.units();
        let elapsed = slice.elapsed();

        self.stats.slices = self.stats.slices.saturating_add(1);
        self.stats.units = self.stats.units.saturating_add(u64::from(units));
        self.stats.last_slice = elapsed;
        self.stats.longest_slice = self.stats.longest_slice.max(elapsed);
        if step == Step::Done {
            self.stats.jobs_completed = self.stats.jobs_completed.saturating_add(1);
        }

        tracing::trace!(units, ?elapsed, ?step, "slice finished");
        step
    }

    /// Runs `job` slice after slice until it completes, returning the slice count.
    pub fn run_to_completion<Ctx, J>(&mut self, job: &mut J, ctx: &mut Ctx) -> u64
    where
        J: Job<Ctx> + ?Sized,
    {
        let mut slices = 0_u64;
        loop {
            slices = slices.saturating_add(1);
            if self.run_slice(job, ctx) == Step::Done {
                return slices;
            }
        }
    }

    /// Cancels `job` between slices.
    pub fn cancel<Ctx, J>(&mut self, job: &mut J, ctx: &mut Ctx)
    where
        J: Job<Ctx> + ?Sized,
    {
        job.abort(ctx);
        self.stats.jobs_cancelled = self.stats.jobs_cancelled.saturating_add(1);
        tracing::debug!("job cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_defence_core::ManualClock;

    #[test]
    fn zero_budget_still_runs_one_unit() {
        let clock = ManualClock::new();
        let mut slice = Slice::new(&clock, Duration::ZERO);
        assert!(slice.finish_unit(), "a spent budget asks for a yield");
        assert_eq!(slice.units(), 1);
    }

    #[test]
    fn slice_yields_once_budget_is_spent() {
        let clock = ManualClock::new();
        let mut slice = Slice::new(&clock, Duration::from_millis(3));
        clock.advance(Duration::from_millis(1));
        assert!(!slice.finish_unit());
        clock.advance(Duration::from_millis(2));
        assert!(slice.finish_unit());
        assert_eq!(slice.elapsed(), Duration::from_millis(3));
    }

    #[test]
    fn config_defaults_and_parses() {
        assert_eq!(SchedulerConfig::default().budget(), Duration::from_millis(2));
        let parsed: SchedulerConfig = toml::from_str("slice_budget_ms = 7").expect("parse");
        assert_eq!(parsed.budget(), Duration::from_millis(7));
        let empty: SchedulerConfig = toml::from_str("").expect("parse");
        assert_eq!(empty, SchedulerConfig::default());
    }
}
