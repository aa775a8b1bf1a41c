#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! One-shot precomputation of per-cell paths toward the colony.

use colony_defence_core::{
    BanReason, CellCoord, Event, GraphNode, GroundSampler, MoverClass, PathOracle,
};
use colony_defence_system_scheduler::{Job, Slice, Step};
use colony_defence_world::SpatialGrid;

/// Collaborators the precomputer needs while it runs.
pub struct PrecomputeContext<'a> {
    /// Grid receiving path records and off-navigable bans.
    pub grid: &'a mut SpatialGrid,
    /// Ground and movement graph queries.
    pub sampler: &'a dyn GroundSampler,
    /// Path queries against the movement graph.
    pub oracle: &'a dyn PathOracle,
    /// Sink for emitted events.
    pub events: &'a mut Vec<Event>,
}

impl std::fmt::Debug for PrecomputeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecomputeContext")
            .field("cells", &self.grid.cell_count())
            .field("events", &self.events.len())
            .finish()
    }
}

/// Resumable job that fills the path cache of every cell for every mover class.
///
/// Cells are visited in row-major order and mover classes in declaration order
/// within a cell; each `(cell, mover)` pair is one unit of work. A cell whose
/// ground or movement-graph lookup fails is registered off-navigable and its
/// remaining mover classes are skipped.
#[derive(Debug)]
pub struct PathPrecomputer {
    total_cells: usize,
    next_cell: usize,
    next_mover: usize,
    node: Option<GraphNode>,
    off_navigable: u32,
    finished: bool,
    cancelled: bool,
}

impl PathPrecomputer {
    /// Prepares a precomputation pass over every cell of `grid`.
    #[must_use]
    pub fn new(grid: &SpatialGrid) -> Self {
        Self {
            total_cells: grid.cell_count(),
            next_cell: 0,
            next_mover: 0,
            node: None,
            off_navigable: 0,
            finished: false,
            cancelled: false,
        }
    }

    /// Whether every cell has been processed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fraction of cells processed, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.total_cells == 0 {
            return 1.0;
        }
        self.next_cell as f32 / self.total_cells as f32
    }

    /// Number of cells registered off-navigable during the pass.
    #[must_use]
    pub fn off_navigable(&self) -> u32 {
        self.off_navigable
    }

    /// Index of the next cell to process, in row-major order.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.next_cell
    }

    fn process_unit(&mut self, ctx: &mut PrecomputeContext<'_>, cell: CellCoord) {
        if self.next_mover == 0 {
            self.node = resolve(ctx.sampler, cell);
        }
        let Some(node) = self.node else {
            self.off_navigable = self.off_navigable.saturating_add(1);
            if ctx.grid.register_off_navigable_position(cell) {
                ctx.events.push(Event::CellBanned {
                    cell,
                    reason: BanReason::OffNavigable,
                });
            }
            tracing::trace!(x = cell.x(), z = cell.z(), "cell has no navigable ground");
            self.advance_cell();
            return;
        };

        let mover = MoverClass::ALL[self.next_mover];
        let record = ctx.oracle.compute_path(node, mover);
        let _ = ctx.grid.record_path(cell, mover, record);
        tracing::trace!(
            x = cell.x(),
            z = cell.z(),
            ?mover,
            exists = record.exists(),
            "path recorded"
        );

        self.next_mover += 1;
        if self.next_mover == MoverClass::COUNT {
            self.advance_cell();
        }
    }

    fn advance_cell(&mut self) {
        self.next_cell += 1;
        self.next_mover = 0;
        self.node = None;
    }

    fn finish(&mut self, ctx: &mut PrecomputeContext<'_>) {
        self.finished = true;
        let cells = u32::try_from(self.total_cells).unwrap_or(u32::MAX);
        ctx.events.push(Event::PathsPrecomputed {
            cells,
            off_navigable: self.off_navigable,
        });
        tracing::info!(cells, off_navigable = self.off_navigable, "paths precomputed");
    }
}

fn resolve(sampler: &dyn GroundSampler, cell: CellCoord) -> Option<GraphNode> {
    let height = sampler.sample_ground_height(cell.x() as f32, cell.z() as f32)?;
    sampler.resolve_onto_movement_graph(cell.world_position(height))
}

impl<'a> Job<PrecomputeContext<'a>> for PathPrecomputer {
    fn step(&mut self, ctx: &mut PrecomputeContext<'a>, slice: &mut Slice<'_>) -> Step {
        if self.finished || self.cancelled {
            return Step::Done;
        }

        while let Some(cell) = ctx.grid.cell_at(self.next_cell) {
            self.process_unit(ctx, cell);
            if slice.finish_unit() && self.next_cell < self.total_cells {
                return Step::Continue;
            }
        }

        self.finish(ctx);
        Step::Done
    }

    fn abort(&mut self, _ctx: &mut PrecomputeContext<'a>) {
        self.cancelled = true;
        tracing::debug!(cursor = self.next_cell, "path precomputation cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_defence_core::{ManualClock, PathRecord};
    use colony_defence_system_scheduler::{SchedulerConfig, TimeSlicedScheduler};
    use colony_defence_world::{query, GridConfig};
    use glam::Vec3;

    struct Flat;

    impl GroundSampler for Flat {
        fn sample_ground_height(&self, _x: f32, _z: f32) -> Option<f32> {
            Some(0.0)
        }

        fn resolve_onto_movement_graph(&self, position: Vec3) -> Option<GraphNode> {
            Some(GraphNode::new(position.x as u64))
        }
    }

    struct Distance;

    impl PathOracle for Distance {
        fn compute_path(&self, node: GraphNode, mover: MoverClass) -> PathRecord {
            PathRecord::reachable(node.get() as f32 + mover.index() as f32 * 0.5)
        }
    }

    #[test]
    fn fills_every_cell_for_every_mover() {
        let mut grid = SpatialGrid::new(&GridConfig::new(2, 1)).expect("valid grid");
        let mut precomputer = PathPrecomputer::new(&grid);
        let mut events = Vec::new();
        let mut scheduler = TimeSlicedScheduler::new(ManualClock::new(), SchedulerConfig::default());
        let mut ctx = PrecomputeContext {
            grid: &mut grid,
            sampler: &Flat,
            oracle: &Distance,
            events: &mut events,
        };

        assert_eq!(precomputer.progress(), 0.0);
        let slices = scheduler.run_to_completion(&mut precomputer, &mut ctx);
        assert_eq!(slices, 1);
        assert!(precomputer.is_finished());
        assert_eq!(precomputer.progress(), 1.0);
        assert_eq!(scheduler.stats().units, 12);

        let record = query::position_data(&grid, CellCoord::new(2, 1))
            .and_then(|data| data.path(MoverClass::Crawler));
        assert_eq!(record, Some(PathRecord::reachable(2.5)));
        assert_eq!(
            events,
            vec![Event::PathsPrecomputed {
                cells: 6,
                off_navigable: 0
            }]
        );
    }

    #[test]
    fn finished_job_does_not_emit_twice() {
        let mut grid = SpatialGrid::new(&GridConfig::new(0, 0)).expect("valid grid");
        let mut precomputer = PathPrecomputer::new(&grid);
        let mut events = Vec::new();
        let mut scheduler = TimeSlicedScheduler::new(ManualClock::new(), SchedulerConfig::default());
        let mut ctx = PrecomputeContext {
            grid: &mut grid,
            sampler: &Flat,
            oracle: &Distance,
            events: &mut events,
        };

        assert_eq!(scheduler.run_slice(&mut precomputer, &mut ctx), Step::Done);
        assert_eq!(scheduler.run_slice(&mut precomputer, &mut ctx), Step::Done);
        assert_eq!(events.len(), 1);
    }
}
