//! Ground sampling around candidate spawn cells.

use colony_defence_core::{BanReason, CellCoord, CellOffset, Event, GroundSampler, PlayMode};

use crate::SpatialGrid;

const SAMPLE_RADIUS: i32 = 1;
const LOW_GROUND_BAN_RADIUS: u32 = 2;

impl SpatialGrid {
    /// Whether a hostile may appear on the cell under `mode`.
    ///
    /// The cell must be in bounds, free, unbanned and satisfy the mode's zone
    /// rule. The 3x3 neighbourhood is then sampled: a neighbour outside the grid
    /// or without ground fails the check, and a neighbour below the minimum
    /// spawn height bans the 5x5 block centred on that neighbour before
    /// failing. Learned bans are permanent and each newly banned cell is
    /// reported through `out_events`.
    pub fn is_spawnable(
        &mut self,
        cell: CellCoord,
        mode: PlayMode,
        sampler: &dyn GroundSampler,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(data) = self.position(cell) else {
            return false;
        };
        if !data.admits_hostiles(mode) {
            return false;
        }

        for dz in -SAMPLE_RADIUS..=SAMPLE_RADIUS {
            for dx in -SAMPLE_RADIUS..=SAMPLE_RADIUS {
                let neighbour = cell.offset(CellOffset::new(dx, dz));
                if !self.contains(neighbour) {
                    return false;
                }
                let Some(height) = sampler.sample_ground_height(neighbour.x() as f32, neighbour.z() as f32)
                else {
                    return false;
                };
                if height < self.min_spawn_height {
                    let banned = self.ban_low_ground(neighbour, out_events);
                    tracing::debug!(
                        x = neighbour.x(),
                        z = neighbour.z(),
                        height,
                        banned,
                        "low ground found next to spawn candidate"
                    );
                    return false;
                }
            }
        }
        true
    }

    fn ban_low_ground(&mut self, centre: CellCoord, out_events: &mut Vec<Event>) -> usize {
        let cells: Vec<CellCoord> = self.neighbourhood(centre, LOW_GROUND_BAN_RADIUS).collect();
        let before = out_events.len();
        for cell in cells {
            if self.ban(cell) {
                out_events.push(Event::CellBanned {
                    cell,
                    reason: BanReason::LowGround,
                });
            }
        }
        out_events.len() - before
    }
}
