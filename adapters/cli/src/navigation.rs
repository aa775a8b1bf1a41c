//! Breadth-first movement graph answering path queries towards the colony.

use std::collections::VecDeque;

use colony_defence_core::{CellCoord, GraphNode, MoverClass, PathOracle, PathRecord};

use crate::terrain::SyntheticTerrain;

/// Step distances from every cell to the colony, one field per mover class.
///
/// Scuttlers cannot cross pits or water; crawlers climb through pits but still
/// avoid water. Unreachable cells keep `u32::MAX`.
#[derive(Clone, Debug, Default)]
pub(crate) struct NavigationField {
    width: u32,
    distances: [Vec<u32>; MoverClass::COUNT],
}

impl NavigationField {
    /// Runs one reverse breadth-first search per mover class from `target`.
    pub(crate) fn build(terrain: &SyntheticTerrain, target: CellCoord) -> Self {
        let width = terrain.width();
        let distances = MoverClass::ALL.map(|mover| {
            flood(terrain, target, |cell| match mover {
                MoverClass::Scuttler => terrain.is_water(cell) || terrain.is_pit(cell),
                MoverClass::Crawler => terrain.is_water(cell),
            })
        });
        Self { width, distances }
    }

    /// Steps from `cell` to the colony for `mover`, if reachable.
    pub(crate) fn distance(&self, cell: CellCoord, mover: MoverClass) -> Option<u32> {
        let x = usize::try_from(cell.x()).ok()?;
        let z = usize::try_from(cell.z()).ok()?;
        if x >= self.width as usize {
            return None;
        }
        let distance = *self.distances[mover.index()].get(z * self.width as usize + x)?;
        (distance != u32::MAX).then_some(distance)
    }

    fn cell_of(&self, node: GraphNode) -> Option<CellCoord> {
        let index = u32::try_from(node.get()).ok()?;
        if self.width == 0 {
            return None;
        }
        let x = i32::try_from(index % self.width).ok()?;
        let z = i32::try_from(index / self.width).ok()?;
        Some(CellCoord::new(x, z))
    }
}

impl PathOracle for NavigationField {
    fn compute_path(&self, node: GraphNode, mover: MoverClass) -> PathRecord {
        self.cell_of(node)
            .and_then(|cell| self.distance(cell, mover))
            .map_or_else(PathRecord::unreachable, |steps| {
                PathRecord::reachable(steps as f32)
            })
    }
}

fn flood(
    terrain: &SyntheticTerrain,
    target: CellCoord,
    mut is_blocked: impl FnMut(CellCoord) -> bool,
) -> Vec<u32> {
    let cell_count = terrain.width() as usize * terrain.depth() as usize;
    let mut distances = vec![u32::MAX; cell_count];
    let mut queue = VecDeque::new();

    if let Some(index) = terrain.index(target) {
        if !is_blocked(target) {
            distances[index] = 0;
            queue.push_back(target);
        }
    }

    while let Some(cell) = queue.pop_front() {
        let Some(current) = terrain.index(cell) else {
            continue;
        };
        let next_distance = distances[current].saturating_add(1);

        for (dx, dz) in [(0, -1), (-1, 0), (1, 0), (0, 1)] {
            let neighbor = CellCoord::new(cell.x() + dx, cell.z() + dz);
            let Some(neighbor_index) = terrain.index(neighbor) else {
                continue;
            };
            if distances[neighbor_index] <= next_distance || is_blocked(neighbor) {
                continue;
            }
            distances[neighbor_index] = next_distance;
            queue.push_back(neighbor);
        }
    }

    distances
}
