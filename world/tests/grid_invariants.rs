use colony_defence_core::{
    CellCoord, CellRect, Command, Footprint, GraphNode, GroundSampler, PlayMode, Sector,
};
use colony_defence_world::{apply, query, EligibilityList, GridConfig, SpatialGrid};
use glam::Vec3;
use proptest::prelude::*;

struct PittedTerrain {
    pits: Vec<CellCoord>,
}

impl GroundSampler for PittedTerrain {
    fn sample_ground_height(&self, x: f32, z: f32) -> Option<f32> {
        let cell = CellCoord::new(x.round() as i32, z.round() as i32);
        if self.pits.contains(&cell) {
            Some(-5.0)
        } else {
            Some(0.5)
        }
    }

    fn resolve_onto_movement_graph(&self, _position: Vec3) -> Option<GraphNode> {
        Some(GraphNode::new(1))
    }
}

#[derive(Clone, Debug)]
enum Operation {
    Build(CellCoord),
    Demolish(CellCoord),
    Mineral(CellCoord),
    Mine(CellCoord),
    OffNavigable(CellCoord),
    CheckSpawnable(CellCoord),
    ResetWave,
    Crowd(CellCoord, u32),
}

fn arb_cell() -> impl Strategy<Value = CellCoord> {
    (-1i32..13, -1i32..13).prop_map(|(x, z)| CellCoord::new(x, z))
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        arb_cell().prop_map(Operation::Build),
        arb_cell().prop_map(Operation::Demolish),
        arb_cell().prop_map(Operation::Mineral),
        arb_cell().prop_map(Operation::Mine),
        arb_cell().prop_map(Operation::OffNavigable),
        arb_cell().prop_map(Operation::CheckSpawnable),
        Just(Operation::ResetWave),
        (arb_cell(), 0u32..3).prop_map(|(cell, radius)| Operation::Crowd(cell, radius)),
    ]
}

fn listed_anywhere(grid: &SpatialGrid, cell: CellCoord) -> Option<EligibilityList> {
    EligibilityList::ALL
        .into_iter()
        .find(|list| query::is_listed(grid, *list, cell))
}

fn assert_lists_consistent(grid: &SpatialGrid) {
    for data in query::positions(grid) {
        if data.is_banned() || data.has_building() {
            assert_eq!(
                listed_anywhere(grid, data.cell()),
                None,
                "{:?} is banned or built on but still listed",
                data.cell()
            );
        }
    }
    for cell in query::eligible_cells(grid, EligibilityList::Majority)
        .iter()
        .chain(query::eligible_cells(grid, EligibilityList::Minority))
    {
        assert!(
            query::is_listed(grid, EligibilityList::CurrentWave, *cell),
            "sector lists must stay within the current wave"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bans_are_monotonic_and_never_listed(
        operations in prop::collection::vec(arb_operation(), 1..60),
        pits in prop::collection::vec(arb_cell(), 0..4),
    ) {
        let config = GridConfig::new(11, 11)
            .with_exclusion_zone(CellRect::from_corners(CellCoord::new(5, 5), CellCoord::new(6, 6)));
        let mut grid = SpatialGrid::new(&config).expect("valid grid");
        let terrain = PittedTerrain { pits };
        let mut banned_so_far: Vec<CellCoord> = Vec::new();
        let mut events = Vec::new();

        for operation in operations {
            match operation {
                Operation::Build(origin) => apply(
                    &mut grid,
                    Command::RegisterBuilding { origin, footprint: Footprint::square(2) },
                    &mut events,
                ),
                Operation::Demolish(origin) => apply(
                    &mut grid,
                    Command::DeregisterBuilding { origin, footprint: Footprint::square(2) },
                    &mut events,
                ),
                Operation::Mineral(cell) => apply(&mut grid, Command::RegisterMineral { cell }, &mut events),
                Operation::Mine(cell) => apply(&mut grid, Command::DeregisterMineral { cell }, &mut events),
                Operation::OffNavigable(cell) => {
                    apply(&mut grid, Command::RegisterOffNavigable { cell }, &mut events)
                }
                Operation::CheckSpawnable(cell) => {
                    let _ = grid.is_spawnable(cell, PlayMode::Normal, &terrain, &mut events);
                }
                Operation::ResetWave => {
                    grid.reset_current_wave_eligibility(PlayMode::Normal);
                    grid.partition_current_wave(&Sector::new(90.0, 120.0));
                }
                Operation::Crowd(cell, radius) => {
                    let _ = grid.remove_neighbourhood_from_current_wave(cell, radius);
                }
            }

            for cell in &banned_so_far {
                let data = query::position_data(&grid, *cell).expect("banned cells are in bounds");
                prop_assert!(data.is_banned(), "ban on {:?} was undone", cell);
            }
            banned_so_far = query::positions(&grid)
                .filter(|data| data.is_banned())
                .map(|data| data.cell())
                .collect();
            prop_assert_eq!(banned_so_far.len(), query::banned_count(&grid));
            assert_lists_consistent(&grid);
        }
    }
}

#[test]
fn partition_splits_current_wave_by_sector() {
    let mut grid = SpatialGrid::new(&GridConfig::new(8, 8)).expect("valid grid");
    grid.reset_current_wave_eligibility(PlayMode::Normal);
    grid.partition_current_wave(&Sector::new(0.0, 120.0));

    let current = query::eligible_cells(&grid, EligibilityList::CurrentWave).len();
    let majority = query::eligible_cells(&grid, EligibilityList::Majority).len();
    let minority = query::eligible_cells(&grid, EligibilityList::Minority).len();
    assert_eq!(current, 81);
    assert_eq!(majority + minority, current, "partition must cover the wave");
    assert!(query::is_listed(&grid, EligibilityList::Majority, CellCoord::new(8, 4)));
    assert!(query::is_listed(&grid, EligibilityList::Minority, CellCoord::new(0, 4)));

    grid.clear_sector_lists();
    assert!(query::eligible_cells(&grid, EligibilityList::Majority).is_empty());
    assert_eq!(query::eligible_cells(&grid, EligibilityList::CurrentWave).len(), current);
}

#[test]
fn crowding_margin_is_clamped_at_edges() {
    let mut grid = SpatialGrid::new(&GridConfig::new(8, 8)).expect("valid grid");
    grid.reset_current_wave_eligibility(PlayMode::Normal);
    assert_eq!(grid.remove_neighbourhood_from_current_wave(CellCoord::new(0, 8), 2), 9);
    assert_eq!(grid.remove_neighbourhood_from_current_wave(CellCoord::new(1, 7), 1), 0);
    assert!(grid.discard_from_current_wave(CellCoord::new(4, 4)));
    assert!(!grid.discard_from_current_wave(CellCoord::new(4, 4)));
    assert!(
        query::is_listed(&grid, EligibilityList::Gameplay, CellCoord::new(4, 4)),
        "discarding only affects the running wave"
    );
}

#[test]
fn game_over_empties_the_wave() {
    let mut grid = SpatialGrid::new(&GridConfig::new(3, 3)).expect("valid grid");
    grid.reset_current_wave_eligibility(PlayMode::GameOver);
    assert!(query::eligible_cells(&grid, EligibilityList::CurrentWave).is_empty());
}

#[test]
fn default_grid_spans_the_playfield() {
    let grid = SpatialGrid::new(&GridConfig::default()).expect("valid grid");
    assert_eq!(query::bounds(&grid), (63, 63));
    assert_eq!(query::positions(&grid).count(), 64 * 64);
}

fn memberships(grid: &SpatialGrid) -> Vec<(CellCoord, [bool; 5])> {
    query::positions(grid)
        .map(|data| {
            let cell = data.cell();
            (cell, EligibilityList::ALL.map(|list| query::is_listed(grid, list, cell)))
        })
        .collect()
}

#[test]
fn building_cycle_during_wave_restores_all_lists() {
    let mut grid = SpatialGrid::new(&GridConfig::default()).expect("valid grid");
    grid.reset_current_wave_eligibility(PlayMode::Normal);
    grid.partition_current_wave(&Sector::new(0.0, 120.0));
    let before = memberships(&grid);

    let origin = CellCoord::new(8, 5);
    let mut events = Vec::new();
    apply(
        &mut grid,
        Command::RegisterBuilding { origin, footprint: Footprint::square(1) },
        &mut events,
    );
    assert_eq!(listed_anywhere(&grid, origin), None);
    apply(
        &mut grid,
        Command::DeregisterBuilding { origin, footprint: Footprint::square(1) },
        &mut events,
    );

    assert_eq!(memberships(&grid), before);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn building_cycle_is_invisible_to_every_list(
        x in 0i32..64,
        z in 0i32..64,
        size in 1u32..4,
        facing in 0.0f32..360.0,
    ) {
        let mut grid = SpatialGrid::new(&GridConfig::default()).expect("valid grid");
        grid.reset_current_wave_eligibility(PlayMode::Normal);
        grid.partition_current_wave(&Sector::new(facing, 120.0));
        let origin = CellCoord::new(x, z);
        let footprint = Footprint::square(size);
        prop_assume!(grid.is_available_for_building(origin, &footprint));
        let before = memberships(&grid);

        let mut events = Vec::new();
        apply(
            &mut grid,
            Command::RegisterBuilding { origin, footprint: footprint.clone() },
            &mut events,
        );
        apply(&mut grid, Command::DeregisterBuilding { origin, footprint }, &mut events);

        prop_assert_eq!(memberships(&grid), before);
    }
}
