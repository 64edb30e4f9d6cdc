use gridmap::{
    config::{ConfigLoader, GridMapConfig},
    grid::CellIndex,
    layer::LayerLoader,
    map::GridMap,
    observer::Observers,
    scheduler::FixedStep,
    simulation::SimulationState,
    snapshot::SnapshotWriter,
    FeatureCollection,
};
use tempfile::tempdir;

fn two_squares() -> FeatureCollection {
    LayerLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("fixtures/two_squares.geojson")
        .expect("fixture should load")
}

fn default_config() -> GridMapConfig {
    ConfigLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("configs/default.yaml")
        .expect("config should load")
}

fn min_pair_distance(map: &GridMap) -> f64 {
    let tiles = map.tiles();
    let mut min = f64::INFINITY;
    for (a, first) in tiles.iter().enumerate() {
        for second in &tiles[a + 1..] {
            min = min.min(first.position().distance(second.position()));
        }
    }
    min
}

#[test]
fn grid_is_sized_from_area_and_weight() {
    let map = GridMap::build(&two_squares(), default_config()).unwrap();
    let totals = map.totals();
    assert_eq!(totals.area, 200.0);
    assert_eq!(totals.weight, 8.0);

    let grid = map.grid();
    assert_eq!(grid.cell_size(), (200.0_f64 / 8.0).sqrt());
    assert_eq!(grid.cell_size(), 5.0);
    assert_eq!((grid.nx(), grid.ny()), (14, 6));

    let source = grid.source();
    let extent = grid.extent();
    assert!((source.min_x - extent.min_x - (extent.max_x - source.max_x)).abs() < 1e-9);
    assert!((source.min_y - extent.min_y - (extent.max_y - source.max_y)).abs() < 1e-9);
    let (padding_x, padding_y) = grid.padding();
    assert!(padding_x >= grid.cell_size() && padding_y >= grid.cell_size());
}

#[test]
fn each_region_gets_its_weight_in_tiles() {
    let map = GridMap::build(&two_squares(), default_config()).unwrap();
    assert_eq!(map.tiles().len(), 8);
    for region in map.regions() {
        assert_eq!(region.tile_count, 4);
        assert_eq!(region.dropped_seeds, 0);
        assert_eq!(
            map.tiles()
                .iter()
                .filter(|tile| tile.region == region.id)
                .count(),
            4
        );
    }
    assert_eq!(map.regions()[1].name.as_deref(), Some("east"));
}

#[test]
fn seeds_beyond_the_grid_leave_regions_short() {
    let map = GridMap::build(&two_squares(), GridMapConfig::default()).unwrap();
    assert_eq!(map.tiles().len(), 0);
    for region in map.regions() {
        assert_eq!(region.tile_count, 0);
        assert_eq!(region.dropped_seeds, 4);
    }
    assert_eq!(map.totals().dropped_seeds, 8);
}

#[test]
fn layout_converges_and_snaps_to_cell_centers() {
    let mut map = GridMap::build(&two_squares(), default_config()).unwrap();
    let outcome = map
        .layout(
            &mut FixedStep::default().with_limit(301),
            &mut FixedStep::default(),
            &mut (),
        )
        .unwrap();
    assert!(outcome.run.converged);
    assert_eq!(map.state(), SimulationState::Converged);

    let frame = map.grid().frame();
    for tile in map.tiles() {
        assert!(frame.contains(tile.cell()), "tile {} left the grid", tile.index);
        assert_eq!(tile.position(), frame.center(tile.cell()));
    }
}

#[test]
fn converged_tiles_keep_their_distance() {
    let mut map = GridMap::build(&two_squares(), default_config()).unwrap();
    let outcome = map.run(&mut FixedStep::default().with_limit(301), &mut ());
    assert!(outcome.converged);

    let cell_size = map.grid().cell_size();
    assert!(min_pair_distance(&map) >= cell_size - 1e-6);
    let cells: Vec<CellIndex> = map.tiles().iter().map(|tile| tile.cell()).collect();
    let frame = map.grid().frame();
    assert!(cells.iter().all(|cell| frame.contains(*cell)));
}

#[test]
fn snapshots_and_final_frame_are_written() {
    let dir = tempdir().expect("tempdir");
    let mut map = GridMap::build(&two_squares(), default_config()).unwrap();
    let mut writer = SnapshotWriter::new(dir.path(), "two_squares", 50);
    let outcome = map
        .layout(
            &mut FixedStep::default(),
            &mut FixedStep::default(),
            &mut Observers::new().with(&mut writer),
        )
        .unwrap();
    let written = writer.finish().unwrap();

    let expected_periodic = (outcome.run.steps / 50) as usize;
    assert!(written.len() >= expected_periodic);
    assert!(dir
        .path()
        .join("two_squares")
        .join("tick_000050.json")
        .exists());

    let frame = serde_json::to_value(map.frame("two_squares")).unwrap();
    assert_eq!(frame["state"], "converged");
    assert_eq!(frame["snapped"], true);
    assert_eq!(frame["tiles"].as_array().unwrap().len(), 8);
    assert_eq!(frame["grid"]["cell_size"], 5.0);
}
