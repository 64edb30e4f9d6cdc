use gridmap::{
    config::GridMapConfig,
    geometry::Point,
    layer::LayerLoader,
    map::GridMap,
    observer::{Observer, TickEvent},
    scheduler::FixedStep,
    simulation::SimulationState,
};

fn build_map(seed: u64) -> GridMap {
    let layer = LayerLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("fixtures/two_squares.geojson")
        .expect("fixture should load");
    let config = GridMapConfig::default()
        .with_seed_radius(4.0)
        .with_seed(seed);
    GridMap::build(&layer, config).expect("map should build")
}

#[derive(Default)]
struct Recorder {
    alphas: Vec<f64>,
    positions: Vec<Vec<Point>>,
    ends: usize,
    end_tick: Option<u64>,
}

impl Observer for Recorder {
    fn on_tick(&mut self, event: &TickEvent<'_>) {
        self.alphas.push(event.simulation.alpha());
        self.positions
            .push(event.tiles.iter().map(|tile| tile.position()).collect());
    }

    fn on_end(&mut self, event: &TickEvent<'_>) {
        self.ends += 1;
        self.end_tick = Some(event.simulation.ticks_elapsed());
        assert_eq!(event.simulation.state(), SimulationState::Converged);
    }
}

#[test]
fn alpha_cools_monotonically_to_convergence() {
    let mut map = build_map(1);
    let mut recorder = Recorder::default();
    let outcome = map.run(&mut FixedStep::default(), &mut recorder);

    assert!(outcome.converged);
    assert!(outcome.steps <= 301, "took {} steps", outcome.steps);
    assert!(recorder
        .alphas
        .windows(2)
        .all(|pair| pair[1] <= pair[0]));
    let simulation = map.simulation().expect("simulation exists after run");
    assert!(simulation.alpha() < simulation.alpha_min());
    assert_eq!(recorder.alphas.len() as u64, outcome.steps);
}

#[test]
fn end_is_notified_exactly_once() {
    let mut map = build_map(1);
    let mut recorder = Recorder::default();
    let outcome = map.run(&mut FixedStep::default(), &mut recorder);
    assert_eq!(recorder.ends, 1);
    assert_eq!(recorder.end_tick, Some(outcome.steps));

    let mut source = FixedStep::default().with_limit(5);
    let again = map.run(&mut source, &mut recorder);
    assert_eq!(again.steps, 5);
    assert!(!again.converged);
    assert_eq!(recorder.ends, 1);
}

#[test]
fn same_seed_replays_identical_positions() {
    let mut first = Recorder::default();
    let mut second = Recorder::default();
    build_map(7).run(&mut FixedStep::default().with_limit(120), &mut first);
    build_map(7).run(&mut FixedStep::default().with_limit(120), &mut second);

    assert_eq!(first.positions.len(), 120);
    assert_eq!(first.positions, second.positions);
}

#[test]
fn manual_ticks_stay_silent_and_leave_state_alone() {
    let mut map = build_map(1);
    let before: Vec<Point> = map.tiles().iter().map(|tile| tile.position()).collect();

    map.tick(0);
    let after_zero: Vec<Point> = map.tiles().iter().map(|tile| tile.position()).collect();
    assert_eq!(before, after_zero);

    map.tick(400);
    assert_eq!(map.state(), SimulationState::Init);
    let simulation = map.simulation().expect("created lazily");
    assert_eq!(simulation.ticks_elapsed(), 400);
    assert!(simulation.alpha() < simulation.alpha_min());
}

#[test]
fn running_simulation_restarts_hot_on_run() {
    let mut map = build_map(1);
    let mut recorder = Recorder::default();
    let first = map.run(&mut FixedStep::default().with_limit(20), &mut recorder);
    assert_eq!(first.steps, 20);
    assert_eq!(map.state(), SimulationState::Running);
    let cooled = recorder.alphas[19];

    let second = map.run(&mut FixedStep::default().with_limit(1), &mut recorder);
    assert_eq!(second.steps, 1);
    let simulation = map.simulation().expect("simulation exists after run");
    assert_eq!(recorder.alphas[20], 1.0 - simulation.alpha_decay());
    assert!(recorder.alphas[20] > cooled);
    assert_eq!(simulation.ticks_elapsed(), 21);
}
