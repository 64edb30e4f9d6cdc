//! Cooling force simulation relaxing tiles toward their seeds without overlap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{ForcesConfig, SimulationConfig},
    forces::{default_forces, Force, ForceContext},
    grid::GridFrame,
    observer::{Observer, TickEvent},
    rng::RngStreams,
    scheduler::TickSource,
    tile::{Impulse, Tile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    Init,
    Running,
    Converged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunOutcome {
    /// Steps taken by this run.
    pub steps: u64,
    pub converged: bool,
    pub alpha: f64,
}

pub struct SimulationBuilder {
    config: SimulationConfig,
    frame: GridFrame,
    forces: Vec<Box<dyn Force>>,
}

impl SimulationBuilder {
    pub fn new(config: SimulationConfig, frame: GridFrame) -> Self {
        Self {
            config,
            frame,
            forces: Vec::new(),
        }
    }

    pub fn with_force(mut self, force: impl Force + 'static) -> Self {
        self.forces.push(Box::new(force));
        self
    }

    pub fn with_default_forces(mut self, tiles: &[Tile], forces: &ForcesConfig) -> Self {
        self.forces.extend(default_forces(tiles, &self.frame, forces));
        self
    }

    pub fn build(self) -> Simulation {
        let config = self.config;
        Simulation {
            alpha: 1.0,
            alpha_min: config.alpha_min,
            alpha_decay: Simulation::alpha_decay_for(config.alpha_min, config.iterations),
            alpha_target: config.alpha_target,
            velocity_decay: config.velocity_decay,
            state: SimulationState::Init,
            ticks_elapsed: 0,
            rng: RngStreams::new(config.seed),
            buffers: Vec::with_capacity(self.forces.len()),
            forces: self.forces,
            frame: self.frame,
        }
    }
}

pub struct Simulation {
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    state: SimulationState,
    ticks_elapsed: u64,
    rng: RngStreams,
    forces: Vec<Box<dyn Force>>,
    buffers: Vec<Vec<Impulse>>,
    frame: GridFrame,
}

impl Simulation {
    /// Decay that brings alpha from 1 to `alpha_min` in `iterations` ticks.
    pub fn alpha_decay_for(alpha_min: f64, iterations: u32) -> f64 {
        1.0 - alpha_min.powf(1.0 / f64::from(iterations.max(1)))
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_min(&self) -> f64 {
        self.alpha_min
    }

    pub fn alpha_decay(&self) -> f64 {
        self.alpha_decay
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn ticks_elapsed(&self) -> u64 {
        self.ticks_elapsed
    }

    pub fn frame(&self) -> &GridFrame {
        &self.frame
    }

    pub fn force_names(&self) -> Vec<&str> {
        self.forces.iter().map(|force| force.name()).collect()
    }

    /// Reheats to alpha 1 and enters Running, from any state.
    pub fn start(&mut self) {
        self.alpha = 1.0;
        self.state = SimulationState::Running;
        debug!(alpha_decay = self.alpha_decay, "simulation started");
    }

    /// Advances `iterations` ticks silently. State is left untouched.
    pub fn tick(&mut self, tiles: &mut [Tile], iterations: u32) {
        for _ in 0..iterations {
            self.advance(tiles);
        }
    }

    /// One observed tick. Returns false without doing anything unless Running.
    pub fn step<O: Observer + ?Sized>(&mut self, tiles: &mut [Tile], observer: &mut O) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }
        self.advance(tiles);
        observer.on_tick(&TickEvent {
            simulation: &*self,
            tiles: &*tiles,
        });

        if self.alpha < self.alpha_min {
            self.state = SimulationState::Converged;
            debug!(
                ticks = self.ticks_elapsed,
                alpha = self.alpha,
                "simulation converged"
            );
            observer.on_end(&TickEvent {
                simulation: &*self,
                tiles: &*tiles,
            });
        }
        true
    }

    /// Starts, then steps once per frame until converged or the source runs dry.
    pub fn run<S, O>(&mut self, tiles: &mut [Tile], source: &mut S, observer: &mut O) -> RunOutcome
    where
        S: TickSource + ?Sized,
        O: Observer + ?Sized,
    {
        self.start();
        let mut steps = 0;
        while self.state == SimulationState::Running {
            if source.next_frame().is_none() {
                debug!(steps, alpha = self.alpha, "tick source exhausted");
                break;
            }
            self.step(tiles, &mut *observer);
            steps += 1;
        }
        RunOutcome {
            steps,
            converged: self.state == SimulationState::Converged,
            alpha: self.alpha,
        }
    }

    fn advance(&mut self, tiles: &mut [Tile]) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.ticks_elapsed += 1;

        let ctx = ForceContext {
            alpha: self.alpha,
            frame: &self.frame,
        };
        self.buffers.resize_with(self.forces.len(), Vec::new);
        for (force, buffer) in self.forces.iter_mut().zip(self.buffers.iter_mut()) {
            buffer.clear();
            buffer.resize(tiles.len(), Impulse::default());
            let mut rng = self.rng.stream(force.name());
            force.apply(&ctx, tiles, buffer, &mut rng);
        }

        let decay = self.velocity_decay;
        for (index, tile) in tiles.iter_mut().enumerate() {
            for buffer in &self.buffers {
                let impulse = buffer[index];
                tile.vx += impulse.x;
                tile.vy += impulse.y;
            }
            tile.vx *= decay;
            tile.vy *= decay;
            tile.x += tile.vx;
            tile.y += tile.vy;
            tile.refresh_cell(&self.frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GridMapConfig,
        geometry::Point,
        rng::ForceRng,
        scheduler::FixedStep,
        tile::RegionId,
    };

    fn frame() -> GridFrame {
        GridFrame {
            origin: Point::new(0.0, 0.0),
            cell_size: 1.0,
            nx: 20,
            ny: 20,
        }
    }

    fn tiles() -> Vec<Tile> {
        let frame = frame();
        [(10.0, 10.0), (10.2, 10.1), (10.1, 9.8), (3.0, 4.0)]
            .iter()
            .enumerate()
            .map(|(index, &(x, y))| Tile::new(index, RegionId(index % 2), Point::new(x, y), &frame))
            .collect()
    }

    fn simulation(tiles: &[Tile]) -> Simulation {
        let config = GridMapConfig::default();
        SimulationBuilder::new(config.simulation.clone(), frame())
            .with_default_forces(tiles, &config.forces)
            .build()
    }

    struct Push;

    impl Force for Push {
        fn name(&self) -> &str {
            "push"
        }

        fn apply(
            &mut self,
            _ctx: &ForceContext<'_>,
            _tiles: &[Tile],
            impulses: &mut [Impulse],
            _rng: &mut ForceRng<'_>,
        ) {
            for impulse in impulses {
                impulse.add(1.0, 0.0);
            }
        }
    }

    struct SeesRest;

    impl Force for SeesRest {
        fn name(&self) -> &str {
            "sees_rest"
        }

        fn apply(
            &mut self,
            _ctx: &ForceContext<'_>,
            tiles: &[Tile],
            _impulses: &mut [Impulse],
            _rng: &mut ForceRng<'_>,
        ) {
            assert!(tiles.iter().all(|tile| tile.vx == 0.0));
        }
    }

    #[test]
    fn alpha_decay_matches_schedule() {
        let decay = Simulation::alpha_decay_for(0.001, 300);
        assert!((decay - (1.0 - 0.001_f64.powf(1.0 / 300.0))).abs() < 1e-15);
        let after: f64 = (0..300).fold(1.0, |alpha, _| alpha - alpha * decay);
        assert!((after - 0.001).abs() < 1e-9);
    }

    #[test]
    fn tick_zero_is_a_no_op() {
        let mut tiles = tiles();
        let before = tiles.clone();
        let mut sim = simulation(&tiles);
        sim.tick(&mut tiles, 0);
        assert_eq!(tiles, before);
        assert_eq!(sim.alpha(), 1.0);
        assert_eq!(sim.ticks_elapsed(), 0);
        assert_eq!(sim.state(), SimulationState::Init);
    }

    #[test]
    fn manual_ticks_cool_without_changing_state() {
        let mut tiles = tiles();
        let mut sim = simulation(&tiles);
        sim.tick(&mut tiles, 10);
        assert_eq!(sim.state(), SimulationState::Init);
        assert_eq!(sim.ticks_elapsed(), 10);
        assert!(sim.alpha() < 1.0);
    }

    #[test]
    fn step_requires_running() {
        let mut tiles = tiles();
        let mut sim = simulation(&tiles);
        assert!(!sim.step(&mut tiles, &mut ()));
        sim.start();
        assert!(sim.step(&mut tiles, &mut ()));
        assert_eq!(sim.ticks_elapsed(), 1);
    }

    #[test]
    fn forces_see_pre_tick_state() {
        let frame = frame();
        let mut tiles = vec![Tile::new(0, RegionId(0), Point::new(5.0, 5.0), &frame)];
        let mut sim = SimulationBuilder::new(GridMapConfig::default().simulation, frame)
            .with_force(Push)
            .with_force(SeesRest)
            .build();
        assert_eq!(sim.force_names(), ["push", "sees_rest"]);
        sim.tick(&mut tiles, 1);
        assert!((tiles[0].vx - 0.6).abs() < 1e-12);
        assert!((tiles[0].x - 5.6).abs() < 1e-12);
        assert_eq!(tiles[0].cell(), frame.locate(5.6, 5.0));
    }

    #[test]
    fn run_converges_within_iterations() {
        let mut tiles = tiles();
        let mut sim = simulation(&tiles);
        let mut source = FixedStep::default().with_limit(301);
        let outcome = sim.run(&mut tiles, &mut source, &mut ());
        assert!(outcome.converged);
        assert!(outcome.steps <= 301);
        assert!(outcome.alpha < sim.alpha_min());
        assert_eq!(sim.state(), SimulationState::Converged);

        assert!(!sim.step(&mut tiles, &mut ()));
    }

    #[test]
    fn bounded_source_stops_a_hot_simulation() {
        let mut tiles = tiles();
        let config = GridMapConfig::default();
        let mut sim_config = config.simulation.clone();
        sim_config.alpha_target = 0.3;
        let mut sim = SimulationBuilder::new(sim_config, frame())
            .with_default_forces(&tiles, &config.forces)
            .build();
        let outcome = sim.run(&mut tiles, &mut FixedStep::default().with_limit(50), &mut ());
        assert_eq!(outcome.steps, 50);
        assert!(!outcome.converged);
        assert_eq!(sim.state(), SimulationState::Running);
        assert!(sim.alpha() > 0.3);
    }
}
