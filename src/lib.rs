pub mod config;
pub mod error;
pub mod forces;
pub mod geometry;
pub mod grid;
pub mod layer;
pub mod map;
pub mod observer;
pub mod rng;
pub mod scheduler;
pub mod seed;
pub mod simulation;
pub mod snap;
pub mod snapshot;
pub mod spatial;
pub mod tile;
pub mod web;

pub use config::{ConfigLoader, GridMapConfig};
pub use error::{GridMapError, Result};
pub use geometry::{Feature, FeatureCollection, Geometry, Point};
pub use grid::{CellIndex, Grid, GridFrame};
pub use layer::LayerLoader;
pub use map::{GridMap, MapFrame, Region};
pub use observer::{LiveFrame, Observer, SnapEvent, TickEvent};
pub use scheduler::{FixedStep, RealTime, TickSource};
pub use simulation::{RunOutcome, Simulation, SimulationBuilder, SimulationState};
pub use snap::SnapAnimator;
pub use tile::{RegionId, Tile};
