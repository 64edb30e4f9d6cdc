//! Notifications emitted by the relaxation loop and the snap animation.

use std::time::Duration;

use serde::Serialize;

use crate::{
    simulation::{Simulation, SimulationState},
    tile::{Tile, TileFrame},
};

/// State after a completed tick. Observers only ever see tiles between ticks.
pub struct TickEvent<'a> {
    pub simulation: &'a Simulation,
    pub tiles: &'a [Tile],
}

pub struct SnapEvent<'a> {
    /// Linear time fraction in `[0, 1]`.
    pub progress: f64,
    /// Eased interpolation fraction applied to the positions.
    pub eased: f64,
    pub elapsed: Duration,
    pub tiles: &'a [Tile],
}

pub trait Observer {
    fn on_tick(&mut self, _event: &TickEvent<'_>) {}
    fn on_end(&mut self, _event: &TickEvent<'_>) {}
    fn on_snap_frame(&mut self, _event: &SnapEvent<'_>) {}
}

impl Observer for () {}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_tick(&mut self, event: &TickEvent<'_>) {
        (**self).on_tick(event);
    }

    fn on_end(&mut self, event: &TickEvent<'_>) {
        (**self).on_end(event);
    }

    fn on_snap_frame(&mut self, event: &SnapEvent<'_>) {
        (**self).on_snap_frame(event);
    }
}

/// Forwards every notification to each registered observer in order.
#[derive(Default)]
pub struct Observers<'a> {
    inner: Vec<&'a mut dyn Observer>,
}

impl<'a> Observers<'a> {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    pub fn with(mut self, observer: &'a mut dyn Observer) -> Self {
        self.inner.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Observer for Observers<'_> {
    fn on_tick(&mut self, event: &TickEvent<'_>) {
        for observer in &mut self.inner {
            observer.on_tick(event);
        }
    }

    fn on_end(&mut self, event: &TickEvent<'_>) {
        for observer in &mut self.inner {
            observer.on_end(event);
        }
    }

    fn on_snap_frame(&mut self, event: &SnapEvent<'_>) {
        for observer in &mut self.inner {
            observer.on_snap_frame(event);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum FrameStatus {
    Relaxing { tick: u64, alpha: f64 },
    Converged { tick: u64, alpha: f64 },
    Snapping { progress: f64 },
}

/// Serializable view of one notification, used by the snapshot writer and the
/// live server.
#[derive(Debug, Clone, Serialize)]
pub struct LiveFrame {
    #[serde(flatten)]
    pub status: FrameStatus,
    pub tiles: Vec<TileFrame>,
}

impl LiveFrame {
    pub fn from_tick(event: &TickEvent<'_>) -> Self {
        let simulation = event.simulation;
        let status = match simulation.state() {
            SimulationState::Converged => FrameStatus::Converged {
                tick: simulation.ticks_elapsed(),
                alpha: simulation.alpha(),
            },
            _ => FrameStatus::Relaxing {
                tick: simulation.ticks_elapsed(),
                alpha: simulation.alpha(),
            },
        };
        Self {
            status,
            tiles: event.tiles.iter().map(TileFrame::from).collect(),
        }
    }

    pub fn from_snap(event: &SnapEvent<'_>) -> Self {
        Self {
            status: FrameStatus::Snapping {
                progress: event.progress,
            },
            tiles: event.tiles.iter().map(TileFrame::from).collect(),
        }
    }
}
