use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::observer::{LiveFrame, Observer, TickEvent};

/// Writes a JSON frame every `interval` ticks to `<dir>/<name>/tick_NNNNNN.json`,
/// plus the converged frame. An interval of zero disables it.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
    written: Vec<PathBuf>,
    error: Option<anyhow::Error>,
}

impl SnapshotWriter {
    pub fn new(base_dir: impl AsRef<Path>, name: &str, interval: u64) -> Self {
        Self {
            dir: base_dir.as_ref().join(name),
            interval,
            written: Vec::new(),
            error: None,
        }
    }

    pub fn due(&self, tick: u64) -> bool {
        self.interval != 0 && tick % self.interval == 0
    }

    pub fn maybe_write(&mut self, tick: u64, frame: &LiveFrame) -> Result<Option<PathBuf>> {
        if !self.due(tick) {
            return Ok(None);
        }
        self.write(tick, frame).map(Some)
    }

    fn write(&mut self, tick: u64, frame: &LiveFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create snapshot dir {}", self.dir.display()))?;
        let path = self.dir.join(format!("tick_{tick:06}.json"));
        let json = serde_json::to_string_pretty(frame)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        debug!(path = %path.display(), "snapshot written");
        self.written.push(path.clone());
        Ok(path)
    }

    fn record(&mut self, result: Result<Option<PathBuf>>) {
        if let Err(err) = result {
            warn!(error = %err, "snapshot failed");
            self.error.get_or_insert(err);
        }
    }

    /// Files written so far, or the first write error.
    pub fn finish(self) -> Result<Vec<PathBuf>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.written),
        }
    }
}

impl Observer for SnapshotWriter {
    fn on_tick(&mut self, event: &TickEvent<'_>) {
        let tick = event.simulation.ticks_elapsed();
        if self.due(tick) {
            let result = self.maybe_write(tick, &LiveFrame::from_tick(event));
            self.record(result);
        }
    }

    fn on_end(&mut self, event: &TickEvent<'_>) {
        let tick = event.simulation.ticks_elapsed();
        if self.interval == 0 || self.due(tick) {
            return;
        }
        let result = self.write(tick, &LiveFrame::from_tick(event)).map(Some);
        self.record(result);
    }
}
