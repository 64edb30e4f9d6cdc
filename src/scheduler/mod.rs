//! Tick sources driving the relaxation loop, one frame per simulation step.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Yields one frame per step. `None` ends the loop, which is also how callers
/// cancel a run that would otherwise never converge.
pub trait TickSource {
    /// Time elapsed since the source started, as of the frame being handed out.
    fn next_frame(&mut self) -> Option<Duration>;
}

impl<S: TickSource + ?Sized> TickSource for &mut S {
    fn next_frame(&mut self) -> Option<Duration> {
        (**self).next_frame()
    }
}

/// Synthetic clock advancing by a fixed step per frame, never sleeping.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: Duration,
    elapsed: Duration,
    frames: u64,
    limit: Option<u64>,
}

impl FixedStep {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            elapsed: Duration::ZERO,
            frames: 0,
            limit: None,
        }
    }

    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl TickSource for FixedStep {
    fn next_frame(&mut self) -> Option<Duration> {
        if self.limit.is_some_and(|limit| self.frames >= limit) {
            return None;
        }
        self.frames += 1;
        self.elapsed += self.step;
        Some(self.elapsed)
    }
}

/// Wall-clock pacing: sleeps until the next frame boundary.
#[derive(Debug, Clone)]
pub struct RealTime {
    interval: Duration,
    started: Option<Instant>,
    next_deadline: Option<Instant>,
    deadline: Option<Duration>,
    frames: u64,
    limit: Option<u64>,
    stop: Option<Arc<AtomicBool>>,
}

impl RealTime {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: None,
            next_deadline: None,
            deadline: None,
            frames: 0,
            limit: None,
            stop: None,
        }
    }

    /// Stop handing out frames once this much wall time has passed.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Ends the source at the next frame once `stop` is set, from any thread.
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }
}

impl TickSource for RealTime {
    fn next_frame(&mut self) -> Option<Duration> {
        if self.stopped() || self.limit.is_some_and(|limit| self.frames >= limit) {
            return None;
        }
        let now = Instant::now();
        let started = *self.started.get_or_insert(now);
        if let Some(next) = self.next_deadline {
            if next > now {
                thread::sleep(next - now);
            }
        }
        let now = Instant::now();
        let elapsed = now.duration_since(started);
        if self.stopped() || self.deadline.is_some_and(|deadline| elapsed >= deadline) {
            return None;
        }
        self.frames += 1;
        self.next_deadline = Some(now + self.interval);
        Some(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_advances_synthetic_clock() {
        let mut source = FixedStep::new(Duration::from_millis(10)).with_limit(3);
        assert_eq!(source.next_frame(), Some(Duration::from_millis(10)));
        assert_eq!(source.next_frame(), Some(Duration::from_millis(20)));
        assert_eq!(source.next_frame(), Some(Duration::from_millis(30)));
        assert_eq!(source.next_frame(), None);
        assert_eq!(source.frames(), 3);
    }

    #[test]
    fn unbounded_fixed_step_keeps_going() {
        let mut source = FixedStep::default();
        for _ in 0..1_000 {
            assert!(source.next_frame().is_some());
        }
    }

    #[test]
    fn real_time_paces_frames_and_honors_deadline() {
        let mut source =
            RealTime::new(Duration::from_millis(5)).with_deadline(Duration::from_millis(40));
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert!(second >= first + Duration::from_millis(5));

        let mut frames = 2;
        while source.next_frame().is_some() {
            frames += 1;
            assert!(frames < 100);
        }
    }

    #[test]
    fn real_time_limit_bounds_frames() {
        let mut source = RealTime::new(Duration::from_millis(1)).with_limit(3);
        let mut frames = 0;
        while source.next_frame().is_some() {
            frames += 1;
            assert!(frames <= 3);
        }
        assert_eq!(frames, 3);
        assert_eq!(source.frames(), 3);
    }

    #[test]
    fn real_time_ends_once_stop_is_set() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = RealTime::new(Duration::from_millis(1)).with_stop(stop.clone());
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_some());

        stop.store(true, Ordering::SeqCst);
        assert_eq!(source.next_frame(), None);
        assert_eq!(source.frames(), 2);
    }
}
