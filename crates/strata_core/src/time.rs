//! Step clock
//!
//! Tracks tick count and elapsed simulation time. Deltas are either measured
//! from the wall clock (`World::step`) or supplied by the caller
//! (`World::step_with`), which keeps tests deterministic.

use crate::ecs::Stage;
use std::time::{Duration, Instant};

/// Nominal tick rate; `delta_time` is expressed in units of one tick.
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Scale a wall-clock delta to fractional ticks (1.0 at exactly 60 Hz).
pub fn delta_time(delta: Duration) -> f64 {
    delta.as_secs_f64() * TICK_RATE_HZ as f64
}

/// Per-stage view of the clock handed to every system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepContext {
    pub stage: Stage,
    /// Zero on the first step.
    pub tick: u64,
    pub delta: Duration,
    pub delta_time: f64,
    pub elapsed: Duration,
}

impl StepContext {
    pub fn is_first_step(&self) -> bool {
        self.tick == 0
    }
}

pub struct StepClock {
    tick_count: u64,
    elapsed: Duration,
    last_step: Option<Instant>,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            elapsed: Duration::ZERO,
            last_step: None,
        }
    }

    /// Number of steps started so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Delta since the previous wall-clock step; one nominal tick the first time.
    pub fn wall_delta(&mut self) -> Duration {
        let now = Instant::now();
        let delta = self
            .last_step
            .map_or(TICK_DURATION, |last| now.duration_since(last));
        self.last_step = Some(now);
        delta
    }

    /// Start a new step: returns its tick index and the total elapsed time.
    pub fn advance(&mut self, delta: Duration) -> (u64, Duration) {
        let tick = self.tick_count;
        self.tick_count += 1;
        self.elapsed += delta;
        (tick, self.elapsed)
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new()
    }
}
