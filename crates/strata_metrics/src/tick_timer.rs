//! Tick timing utilities

use super::ring_buffer::SampleWindow;
use std::time::{Duration, Instant};

/// Rolling record of how long each world step took.
pub struct TickTimer {
    tick_start: Instant,
    tick_times: SampleWindow,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            tick_start: Instant::now(),
            tick_times: SampleWindow::new(capacity),
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    pub fn end(&mut self) {
        let elapsed = self.tick_start.elapsed();
        self.tick_times.push(elapsed);
    }

    pub fn ticks_per_second(&self) -> f64 {
        let avg = self.tick_times.average();
        if avg.as_secs_f64() > 0.0 {
            1.0 / avg.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.tick_times.average().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.tick_times.range();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    pub fn samples(&self) -> usize {
        self.tick_times.len()
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_roll_over_capacity() {
        let mut timer = TickTimer::new(2);
        for _ in 0..3 {
            timer.begin();
            timer.end();
        }
        assert_eq!(timer.samples(), 2);
        let (min, max) = timer.tick_time_range_ms();
        assert!(min <= max);
    }
}
