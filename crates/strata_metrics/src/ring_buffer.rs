//! Fixed window of recent tick durations

use std::time::Duration;

/// Keeps the last `capacity` samples, overwriting the oldest.
pub(crate) struct SampleWindow {
    samples: Vec<Duration>,
    capacity: usize,
    next: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn average(&self) -> Duration {
        match self.samples.len() as u32 {
            0 => Duration::ZERO,
            n => self.samples.iter().sum::<Duration>() / n,
        }
    }

    /// Shortest and longest sample, both zero when empty.
    pub fn range(&self) -> (Duration, Duration) {
        self.samples
            .iter()
            .fold(None, |acc: Option<(Duration, Duration)>, &d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
            .unwrap_or((Duration::ZERO, Duration::ZERO))
    }
}
