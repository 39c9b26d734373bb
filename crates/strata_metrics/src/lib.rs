//! Strata Metrics - timing and counting for the storage engine
//!
//! Instrumentation used by `strata_core` to track tick durations, per-system
//! cost and structural churn (archetypes created, commands replayed, ...).
//! Everything vanishes in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use strata_metrics::{SystemProfiler, TickTimer};
//!
//! let mut timer = TickTimer::new(120); // Track last 120 ticks
//! timer.begin();
//! // ... step the world ...
//! timer.end();
//! println!("tick: {:.3}ms", timer.tick_time_ms());
//! ```
//!
//! Without the `metrics` feature every type below is a zero-sized stub with
//! the same API, so call sites never need their own `cfg` guards.

#[cfg(feature = "metrics")]
mod tick_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;
#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when the calling crate has its `metrics` feature enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

/// Time a scope under `$name` (zero-cost when metrics disabled)
#[macro_export]
macro_rules! time_scope {
    ($profiler:expr, $name:expr, $body:block) => {{
        #[cfg(feature = "metrics")]
        let result = $profiler.time_system($name, || $body);
        #[cfg(not(feature = "metrics"))]
        let result = $body;
        result
    }};
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn ticks_per_second(&self) -> f64 { 0.0 }
    pub fn tick_time_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn samples(&self) -> usize { 0 }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &str, _value: usize) {}
    pub fn set(&mut self, _name: &str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
    pub fn reset(&mut self, _name: &str) {}
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&String, &usize)> { std::iter::empty() }
    pub fn snapshot(&self) -> Vec<(String, usize)> { Vec::new() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn record(&mut self, _name: &str, _elapsed: std::time::Duration) {}
    pub fn get_timing(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn total(&self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn reset(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&String, &std::time::Duration)> { std::iter::empty() }
}
