//! Engine instrumentation
//!
//! Thin bundle over `strata_metrics`; every field is a zero-sized stub when
//! the `metrics` feature is off.

use strata_metrics::{Counter, SystemProfiler, TickTimer};

pub const ARCHETYPES_CREATED: &str = "archetypes.created";
pub const COMMANDS_REPLAYED: &str = "commands.replayed";
pub const ENTITIES_SPAWNED: &str = "entities.spawned";
pub const ENTITIES_KILLED: &str = "entities.killed";

#[derive(Default)]
pub struct WorldMetrics {
    pub tick_timer: TickTimer,
    pub counters: Counter,
    /// Keyed by stage name and by system name.
    pub profiler: SystemProfiler,
}
