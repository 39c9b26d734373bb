//! Strata Core
//!
//! Archetype-based entity component storage:
//! - Sparse sets and growable bitsets
//! - Runtime component schemas with structure-of-arrays columns
//! - Archetype graph with memoized transitions and cached queries
//! - Deferred structural changes and double-buffered event topics
//! - Staged system scheduling driven by a step clock

pub mod config;
pub mod ecs;
pub mod metrics;
pub mod time;

pub use config::{ConfigError, WorldConfig};
pub use ecs::{World, WorldError, WorldResult};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
