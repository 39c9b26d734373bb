//! World configuration
//!
//! Loaded from JSON by the runtime; every field is optional.
//!
//! ```json
//! {
//!   "initial_capacity": 1024,
//!   "lifecycle_events": true,
//!   "components": [
//!     { "name": "Position", "fields": [
//!       { "name": "x", "kind": "f32" },
//!       { "name": "y", "kind": "f32", "default": { "f32": 1.0 } }
//!     ] },
//!     { "name": "Frozen" }
//!   ]
//! }
//! ```

use crate::ecs::{SchemaDef, SchemaError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of entity slots before the first resize.
pub const DEFAULT_CAPACITY: usize = 100_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub initial_capacity: usize,
    /// Register the entity/component lifecycle topics at startup.
    pub lifecycle_events: bool,
    /// Schemas registered in order at startup.
    pub components: Vec<SchemaDef>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            lifecycle_events: false,
            components: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid world config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{FieldKind, Value};

    #[test]
    fn empty_object_uses_defaults() {
        let config = WorldConfig::from_json_str("{}").unwrap();
        assert_eq!(config, WorldConfig::default());
        assert_eq!(config.initial_capacity, 100_000);
    }

    #[test]
    fn parses_components() {
        let config = WorldConfig::from_json_str(
            r#"{
                "initial_capacity": 8,
                "lifecycle_events": true,
                "components": [
                    { "name": "Position", "fields": [
                        { "name": "x", "kind": "f32" },
                        { "name": "y", "kind": "f32", "default": { "f32": 1.0 } }
                    ] },
                    { "name": "Frozen", "id": 7 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.initial_capacity, 8);
        assert!(config.lifecycle_events);
        assert_eq!(
            config.components[0],
            SchemaDef::new("Position")
                .field("x", FieldKind::F32)
                .field_with_default("y", Value::F32(1.0))
        );
        assert_eq!(config.components[1].id, Some(7));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            WorldConfig::from_json_str("{ \"initial_capacity\": \"lots\" }"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            WorldConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
