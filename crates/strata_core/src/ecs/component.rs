// component.rs - Runtime component schemas
//
// Components are described by data, not by Rust types: a schema is either a
// zero-size tag or an ordered list of typed fields with defaults. Schema ids
// are small dense integers and double as bit positions in archetype masks.

use crate::ecs::storage::ColumnError;
use crate::ecs::{ComponentValue, FieldKind, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stable identifier of a registered component schema.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(u32);

impl SchemaId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Bit position in archetype and query masks.
    #[inline]
    pub fn bit(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One field of a data component.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMeta {
    pub name: String,
    pub kind: FieldKind,
    pub default: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SchemaKind {
    /// Zero-size marker with no column storage.
    Tag,
    /// Structure-of-arrays data, one typed vector per field.
    Data(Vec<FieldMeta>),
}

/// Immutable, registered description of a component.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSchema {
    id: SchemaId,
    name: String,
    kind: SchemaKind,
}

impl ComponentSchema {
    #[inline]
    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn is_tag(&self) -> bool {
        matches!(self.kind, SchemaKind::Tag)
    }

    /// Field layout; empty for tags.
    pub fn fields(&self) -> &[FieldMeta] {
        match &self.kind {
            SchemaKind::Tag => &[],
            SchemaKind::Data(fields) => fields,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields().iter().map(|field| field.name.as_str())
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|field| field.name == name)
    }

    /// Default instance, `None` for tags.
    pub fn default_value(&self) -> Option<ComponentValue> {
        match &self.kind {
            SchemaKind::Tag => None,
            SchemaKind::Data(fields) => Some(
                fields
                    .iter()
                    .map(|field| (field.name.clone(), field.default.clone()))
                    .collect(),
            ),
        }
    }

    /// Default field values in declaration order.
    pub fn default_values(&self) -> Vec<Value> {
        self.fields().iter().map(|field| field.default.clone()).collect()
    }

    /// Validate a (possibly partial) value and expand it into one value per
    /// field, filling gaps with defaults. Tags resolve to `None`.
    pub fn resolve(&self, value: Option<&ComponentValue>) -> Result<Option<Vec<Value>>, ColumnError> {
        if self.is_tag() {
            return Ok(None);
        }
        let mut values = self.default_values();
        let Some(value) = value else {
            return Ok(Some(values));
        };
        for (name, field_value) in value.iter() {
            let index = self
                .field_index(name)
                .ok_or_else(|| ColumnError::UnknownField {
                    schema: self.name.clone(),
                    field: name.to_string(),
                })?;
            let expected = self.fields()[index].kind;
            if field_value.kind() != expected {
                return Err(ColumnError::TypeMismatch {
                    schema: self.name.clone(),
                    field: name.to_string(),
                    expected,
                    found: field_value.kind(),
                });
            }
            values[index] = field_value.clone();
        }
        Ok(Some(values))
    }
}

/// Declarative field description, as written in code or JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Declarative schema description.
///
/// A definition without fields registers as a tag.
///
/// ```ignore
/// let position = SchemaDef::new("Position")
///     .field("x", FieldKind::F32)
///     .field("y", FieldKind::F32);
/// let frozen = SchemaDef::new("Frozen");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            fields: Vec::new(),
        }
    }

    /// Request a specific id instead of the next free one.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Add a field defaulting to the kind's zero value.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            default: None,
        });
        self
    }

    pub fn field_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        let default = default.into();
        self.fields.push(FieldDef {
            name: name.into(),
            kind: default.kind(),
            default: Some(default),
        });
        self
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema id {id} is already taken by '{existing}'")]
    DuplicateId { id: SchemaId, existing: String },

    #[error("a schema named '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("default of field '{field}' in schema '{schema}' is {found:?}, expected {expected:?}")]
    DefaultKindMismatch {
        schema: String,
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("schema {0} is not registered")]
    Unknown(SchemaId),
}

/// Owner of every schema known to one world.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: Vec<Option<Arc<ComponentSchema>>>,
    by_name: HashMap<String, SchemaId>,
    next_id: u32,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `def`, honouring `def.id` when present.
    pub fn register(&mut self, def: SchemaDef) -> Result<SchemaId, SchemaError> {
        let id = match def.id {
            Some(id) => SchemaId::new(id),
            None => self.next_free(),
        };
        self.register_with_id(def, id)
    }

    pub fn register_with_id(&mut self, def: SchemaDef, id: SchemaId) -> Result<SchemaId, SchemaError> {
        if let Some(existing) = self.get(id) {
            return Err(SchemaError::DuplicateId {
                id,
                existing: existing.name.clone(),
            });
        }
        if self.by_name.contains_key(&def.name) {
            return Err(SchemaError::DuplicateName { name: def.name });
        }

        let mut fields: Vec<FieldMeta> = Vec::with_capacity(def.fields.len());
        for field in def.fields {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    schema: def.name,
                    field: field.name,
                });
            }
            let default = field.default.unwrap_or_else(|| field.kind.zero());
            if default.kind() != field.kind {
                return Err(SchemaError::DefaultKindMismatch {
                    schema: def.name,
                    field: field.name,
                    expected: field.kind,
                    found: default.kind(),
                });
            }
            fields.push(FieldMeta {
                name: field.name,
                kind: field.kind,
                default,
            });
        }

        let kind = if fields.is_empty() {
            SchemaKind::Tag
        } else {
            SchemaKind::Data(fields)
        };
        let slot = id.index() as usize;
        if slot >= self.schemas.len() {
            self.schemas.resize(slot + 1, None);
        }
        tracing::debug!(schema = %def.name, id = %id, tag = matches!(kind, SchemaKind::Tag), "registered component schema");
        self.by_name.insert(def.name.clone(), id);
        self.schemas[slot] = Some(Arc::new(ComponentSchema {
            id,
            name: def.name,
            kind,
        }));
        Ok(id)
    }

    fn next_free(&mut self) -> SchemaId {
        while self.get(SchemaId::new(self.next_id)).is_some() {
            self.next_id += 1;
        }
        let id = SchemaId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: SchemaId) -> Option<&Arc<ComponentSchema>> {
        self.schemas.get(id.index() as usize)?.as_ref()
    }

    /// Like [`get`](Self::get) but with an error for unknown ids.
    pub fn schema(&self, id: SchemaId) -> Result<&Arc<ComponentSchema>, SchemaError> {
        self.get(id).ok_or(SchemaError::Unknown(id))
    }

    pub fn id_of(&self, name: &str) -> Option<SchemaId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, id: SchemaId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentSchema>> {
        self.schemas.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> SchemaDef {
        SchemaDef::new("Position")
            .field("x", FieldKind::F32)
            .field_with_default("y", 5.0f32)
    }

    #[test]
    fn ids_are_dense_and_skip_claimed() {
        let mut registry = SchemaRegistry::new();
        let claimed = registry.register(SchemaDef::new("Frozen").with_id(1)).unwrap();
        let a = registry.register(position()).unwrap();
        let b = registry.register(SchemaDef::new("Speed").field("value", FieldKind::F32)).unwrap();

        assert_eq!(claimed, SchemaId::new(1));
        assert_eq!(a, SchemaId::new(0));
        assert_eq!(b, SchemaId::new(2));
        assert_eq!(registry.id_of("Speed"), Some(b));
        assert!(registry.get(claimed).unwrap().is_tag());
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register(position()).unwrap();
        assert!(matches!(
            registry.register(position()),
            Err(SchemaError::DuplicateName { .. })
        ));
        assert!(matches!(
            registry.register(SchemaDef::new("Other").with_id(0)),
            Err(SchemaError::DuplicateId { .. })
        ));
        assert!(matches!(
            registry.register(SchemaDef::new("Twice").field("a", FieldKind::I32).field("a", FieldKind::I32)),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn resolve_fills_defaults_and_validates() {
        let mut registry = SchemaRegistry::new();
        let id = registry.register(position()).unwrap();
        let schema = registry.schema(id).unwrap();

        let values = schema
            .resolve(Some(&ComponentValue::new().with("x", 2.0f32)))
            .unwrap()
            .unwrap();
        assert_eq!(values, vec![Value::F32(2.0), Value::F32(5.0)]);

        assert!(matches!(
            schema.resolve(Some(&ComponentValue::new().with("z", 1.0f32))),
            Err(ColumnError::UnknownField { .. })
        ));
        assert!(matches!(
            schema.resolve(Some(&ComponentValue::new().with("x", 1i32))),
            Err(ColumnError::TypeMismatch { .. })
        ));
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["x", "y"]
        );
    }
}
