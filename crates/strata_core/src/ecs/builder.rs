use crate::ecs::{ComponentValue, SchemaId};
use std::collections::BTreeMap;

/// Initial component values for a spawn.
///
/// A component listed without a value takes its schema default; tags never
/// carry a value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityBuilder {
    components: BTreeMap<SchemaId, Option<ComponentValue>>,
}

impl EntityBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
        }
    }

    /// Add a component with an explicit (possibly partial) value.
    pub fn with(mut self, schema: SchemaId, value: ComponentValue) -> Self {
        self.components.insert(schema, Some(value));
        self
    }

    /// Add a component using its schema default, or a tag.
    pub fn with_default(mut self, schema: SchemaId) -> Self {
        self.components.insert(schema, None);
        self
    }

    pub fn insert(&mut self, schema: SchemaId, value: Option<ComponentValue>) {
        self.components.insert(schema, value);
    }

    pub fn contains(&self, schema: SchemaId) -> bool {
        self.components.contains_key(&schema)
    }

    /// Explicit value for `schema`, if one was given.
    pub fn value_of(&self, schema: SchemaId) -> Option<&ComponentValue> {
        self.components.get(&schema)?.as_ref()
    }

    /// Listed schema ids in ascending order.
    pub fn schemas(&self) -> impl Iterator<Item = SchemaId> + '_ {
        self.components.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
