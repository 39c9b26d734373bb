// graph.rs - Archetype arena and single-component transitions
//
// Archetypes reference their neighbours by `ArchetypeId` (arena index), so
// the cyclic add/remove graph owns nothing but indices. Edges are written on
// both ends the first time a transition is resolved.

use crate::ecs::query::QueryRegistry;
use crate::ecs::{Archetype, ArchetypeId, SchemaId, SchemaRegistry, WorldError, EMPTY_ARCHETYPE};
use std::collections::HashMap;

pub(crate) struct ArchetypeGraph {
    archetypes: Vec<Archetype>,
    by_key: HashMap<String, ArchetypeId>,
}

impl ArchetypeGraph {
    pub fn new() -> Self {
        let empty = Archetype::empty();
        let mut by_key = HashMap::new();
        by_key.insert(empty.key().to_string(), EMPTY_ARCHETYPE);
        Self {
            archetypes: vec![empty],
            by_key,
        }
    }

    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id)
    }

    pub fn by_key(&self, key: &str) -> Option<ArchetypeId> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Resolve the archetype reached from `current` by toggling `schema`,
    /// creating it (and offering it to every query) on first use.
    pub fn transition(
        &mut self,
        current: ArchetypeId,
        schema: SchemaId,
        registry: &SchemaRegistry,
        queries: &mut QueryRegistry,
    ) -> Result<ArchetypeId, WorldError> {
        let from = self
            .archetypes
            .get(current)
            .ok_or(WorldError::UnknownArchetype(current))?;
        if let Some(next) = from.adjacent(schema) {
            return Ok(next);
        }
        registry.schema(schema)?;

        let mut mask = from.mask().clone();
        mask.toggle(schema.bit());
        let key = mask.canonical_id();

        let target = match self.by_key.get(&key) {
            Some(&existing) => existing,
            None => {
                let mut schemas = from.schemas().to_vec();
                if from.has_component(schema) {
                    schemas.retain(|s| *s != schema);
                } else {
                    schemas.push(schema);
                }
                let id = self.archetypes.len();
                let archetype = Archetype::new(id, &schemas, registry)?;
                tracing::debug!(archetype = id, key = %key, schemas = ?archetype.schemas(), "created archetype");
                queries.offer(&archetype);
                self.archetypes.push(archetype);
                self.by_key.insert(key, id);
                id
            }
        };

        if let Some(from) = self.archetypes.get_mut(current) {
            from.set_adjacent(schema, target);
        }
        if let Some(to) = self.archetypes.get_mut(target) {
            to.set_adjacent(schema, current);
        }
        Ok(target)
    }

    /// Two distinct archetypes borrowed mutably at once.
    pub fn pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> Option<(&mut Archetype, &mut Archetype)> {
        if a == b || a >= self.archetypes.len() || b >= self.archetypes.len() {
            return None;
        }
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            Some((&mut left[a], &mut right[0]))
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            Some((&mut right[0], &mut left[b]))
        }
    }
}
