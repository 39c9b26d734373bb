// query.rs - Cached component filters
//
// A query never re-scans: matches are computed once per archetype, when the
// archetype is created (or when the query is registered), and only ever
// appended. Emptied archetypes stay matched.

use crate::ecs::storage::BitSet;
use crate::ecs::{Archetype, ArchetypeId, SchemaId};
use std::collections::HashMap;
use std::fmt;

/// Handle returned by `World::register_query`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryHandle(u32);

impl QueryHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the raw index backing this handle.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Required components plus every archetype known to carry them, in
/// archetype-creation order.
#[derive(Clone, Debug)]
pub struct Query {
    schemas: Vec<SchemaId>,
    mask: BitSet,
    matches: Vec<ArchetypeId>,
}

impl Query {
    pub(crate) fn new(schemas: Vec<SchemaId>) -> Self {
        let mask = schemas.iter().map(|s| s.bit()).collect();
        Self {
            schemas,
            mask,
            matches: Vec::new(),
        }
    }

    /// Required component ids, sorted.
    pub fn schemas(&self) -> &[SchemaId] {
        &self.schemas
    }

    pub fn mask(&self) -> &BitSet {
        &self.mask
    }

    /// Matched archetypes, oldest first.
    pub fn archetypes(&self) -> &[ArchetypeId] {
        &self.matches
    }

    pub fn matches(&self, archetype: &Archetype) -> bool {
        archetype.mask().contains(&self.mask)
    }

    /// Record `archetype` if its mask is a superset of ours.
    pub(crate) fn try_add(&mut self, archetype: &Archetype) -> bool {
        if !self.matches(archetype) || self.matches.contains(&archetype.id()) {
            return false;
        }
        self.matches.push(archetype.id());
        true
    }
}

#[derive(Default)]
pub(crate) struct QueryRegistry {
    queries: Vec<Query>,
    by_schemas: HashMap<Vec<SchemaId>, QueryHandle>,
}

impl QueryRegistry {
    /// Register a query, or return the handle of an identical one.
    pub fn register<'a>(
        &mut self,
        schemas: &[SchemaId],
        archetypes: impl IntoIterator<Item = &'a Archetype>,
    ) -> QueryHandle {
        let mut key = schemas.to_vec();
        key.sort_unstable();
        key.dedup();
        if let Some(handle) = self.by_schemas.get(&key) {
            return *handle;
        }

        let mut query = Query::new(key.clone());
        for archetype in archetypes {
            query.try_add(archetype);
        }
        let handle = QueryHandle::new(self.queries.len() as u32);
        tracing::debug!(query = %handle, schemas = ?key, matched = query.matches.len(), "registered query");
        self.queries.push(query);
        self.by_schemas.insert(key, handle);
        handle
    }

    /// Offer a freshly created archetype to every query, in registration order.
    pub fn offer(&mut self, archetype: &Archetype) {
        for query in &mut self.queries {
            query.try_add(archetype);
        }
    }

    pub fn get(&self, handle: QueryHandle) -> Option<&Query> {
        self.queries.get(handle.index() as usize)
    }

    /// Empty every match list and forget the schema index, so registering
    /// the same set again builds a fresh query. Old handles stay valid.
    pub fn clear_matches(&mut self) {
        for query in &mut self.queries {
            query.matches.clear();
        }
        self.by_schemas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{SchemaDef, SchemaRegistry};

    #[test]
    fn matches_supersets_only() {
        let mut registry = SchemaRegistry::new();
        let a = registry.register(SchemaDef::new("A")).unwrap();
        let b = registry.register(SchemaDef::new("B")).unwrap();
        let c = registry.register(SchemaDef::new("C")).unwrap();

        let ab = Archetype::new(1, &[a, b], &registry).unwrap();
        let bc = Archetype::new(2, &[b, c], &registry).unwrap();
        let abc = Archetype::new(3, &[a, b, c], &registry).unwrap();

        let mut queries = QueryRegistry::default();
        let handle = queries.register(&[b, a], [&ab]);
        queries.offer(&bc);
        queries.offer(&abc);

        assert_eq!(queries.get(handle).unwrap().archetypes(), &[1, 3]);
        assert_eq!(queries.register(&[a, b], std::iter::empty()), handle);
    }

    #[test]
    fn try_add_is_idempotent() {
        let registry = SchemaRegistry::new();
        let empty = Archetype::new(0, &[], &registry).unwrap();
        let mut query = Query::new(Vec::new());
        assert!(query.try_add(&empty));
        assert!(!query.try_add(&empty));
        assert_eq!(query.archetypes(), &[0]);
    }
}
