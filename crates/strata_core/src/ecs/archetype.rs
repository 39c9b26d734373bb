// archetype.rs - One table per exact component composition
//
// Row order is the dense order of the entity sparse set. Every data
// component has one `Column` whose rows stay in lock-step with that order:
// any swap-removal on the sparse set is mirrored on every column.

use crate::ecs::storage::{BitSet, Column, ColumnError, SparseSet};
use crate::ecs::{
    ComponentValue, Entity, EntityBuilder, SchemaError, SchemaId, SchemaRegistry, Value,
};
use thiserror::Error;

/// Index of an archetype in the world's archetype arena.
pub type ArchetypeId = usize;

/// The archetype with no components. Always present.
pub const EMPTY_ARCHETYPE: ArchetypeId = 0;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("entity {entity} is not stored in archetype {archetype}")]
    EntityNotInArchetype { entity: Entity, archetype: ArchetypeId },

    #[error("entity {entity} is already stored in archetype {archetype}")]
    EntityAlreadyInArchetype { entity: Entity, archetype: ArchetypeId },

    #[error("archetype {archetype} does not include component {schema}")]
    ComponentNotInArchetype { schema: SchemaId, archetype: ArchetypeId },

    #[error("archetype {archetype} has no column for component {schema}")]
    MissingColumn { schema: SchemaId, archetype: ArchetypeId },

    #[error("component {schema} was requested more than once")]
    DuplicateColumn { schema: SchemaId },

    #[error(transparent)]
    Column(#[from] ColumnError),
}

pub struct Archetype {
    id: ArchetypeId,
    key: String,
    mask: BitSet,
    schemas: Vec<SchemaId>,
    entities: SparseSet<Entity>,
    /// Indexed by schema id; `None` for tags and absent components.
    columns: Vec<Option<Column>>,
    /// Indexed by schema id; neighbour reached by toggling that component.
    adjacent: Vec<Option<ArchetypeId>>,
}

impl Archetype {
    pub(crate) fn new(
        id: ArchetypeId,
        schemas: &[SchemaId],
        registry: &SchemaRegistry,
    ) -> Result<Self, SchemaError> {
        let mut schemas = schemas.to_vec();
        schemas.sort_unstable();
        schemas.dedup();

        let mask: BitSet = schemas.iter().map(|s| s.bit()).collect();
        let mut columns: Vec<Option<Column>> = Vec::new();
        for &schema in &schemas {
            let meta = registry.schema(schema)?;
            if meta.is_tag() {
                continue;
            }
            if schema.bit() >= columns.len() {
                columns.resize_with(schema.bit() + 1, || None);
            }
            columns[schema.bit()] = Some(Column::new(meta.clone()));
        }

        Ok(Self {
            id,
            key: mask.canonical_id(),
            mask,
            schemas,
            entities: SparseSet::new(),
            columns,
            adjacent: Vec::new(),
        })
    }

    /// The archetype with no components, stored at `EMPTY_ARCHETYPE`.
    pub(crate) fn empty() -> Self {
        let mask = BitSet::new();
        Self {
            id: EMPTY_ARCHETYPE,
            key: mask.canonical_id(),
            mask,
            schemas: Vec::new(),
            entities: SparseSet::new(),
            columns: Vec::new(),
            adjacent: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Canonical key derived from the component mask.
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn mask(&self) -> &BitSet {
        &self.mask
    }

    /// Sorted component ids.
    pub fn schemas(&self) -> &[SchemaId] {
        &self.schemas
    }

    /// Entities in row order.
    pub fn entities(&self) -> &[Entity] {
        self.entities.dense()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    #[inline]
    pub fn has_component(&self, schema: SchemaId) -> bool {
        self.mask.contains_bit(schema.bit())
    }

    #[inline]
    pub fn row_of(&self, entity: Entity) -> Option<usize> {
        self.entities.dense_index(entity)
    }

    pub fn column(&self, schema: SchemaId) -> Option<&Column> {
        self.columns.get(schema.bit())?.as_ref()
    }

    pub fn column_mut(&mut self, schema: SchemaId) -> Option<&mut Column> {
        self.columns.get_mut(schema.bit())?.as_mut()
    }

    /// Disjoint mutable access to several columns at once, in request order.
    pub fn columns_mut(&mut self, schemas: &[SchemaId]) -> Result<Vec<&mut Column>, StorageError> {
        for (i, schema) in schemas.iter().enumerate() {
            if schemas[..i].contains(schema) {
                return Err(StorageError::DuplicateColumn { schema: *schema });
            }
        }
        let archetype = self.id;
        let mut slots: Vec<Option<&mut Column>> =
            self.columns.iter_mut().map(Option::as_mut).collect();
        schemas
            .iter()
            .map(|&schema| {
                slots
                    .get_mut(schema.bit())
                    .and_then(Option::take)
                    .ok_or(StorageError::MissingColumn { schema, archetype })
            })
            .collect()
    }

    /// Current value of `schema` for `entity`. Tags read as an empty value.
    pub fn row(&self, entity: Entity, schema: SchemaId) -> Result<ComponentValue, StorageError> {
        let row = self.require_row(entity)?;
        if !self.has_component(schema) {
            return Err(StorageError::ComponentNotInArchetype {
                schema,
                archetype: self.id,
            });
        }
        match self.column(schema) {
            Some(column) => Ok(column.read_row(row)?),
            None => Ok(ComponentValue::new()),
        }
    }

    fn require_row(&self, entity: Entity) -> Result<usize, StorageError> {
        self.row_of(entity).ok_or(StorageError::EntityNotInArchetype {
            entity,
            archetype: self.id,
        })
    }

    /// Memoized neighbour reached by toggling `schema`.
    pub fn adjacent(&self, schema: SchemaId) -> Option<ArchetypeId> {
        self.adjacent.get(schema.bit()).copied().flatten()
    }

    pub(crate) fn set_adjacent(&mut self, schema: SchemaId, target: ArchetypeId) {
        if schema.bit() >= self.adjacent.len() {
            self.adjacent.resize(schema.bit() + 1, None);
        }
        self.adjacent[schema.bit()] = Some(target);
    }

    /// Append `entity` with one row per column, taking values from `values`
    /// where given and schema defaults otherwise. Returns the new row.
    ///
    /// Every value is validated before anything is written.
    pub(crate) fn add_entity(
        &mut self,
        entity: Entity,
        values: &EntityBuilder,
    ) -> Result<usize, StorageError> {
        if self.has_entity(entity) {
            return Err(StorageError::EntityAlreadyInArchetype {
                entity,
                archetype: self.id,
            });
        }
        if let Some(schema) = values.schemas().find(|s| !self.has_component(*s)) {
            return Err(StorageError::ComponentNotInArchetype {
                schema,
                archetype: self.id,
            });
        }

        let mut rows: Vec<(usize, Vec<Value>)> = Vec::new();
        for (slot, column) in self.columns.iter().enumerate() {
            let Some(column) = column else { continue };
            let value = values.value_of(column.schema().id());
            if let Some(resolved) = column.schema().resolve(value)? {
                rows.push((slot, resolved));
            }
        }

        self.entities.insert(entity);
        for (slot, resolved) in rows {
            if let Some(column) = self.columns[slot].as_mut() {
                column.push_values(resolved)?;
            }
        }
        Ok(self.entities.len() - 1)
    }

    /// Swap-remove `entity` from the sparse set and, in the same order,
    /// from every column.
    pub(crate) fn remove_entity(&mut self, entity: Entity) -> Result<(), StorageError> {
        let row = self.require_row(entity)?;
        self.entities.remove(entity);
        for column in self.columns.iter_mut().flatten() {
            column.swap_remove(row)?;
        }
        Ok(())
    }

    /// Overwrite the row of `entity` for one data component.
    pub(crate) fn write_row(
        &mut self,
        entity: Entity,
        schema: SchemaId,
        values: Vec<Value>,
    ) -> Result<(), StorageError> {
        let row = self.require_row(entity)?;
        let archetype = self.id;
        let column = self
            .column_mut(schema)
            .ok_or(StorageError::MissingColumn { schema, archetype })?;
        column.write_values(row, values)?;
        Ok(())
    }

    /// Move `entity` from `from` into `to`.
    ///
    /// Each column of `to` receives `added`'s values if it is the component
    /// being attached, else a copy of the matching column in `from`, else
    /// the schema default. Returns `Ok(false)` without touching either table
    /// when `entity` is already in `to` or missing from `from`.
    pub(crate) fn move_entity(
        from: &mut Archetype,
        to: &mut Archetype,
        entity: Entity,
        added: Option<(SchemaId, Vec<Value>)>,
    ) -> Result<bool, StorageError> {
        if to.has_entity(entity) {
            return Ok(false);
        }
        let Some(source_row) = from.row_of(entity) else {
            return Ok(false);
        };

        let mut added = added;
        let rows = to.len();
        if let Err(err) = to.push_moved_row(from, source_row, &mut added) {
            for column in to.columns.iter_mut().flatten() {
                column.truncate(rows);
            }
            return Err(err);
        }
        to.entities.insert(entity);
        from.remove_entity(entity)?;
        Ok(true)
    }

    /// Append one row to every column: the added value, a copy from
    /// `from`, or the schema default, in that order of preference.
    fn push_moved_row(
        &mut self,
        from: &Archetype,
        source_row: usize,
        added: &mut Option<(SchemaId, Vec<Value>)>,
    ) -> Result<(), StorageError> {
        for &schema in &self.schemas {
            let Some(column) = self.columns.get_mut(schema.bit()).and_then(Option::as_mut) else {
                continue;
            };
            if added.as_ref().is_some_and(|(id, _)| *id == schema) {
                if let Some((_, values)) = added.take() {
                    column.push_values(values)?;
                }
            } else if let Some(source) = from.column(schema) {
                column.push_copied(source, source_row)?;
            } else {
                column.push_default()?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("schemas", &self.schemas)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{FieldKind, SchemaDef};

    struct Fixture {
        registry: SchemaRegistry,
        position: SchemaId,
        speed: SchemaId,
        frozen: SchemaId,
    }

    fn fixture() -> Fixture {
        let mut registry = SchemaRegistry::new();
        let position = registry
            .register(SchemaDef::new("Position").field("x", FieldKind::F32).field("y", FieldKind::F32))
            .unwrap();
        let speed = registry
            .register(SchemaDef::new("Speed").field_with_default("value", 1.5f32))
            .unwrap();
        let frozen = registry.register(SchemaDef::new("Frozen")).unwrap();
        Fixture {
            registry,
            position,
            speed,
            frozen,
        }
    }

    fn at(x: f32) -> EntityBuilder {
        EntityBuilder::new().with(
            SchemaId::new(0),
            ComponentValue::new().with("x", x).with("y", -x),
        )
    }

    fn assert_aligned(archetype: &Archetype, schema: SchemaId) {
        let xs = archetype.column(schema).unwrap().field::<f32>("x").unwrap();
        assert_eq!(xs.len(), archetype.len());
        for (row, entity) in archetype.entities().iter().enumerate() {
            // every fixture entity stores x == its id
            assert_eq!(xs[row], entity.index() as f32);
            assert_eq!(archetype.row_of(*entity), Some(row));
        }
    }

    #[test]
    fn tags_have_no_column() {
        let fx = fixture();
        let archetype = Archetype::new(1, &[fx.frozen, fx.position], &fx.registry).unwrap();
        assert!(archetype.column(fx.position).is_some());
        assert!(archetype.column(fx.frozen).is_none());
        assert!(archetype.has_component(fx.frozen));
        assert_eq!(archetype.schemas(), &[fx.position, fx.frozen]);
        assert_eq!(archetype.key(), "5");
    }

    #[test]
    fn swap_remove_keeps_columns_in_lock_step() {
        let fx = fixture();
        let mut archetype = Archetype::new(1, &[fx.position], &fx.registry).unwrap();
        for i in 0..10u32 {
            let row = archetype.add_entity(Entity::from_raw(i), &at(i as f32)).unwrap();
            assert_eq!(row, i as usize);
        }

        for victim in [0u32, 9, 4, 5, 1] {
            archetype.remove_entity(Entity::from_raw(victim)).unwrap();
            assert_aligned(&archetype, fx.position);
        }
        assert_eq!(archetype.len(), 5);

        for rest in [2u32, 3, 6, 7, 8] {
            archetype.remove_entity(Entity::from_raw(rest)).unwrap();
            assert_aligned(&archetype, fx.position);
        }
        assert!(archetype.is_empty());
    }

    #[test]
    fn add_entity_is_atomic() {
        let fx = fixture();
        let mut archetype = Archetype::new(1, &[fx.position], &fx.registry).unwrap();
        let entity = Entity::from_raw(0);

        let bad = EntityBuilder::new().with(fx.position, ComponentValue::new().with("x", 1i32));
        assert!(archetype.add_entity(entity, &bad).is_err());
        let foreign = EntityBuilder::new().with_default(fx.speed);
        assert!(matches!(
            archetype.add_entity(entity, &foreign),
            Err(StorageError::ComponentNotInArchetype { .. })
        ));
        assert!(archetype.is_empty());

        archetype.add_entity(entity, &EntityBuilder::new()).unwrap();
        assert!(matches!(
            archetype.add_entity(entity, &EntityBuilder::new()),
            Err(StorageError::EntityAlreadyInArchetype { .. })
        ));
        assert_eq!(
            archetype.row(entity, fx.position).unwrap(),
            ComponentValue::new().with("x", 0.0f32).with("y", 0.0f32)
        );
    }

    #[test]
    fn move_preserves_shared_and_defaults_new() {
        let fx = fixture();
        let mut from = Archetype::new(1, &[fx.position], &fx.registry).unwrap();
        let mut to = Archetype::new(2, &[fx.position, fx.speed], &fx.registry).unwrap();
        let a = Entity::from_raw(0);
        let b = Entity::from_raw(1);
        from.add_entity(a, &at(0.0)).unwrap();
        from.add_entity(b, &at(1.0)).unwrap();

        assert!(Archetype::move_entity(&mut from, &mut to, a, None).unwrap());
        let given = vec![Value::F32(9.0)];
        assert!(Archetype::move_entity(&mut from, &mut to, b, Some((fx.speed, given))).unwrap());

        assert!(from.is_empty());
        assert_eq!(to.row(a, fx.speed).unwrap().get("value"), Some(&Value::F32(1.5)));
        assert_eq!(to.row(b, fx.speed).unwrap().get("value"), Some(&Value::F32(9.0)));
        assert_aligned(&to, fx.position);

        // already there / not in source
        assert!(!Archetype::move_entity(&mut from, &mut to, a, None).unwrap());
        assert_eq!(to.len(), 2);
    }

    #[test]
    fn move_drops_removed_component() {
        let fx = fixture();
        let mut from = Archetype::new(2, &[fx.position, fx.speed], &fx.registry).unwrap();
        let mut to = Archetype::new(1, &[fx.position], &fx.registry).unwrap();
        let e = Entity::from_raw(3);
        from.add_entity(e, &EntityBuilder::new().with(fx.position, ComponentValue::new().with("x", 3.0f32)))
            .unwrap();

        assert!(Archetype::move_entity(&mut from, &mut to, e, None).unwrap());
        assert_eq!(to.row(e, fx.position).unwrap().get("x"), Some(&Value::F32(3.0)));
        assert!(from.column(fx.speed).unwrap().is_empty());
    }

    #[test]
    fn failed_move_leaves_both_tables_untouched() {
        let fx = fixture();
        let mut from = Archetype::new(1, &[fx.position], &fx.registry).unwrap();
        let mut to = Archetype::new(2, &[fx.position, fx.speed], &fx.registry).unwrap();
        let e = Entity::from_raw(0);
        from.add_entity(e, &at(0.0)).unwrap();

        // position is copied before speed rejects the i32
        let wrong = vec![Value::I32(1)];
        assert!(Archetype::move_entity(&mut from, &mut to, e, Some((fx.speed, wrong))).is_err());

        assert!(to.is_empty());
        assert!(to.column(fx.position).unwrap().is_empty());
        assert!(to.column(fx.speed).unwrap().is_empty());
        assert!(from.has_entity(e));
        assert_aligned(&from, fx.position);

        assert!(Archetype::move_entity(&mut from, &mut to, e, None).unwrap());
        assert_aligned(&to, fx.position);
    }

    #[test]
    fn columns_mut_rejects_duplicates_and_missing() {
        let fx = fixture();
        let mut archetype = Archetype::new(2, &[fx.position, fx.speed], &fx.registry).unwrap();
        archetype.add_entity(Entity::from_raw(0), &EntityBuilder::new()).unwrap();

        {
            let mut cols = archetype.columns_mut(&[fx.speed, fx.position]).unwrap();
            let speed = cols[0].field::<f32>("value").unwrap()[0];
            cols[1].field_mut::<f32>("x").unwrap()[0] += speed;
        }
        assert_eq!(
            archetype.column(fx.position).unwrap().field::<f32>("x").unwrap(),
            &[1.5]
        );
        assert!(matches!(
            archetype.columns_mut(&[fx.speed, fx.speed]),
            Err(StorageError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            archetype.columns_mut(&[fx.frozen]),
            Err(StorageError::MissingColumn { .. })
        ));
    }
}
