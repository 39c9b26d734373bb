// command.rs - Deferred structural changes
//
// While systems run, structural requests are logged instead of applied so
// that no row moves under an in-flight iteration. The log is replayed in
// submission order once every stage of the tick has finished.

use crate::ecs::entity::Entities;
use crate::ecs::{
    ArchetypeId, ComponentValue, Entity, EntityBuilder, SchemaId, SchemaRegistry, WorldError,
    WorldResult, EMPTY_ARCHETYPE,
};
use std::collections::HashSet;

/// One buffered structural change.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Spawn {
        entity: Entity,
        archetype: ArchetypeId,
        values: EntityBuilder,
    },
    Kill {
        entity: Entity,
    },
    SetComponent {
        entity: Entity,
        schema: SchemaId,
        value: Option<ComponentValue>,
    },
    RemoveComponent {
        entity: Entity,
        schema: SchemaId,
    },
}

/// Ordered operation log plus the per-tick kill set.
#[derive(Default)]
pub(crate) struct CommandBuffer {
    deferred: bool,
    operations: Vec<Operation>,
    killed: HashSet<Entity>,
}

impl CommandBuffer {
    #[inline]
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Queue a kill unless `entity` was already killed this tick.
    pub fn kill(&mut self, entity: Entity) -> bool {
        if !self.mark_killed(entity) {
            tracing::trace!(%entity, "entity already scheduled for kill this tick");
            return false;
        }
        self.operations.push(Operation::Kill { entity });
        true
    }

    /// Record `entity` in the kill set; `false` if it was already there.
    pub fn mark_killed(&mut self, entity: Entity) -> bool {
        self.killed.insert(entity)
    }

    pub fn was_killed(&self, entity: Entity) -> bool {
        self.killed.contains(&entity)
    }

    /// Forget a kill mark once its id has been handed out again.
    pub fn revive(&mut self, entity: Entity) {
        self.killed.remove(&entity);
    }

    pub fn take(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    pub fn reset_killed(&mut self) {
        self.killed.clear();
    }

    pub fn clear(&mut self) {
        self.operations.clear();
        self.killed.clear();
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Structural changes requested from inside a query loop.
///
/// Everything is queued; ids for spawned entities are reserved immediately
/// so callers can keep referring to them. Requests are validated when they
/// are queued, the same way the `World` methods validate them. The log is
/// applied at the end of the tick, or by `World::apply_deferred`.
pub struct Commands<'w> {
    entities: &'w mut Entities,
    buffer: &'w mut CommandBuffer,
    schemas: &'w SchemaRegistry,
    archetypes: usize,
}

impl<'w> Commands<'w> {
    pub(crate) fn new(
        entities: &'w mut Entities,
        buffer: &'w mut CommandBuffer,
        schemas: &'w SchemaRegistry,
        archetypes: usize,
    ) -> Self {
        Self {
            entities,
            buffer,
            schemas,
            archetypes,
        }
    }

    /// Spawn into the empty archetype.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.reserve();
        self.buffer.push(Operation::Spawn {
            entity,
            archetype: EMPTY_ARCHETYPE,
            values: EntityBuilder::new(),
        });
        entity
    }

    pub fn spawn_in(&mut self, archetype: ArchetypeId, values: EntityBuilder) -> WorldResult<Entity> {
        if archetype >= self.archetypes {
            return Err(WorldError::UnknownArchetype(archetype));
        }
        let entity = self.reserve();
        self.buffer.push(Operation::Spawn {
            entity,
            archetype,
            values,
        });
        Ok(entity)
    }

    fn reserve(&mut self) -> Entity {
        let entity = self.entities.allocate();
        self.buffer.revive(entity);
        entity
    }

    /// Queue a kill. A second kill of the same entity this tick is ignored.
    pub fn kill(&mut self, entity: Entity) -> WorldResult<()> {
        if !self.entities.is_allocated(entity) {
            if self.buffer.was_killed(entity) {
                tracing::trace!(%entity, "entity already killed this tick");
                return Ok(());
            }
            return Err(WorldError::EntityNotFound(entity));
        }
        self.buffer.kill(entity);
        Ok(())
    }

    pub fn set_component(
        &mut self,
        entity: Entity,
        schema: SchemaId,
        value: Option<ComponentValue>,
    ) -> WorldResult<()> {
        self.check(entity, schema)?;
        self.buffer.push(Operation::SetComponent {
            entity,
            schema,
            value,
        });
        Ok(())
    }

    pub fn remove_component(&mut self, entity: Entity, schema: SchemaId) -> WorldResult<()> {
        self.check(entity, schema)?;
        self.buffer
            .push(Operation::RemoveComponent { entity, schema });
        Ok(())
    }

    fn check(&self, entity: Entity, schema: SchemaId) -> WorldResult<()> {
        self.schemas.schema(schema)?;
        if !self.entities.is_allocated(entity) {
            return Err(WorldError::EntityNotFound(entity));
        }
        Ok(())
    }

    /// Operations queued so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::SchemaDef;

    #[test]
    fn double_kill_is_queued_once() {
        let mut buffer = CommandBuffer::default();
        let entity = Entity::from_raw(4);
        assert!(buffer.kill(entity));
        assert!(!buffer.kill(entity));
        assert_eq!(buffer.take(), vec![Operation::Kill { entity }]);

        buffer.reset_killed();
        assert!(buffer.kill(entity));
    }

    #[test]
    fn commands_reserve_ids_and_keep_order() {
        let mut entities = Entities::with_capacity(4);
        let mut buffer = CommandBuffer::default();
        let mut schemas = SchemaRegistry::new();
        let schema = schemas.register(SchemaDef::new("Marker")).unwrap();

        let spawned = {
            let mut commands = Commands::new(&mut entities, &mut buffer, &schemas, 1);
            let e = commands.spawn();
            commands.set_component(e, schema, None).unwrap();
            commands.remove_component(e, schema).unwrap();
            commands.kill(e).unwrap();
            commands.kill(e).unwrap();
            assert_eq!(commands.len(), 4);
            e
        };

        assert!(entities.is_allocated(spawned));
        let ops = buffer.take();
        assert!(matches!(ops[0], Operation::Spawn { archetype: EMPTY_ARCHETYPE, .. }));
        assert!(matches!(ops[3], Operation::Kill { entity } if entity == spawned));
    }

    #[test]
    fn commands_reject_bad_requests_when_queued() {
        let mut entities = Entities::with_capacity(4);
        let mut buffer = CommandBuffer::default();
        let mut schemas = SchemaRegistry::new();
        let schema = schemas.register(SchemaDef::new("Marker")).unwrap();
        let missing = SchemaId::new(99);

        let mut commands = Commands::new(&mut entities, &mut buffer, &schemas, 1);
        let live = commands.spawn();
        let stranger = Entity::from_raw(3);

        assert!(matches!(
            commands.set_component(live, missing, None),
            Err(WorldError::Schema(_))
        ));
        assert!(matches!(
            commands.remove_component(live, missing),
            Err(WorldError::Schema(_))
        ));
        assert!(matches!(
            commands.set_component(stranger, schema, None),
            Err(WorldError::EntityNotFound(e)) if e == stranger
        ));
        assert!(matches!(
            commands.kill(stranger),
            Err(WorldError::EntityNotFound(_))
        ));
        assert!(matches!(
            commands.spawn_in(1, EntityBuilder::new()),
            Err(WorldError::UnknownArchetype(1))
        ));
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn reused_id_drops_its_kill_mark() {
        let mut entities = Entities::with_capacity(4);
        let mut buffer = CommandBuffer::default();
        let schemas = SchemaRegistry::new();

        let victim = entities.allocate();
        assert!(buffer.mark_killed(victim));
        entities.release(victim);

        let mut commands = Commands::new(&mut entities, &mut buffer, &schemas, 1);
        let fresh = commands.spawn();
        assert_eq!(fresh, victim);
        commands.kill(fresh).unwrap();
        assert!(matches!(commands.buffer.take().last(), Some(Operation::Kill { entity }) if *entity == fresh));
    }
}
