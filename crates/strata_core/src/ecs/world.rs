// world.rs - Entity lifecycle, structural changes and the step driver
//
// The world owns every registry. Structural changes requested while a step
// is running are buffered and replayed once all stages have finished; the
// same calls made outside a step apply directly.

use crate::config::{ConfigError, WorldConfig, DEFAULT_CAPACITY};
use crate::ecs::command::CommandBuffer;
use crate::ecs::entity::Entities;
use crate::ecs::graph::ArchetypeGraph;
use crate::ecs::query::QueryRegistry;
use crate::ecs::system_registry::SystemRegistry;
use crate::ecs::topic::TopicRegistry;
use crate::ecs::{
    Archetype, ArchetypeId, Column, ColumnError, Commands, ComponentAdded, ComponentRemoved,
    ComponentUpdated, ComponentValue, Entity, EntityBuilder, EntityKilled, EntitySpawned,
    FieldType, LifecycleTopics, Operation, Query, QueryHandle, SchemaDef, SchemaError, SchemaId,
    SchemaRegistry, Stage, StorageError, SystemDescriptor, SystemHandle, SystemRegistrationError,
    Topic, TopicHandle, EMPTY_ARCHETYPE,
};
use crate::metrics::{self, WorldMetrics};
use crate::time::{delta_time, StepClock, StepContext};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Rows handed to one rayon task by `par_for_each_field`.
const PAR_CHUNK_ROWS: usize = 1024;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity {0} is not alive")]
    EntityNotFound(Entity),

    #[error("archetype {0} does not exist")]
    UnknownArchetype(ArchetypeId),

    #[error("query {0} is not registered")]
    UnknownQuery(QueryHandle),

    #[error("topic #{0} is not registered with this world")]
    UnknownTopic(usize),

    #[error("the world is already stepping")]
    AlreadyStepping,

    #[error("system '{name}' failed")]
    SystemFailed {
        name: String,
        #[source]
        source: Box<WorldError>,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Column(#[from] ColumnError),

    #[error(transparent)]
    System(#[from] SystemRegistrationError),
}

pub type WorldResult<T> = Result<T, WorldError>;

/// The main ECS world: schemas, archetypes, entities, queries, topics and
/// systems, plus the clock that drives them.
pub struct World {
    schemas: SchemaRegistry,
    graph: ArchetypeGraph,
    entities: Entities,
    queries: QueryRegistry,
    commands: CommandBuffer,
    topics: TopicRegistry,
    lifecycle: Option<LifecycleTopics>,
    systems: SystemRegistry,
    clock: StepClock,
    metrics: WorldMetrics,
    stepping: bool,
    /// Set while the command log is replayed; lifecycle events are staged.
    replaying: bool,
}

impl World {
    /// Create a new empty world with the default entity capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            schemas: SchemaRegistry::new(),
            graph: ArchetypeGraph::new(),
            entities: Entities::with_capacity(capacity),
            queries: QueryRegistry::default(),
            commands: CommandBuffer::default(),
            topics: TopicRegistry::default(),
            lifecycle: None,
            systems: SystemRegistry::default(),
            clock: StepClock::new(),
            metrics: WorldMetrics::default(),
            stepping: false,
            replaying: false,
        }
    }

    /// Build a world from a loaded configuration, registering its schemas
    /// in order.
    pub fn with_config(config: WorldConfig) -> Result<Self, ConfigError> {
        let mut world = Self::with_capacity(config.initial_capacity);
        for def in config.components {
            world.schemas.register(def)?;
        }
        if config.lifecycle_events {
            world.enable_lifecycle_events();
        }
        tracing::info!(
            capacity = world.capacity(),
            schemas = world.schemas.len(),
            lifecycle_events = config.lifecycle_events,
            "world configured"
        );
        Ok(world)
    }

    // ------------------------------------------------------------------
    // Schemas
    // ------------------------------------------------------------------

    pub fn register_schema(&mut self, def: SchemaDef) -> WorldResult<SchemaId> {
        Ok(self.schemas.register(def)?)
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn schema_id(&self, name: &str) -> Option<SchemaId> {
        self.schemas.id_of(name)
    }

    // ------------------------------------------------------------------
    // Archetypes
    // ------------------------------------------------------------------

    /// Resolve (creating as needed) the archetype holding exactly `schemas`,
    /// by walking single-component transitions from the empty archetype.
    pub fn create_archetype(&mut self, schemas: &[SchemaId]) -> WorldResult<ArchetypeId> {
        let before = self.graph.len();
        let mut current = EMPTY_ARCHETYPE;
        for &schema in schemas {
            let present = self
                .graph
                .get(current)
                .is_some_and(|archetype| archetype.has_component(schema));
            if present {
                continue;
            }
            current = self
                .graph
                .transition(current, schema, &self.schemas, &mut self.queries)?;
        }
        self.note_archetypes(before);
        Ok(current)
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.graph.get(id)
    }

    pub fn archetype_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.graph.get_mut(id)
    }

    /// Every archetype in creation order, the empty one first.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.graph.iter()
    }

    pub fn archetype_count(&self) -> usize {
        self.graph.len()
    }

    pub fn archetype_of(&self, entity: Entity) -> Option<ArchetypeId> {
        self.entities.location(entity)
    }

    fn note_archetypes(&mut self, before: usize) {
        let created = self.graph.len() - before;
        self.metrics
            .counters
            .increment(metrics::ARCHETYPES_CREATED, created);
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Spawn an entity with no components.
    pub fn spawn(&mut self) -> WorldResult<Entity> {
        self.spawn_in(EMPTY_ARCHETYPE, EntityBuilder::new())
    }

    /// Spawn into an existing archetype. Components of the archetype missing
    /// from `values` take their schema defaults.
    ///
    /// While deferred the id is reserved and returned right away; the entity
    /// becomes visible when the command log is replayed.
    pub fn spawn_in(&mut self, archetype: ArchetypeId, values: EntityBuilder) -> WorldResult<Entity> {
        if self.graph.get(archetype).is_none() {
            return Err(WorldError::UnknownArchetype(archetype));
        }
        let entity = self.entities.allocate();
        self.commands.revive(entity);
        if self.commands.is_deferred() {
            self.commands.push(Operation::Spawn {
                entity,
                archetype,
                values,
            });
            return Ok(entity);
        }
        self.place_new(entity, archetype, &values)?;
        Ok(entity)
    }

    /// Spawn into the archetype made of exactly the builder's components.
    pub fn spawn_with(&mut self, values: EntityBuilder) -> WorldResult<Entity> {
        let schemas: Vec<SchemaId> = values.schemas().collect();
        let archetype = self.create_archetype(&schemas)?;
        self.spawn_in(archetype, values)
    }

    /// Store a freshly allocated entity; the id is released again on failure.
    fn place_new(
        &mut self,
        entity: Entity,
        archetype: ArchetypeId,
        values: &EntityBuilder,
    ) -> WorldResult<()> {
        let stored = match self.graph.get_mut(archetype) {
            Some(table) => table.add_entity(entity, values).map_err(WorldError::from),
            None => Err(WorldError::UnknownArchetype(archetype)),
        };
        if let Err(err) = stored {
            self.entities.release(entity);
            return Err(err);
        }
        self.entities.place(entity, archetype);
        self.metrics
            .counters
            .increment(metrics::ENTITIES_SPAWNED, 1);
        tracing::trace!(%entity, archetype, "spawned entity");
        self.publish(|topics| topics.spawned, || EntitySpawned { entity });
        Ok(())
    }

    /// Kill `entity`, freeing its id for reuse.
    ///
    /// Killing the same entity twice within one tick is a no-op; killing an
    /// entity that is not alive otherwise is `EntityNotFound`.
    pub fn kill(&mut self, entity: Entity) -> WorldResult<()> {
        if !self.entities.is_allocated(entity) {
            if self.stepping && self.commands.was_killed(entity) {
                tracing::trace!(%entity, "entity already killed this tick");
                return Ok(());
            }
            return Err(WorldError::EntityNotFound(entity));
        }
        if self.commands.is_deferred() {
            self.commands.kill(entity);
            return Ok(());
        }
        if self.stepping && !self.commands.mark_killed(entity) {
            tracing::trace!(%entity, "entity already killed this tick");
            return Ok(());
        }
        self.despawn(entity)
    }

    fn despawn(&mut self, entity: Entity) -> WorldResult<()> {
        let archetype = self
            .entities
            .location(entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        self.graph
            .get_mut(archetype)
            .ok_or(WorldError::UnknownArchetype(archetype))?
            .remove_entity(entity)?;
        self.entities.release(entity);
        self.metrics
            .counters
            .increment(metrics::ENTITIES_KILLED, 1);
        tracing::trace!(%entity, archetype, "killed entity");
        self.publish(|topics| topics.killed, || EntityKilled { entity });
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.location(entity).is_some()
    }

    /// Entities currently stored in some archetype.
    pub fn entity_count(&self) -> usize {
        self.entities.alive()
    }

    /// Entity slots available before the next resize.
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Register a callback invoked with the new capacity whenever entity
    /// storage grows.
    pub fn on_resize(&mut self, observer: impl FnMut(usize) + 'static) {
        self.entities.on_resize(Box::new(observer));
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach `schema` to `entity`, or replace its value if already present.
    /// `None` means the schema defaults.
    pub fn set_component(
        &mut self,
        entity: Entity,
        schema: SchemaId,
        value: Option<ComponentValue>,
    ) -> WorldResult<()> {
        self.schemas.schema(schema)?;
        if self.commands.is_deferred() {
            if !self.entities.is_allocated(entity) {
                return Err(WorldError::EntityNotFound(entity));
            }
            self.commands.push(Operation::SetComponent {
                entity,
                schema,
                value,
            });
            return Ok(());
        }
        self.attach(entity, schema, value)
    }

    /// Detach `schema` from `entity`. Detaching an absent component is a no-op.
    pub fn remove_component(&mut self, entity: Entity, schema: SchemaId) -> WorldResult<()> {
        self.schemas.schema(schema)?;
        if self.commands.is_deferred() {
            if !self.entities.is_allocated(entity) {
                return Err(WorldError::EntityNotFound(entity));
            }
            self.commands
                .push(Operation::RemoveComponent { entity, schema });
            return Ok(());
        }
        self.detach(entity, schema)
    }

    fn attach(
        &mut self,
        entity: Entity,
        schema: SchemaId,
        value: Option<ComponentValue>,
    ) -> WorldResult<()> {
        let current = self
            .entities
            .location(entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        let resolved = self.schemas.schema(schema)?.resolve(value.as_ref())?;
        let observing = self.lifecycle.is_some();
        let table = self
            .graph
            .get_mut(current)
            .ok_or(WorldError::UnknownArchetype(current))?;

        if table.has_component(schema) {
            let Some(values) = resolved else {
                tracing::trace!(%entity, %schema, "tag already present");
                return Ok(());
            };
            let old = if observing { Some(table.row(entity, schema)?) } else { None };
            table.write_row(entity, schema, values)?;
            if let Some(old) = old {
                let new = table.row(entity, schema)?;
                self.publish(|topics| topics.updated, || ComponentUpdated {
                    entity,
                    schema,
                    old,
                    new,
                });
            }
            return Ok(());
        }

        let before = self.graph.len();
        let target = self
            .graph
            .transition(current, schema, &self.schemas, &mut self.queries)?;
        self.note_archetypes(before);

        let (from, to) = self
            .graph
            .pair_mut(current, target)
            .ok_or(WorldError::UnknownArchetype(target))?;
        if !Archetype::move_entity(from, to, entity, resolved.map(|values| (schema, values)))? {
            return Err(StorageError::EntityNotInArchetype {
                entity,
                archetype: current,
            }
            .into());
        }
        let added = if observing { Some(to.row(entity, schema)?) } else { None };
        self.entities.place(entity, target);
        tracing::trace!(%entity, %schema, from = current, to = target, "attached component");

        if let Some(value) = added {
            self.publish(|topics| topics.added, || ComponentAdded {
                entity,
                schema,
                value,
            });
        }
        Ok(())
    }

    fn detach(&mut self, entity: Entity, schema: SchemaId) -> WorldResult<()> {
        let current = self
            .entities
            .location(entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        let table = self
            .graph
            .get(current)
            .ok_or(WorldError::UnknownArchetype(current))?;
        if !table.has_component(schema) {
            tracing::trace!(%entity, %schema, "component not present");
            return Ok(());
        }
        let old_value = if self.lifecycle.is_some() {
            Some(table.row(entity, schema)?)
        } else {
            None
        };

        let before = self.graph.len();
        let target = self
            .graph
            .transition(current, schema, &self.schemas, &mut self.queries)?;
        self.note_archetypes(before);

        let (from, to) = self
            .graph
            .pair_mut(current, target)
            .ok_or(WorldError::UnknownArchetype(target))?;
        if !Archetype::move_entity(from, to, entity, None)? {
            return Err(StorageError::EntityNotInArchetype {
                entity,
                archetype: current,
            }
            .into());
        }
        self.entities.place(entity, target);
        tracing::trace!(%entity, %schema, from = current, to = target, "detached component");

        if let Some(old_value) = old_value {
            self.publish(|topics| topics.removed, || ComponentRemoved {
                entity,
                schema,
                old_value,
            });
        }
        Ok(())
    }

    pub fn has_component(&self, entity: Entity, schema: SchemaId) -> bool {
        self.archetype_of(entity)
            .and_then(|id| self.graph.get(id))
            .is_some_and(|archetype| archetype.has_component(schema))
    }

    /// Copy of the current value; tags read as an empty value.
    pub fn get(&self, entity: Entity, schema: SchemaId) -> Option<ComponentValue> {
        let archetype = self.graph.get(self.archetype_of(entity)?)?;
        archetype.row(entity, schema).ok()
    }

    /// Read one row of `schema` from a specific archetype.
    pub fn row(
        &self,
        archetype: ArchetypeId,
        entity: Entity,
        schema: SchemaId,
    ) -> WorldResult<ComponentValue> {
        let table = self
            .graph
            .get(archetype)
            .ok_or(WorldError::UnknownArchetype(archetype))?;
        Ok(table.row(entity, schema)?)
    }

    pub fn column(&self, archetype: ArchetypeId, schema: SchemaId) -> Option<&Column> {
        self.graph.get(archetype)?.column(schema)
    }

    pub fn column_mut(&mut self, archetype: ArchetypeId, schema: SchemaId) -> Option<&mut Column> {
        self.graph.get_mut(archetype)?.column_mut(schema)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Register a query over every archetype containing all of `schemas`.
    /// Registering the same set twice returns the same handle.
    pub fn register_query(&mut self, schemas: &[SchemaId]) -> WorldResult<QueryHandle> {
        for &schema in schemas {
            self.schemas.schema(schema)?;
        }
        Ok(self.queries.register(schemas, self.graph.iter()))
    }

    pub fn query(&self, handle: QueryHandle) -> Option<&Query> {
        self.queries.get(handle)
    }

    /// Matching archetypes, in the order they were created.
    pub fn matched(
        &self,
        handle: QueryHandle,
    ) -> WorldResult<impl Iterator<Item = &Archetype> + '_> {
        let query = self
            .queries
            .get(handle)
            .ok_or(WorldError::UnknownQuery(handle))?;
        Ok(query
            .archetypes()
            .iter()
            .filter_map(move |&id| self.graph.get(id)))
    }

    /// Entities across every matching archetype.
    pub fn query_count(&self, handle: QueryHandle) -> WorldResult<usize> {
        Ok(self.matched(handle)?.map(Archetype::len).sum())
    }

    /// Visit every matching archetype with mutable column access.
    ///
    /// Structural changes go through `Commands` and are applied on the next
    /// replay, so rows never move under the callback.
    pub fn for_each_match<F>(&mut self, handle: QueryHandle, mut f: F) -> WorldResult<()>
    where
        F: FnMut(&mut Archetype, &mut Commands<'_>) -> WorldResult<()>,
    {
        let Self {
            schemas,
            graph,
            entities,
            queries,
            commands,
            ..
        } = self;
        let query = queries
            .get(handle)
            .ok_or(WorldError::UnknownQuery(handle))?;
        let mut commands = Commands::new(entities, commands, schemas, graph.len());
        for &id in query.archetypes() {
            if let Some(archetype) = graph.get_mut(id) {
                f(archetype, &mut commands)?;
            }
        }
        Ok(())
    }

    /// Update one field of one component across every matching archetype,
    /// in parallel chunks.
    pub fn par_for_each_field<T, F>(
        &mut self,
        handle: QueryHandle,
        schema: SchemaId,
        field: &str,
        f: F,
    ) -> WorldResult<()>
    where
        T: FieldType,
        F: Fn(&mut T) + Send + Sync,
    {
        let query = self
            .queries
            .get(handle)
            .ok_or(WorldError::UnknownQuery(handle))?;
        if !query.schemas().contains(&schema) {
            return Err(WorldError::Schema(SchemaError::Unknown(schema)));
        }
        for &id in query.archetypes() {
            let Some(column) = self.graph.get_mut(id).and_then(|a| a.column_mut(schema)) else {
                continue;
            };
            column
                .field_mut::<T>(field)?
                .par_chunks_mut(PAR_CHUNK_ROWS)
                .for_each(|chunk| chunk.iter_mut().for_each(&f));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deferral
    // ------------------------------------------------------------------

    /// Queue structural changes without touching storage until the next replay.
    pub fn commands(&mut self) -> Commands<'_> {
        Commands::new(
            &mut self.entities,
            &mut self.commands,
            &self.schemas,
            self.graph.len(),
        )
    }

    pub fn is_deferred(&self) -> bool {
        self.commands.is_deferred()
    }

    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Operations waiting for the next replay.
    pub fn pending_operations(&self) -> usize {
        self.commands.len()
    }

    /// Run `f` with deferral switched off, restoring the previous mode after.
    pub fn immediately<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> R {
        let deferred = self.commands.is_deferred();
        self.commands.set_deferred(false);
        let result = f(self);
        self.commands.set_deferred(deferred);
        result
    }

    /// Replay the command log now.
    pub fn apply_deferred(&mut self) -> WorldResult<()> {
        let deferred = self.commands.is_deferred();
        self.commands.set_deferred(false);
        let result = self.replay();
        self.commands.set_deferred(deferred);
        result
    }

    fn replay(&mut self) -> WorldResult<()> {
        let mut operations = self.commands.take().into_iter();
        let mut applied = 0;
        let mut result = Ok(());

        self.replaying = true;
        for operation in operations.by_ref() {
            tracing::trace!(?operation, "replaying operation");
            if let Err(err) = self.apply(operation) {
                result = Err(err);
                break;
            }
            applied += 1;
        }
        self.replaying = false;

        let dropped = self.release_reserved(operations);
        if dropped > 0 {
            tracing::warn!(dropped, "discarded operations after a failed replay");
        }
        self.metrics
            .counters
            .increment(metrics::COMMANDS_REPLAYED, applied);
        result
    }

    fn apply(&mut self, operation: Operation) -> WorldResult<()> {
        match operation {
            Operation::Spawn {
                entity,
                archetype,
                values,
            } => self.place_new(entity, archetype, &values),
            Operation::Kill { entity } => self.despawn(entity),
            Operation::SetComponent {
                entity,
                schema,
                value,
            } => self.attach(entity, schema, value),
            Operation::RemoveComponent { entity, schema } => self.detach(entity, schema),
        }
    }

    /// Drop operations that will never run, freeing ids reserved by spawns.
    fn release_reserved(&mut self, operations: impl IntoIterator<Item = Operation>) -> usize {
        let mut dropped = 0;
        for operation in operations {
            if let Operation::Spawn { entity, .. } = operation {
                self.entities.release(entity);
            }
            dropped += 1;
        }
        dropped
    }

    // ------------------------------------------------------------------
    // Topics
    // ------------------------------------------------------------------

    pub fn register_topic<E: 'static>(&mut self, topic: Topic<E>) -> TopicHandle<E> {
        self.topics.register(topic)
    }

    pub fn topic<E: 'static>(&self, handle: TopicHandle<E>) -> Option<&Topic<E>> {
        self.topics.get(handle)
    }

    pub fn topic_mut<E: 'static>(&mut self, handle: TopicHandle<E>) -> Option<&mut Topic<E>> {
        self.topics.get_mut(handle)
    }

    /// Emit for the next tick.
    pub fn emit<E: 'static>(&mut self, handle: TopicHandle<E>, payload: E) -> WorldResult<()> {
        self.topics
            .get_mut(handle)
            .ok_or(WorldError::UnknownTopic(handle.index()))?
            .emit(payload);
        Ok(())
    }

    /// Emit for readers later in the current tick.
    pub fn emit_immediate<E: 'static>(&mut self, handle: TopicHandle<E>, payload: E) -> WorldResult<()> {
        self.topics
            .get_mut(handle)
            .ok_or(WorldError::UnknownTopic(handle.index()))?
            .emit_immediate(payload);
        Ok(())
    }

    /// Register the entity and component lifecycle topics. Calling this
    /// again returns the same handles.
    pub fn enable_lifecycle_events(&mut self) -> LifecycleTopics {
        if let Some(lifecycle) = self.lifecycle {
            return lifecycle;
        }
        let lifecycle = LifecycleTopics {
            spawned: self.topics.register(Topic::new("entity-spawned")),
            killed: self.topics.register(Topic::new("entity-killed")),
            added: self.topics.register(Topic::new("component-added")),
            removed: self.topics.register(Topic::new("component-removed")),
            updated: self.topics.register(Topic::new("component-updated")),
        };
        self.lifecycle = Some(lifecycle);
        lifecycle
    }

    pub fn lifecycle(&self) -> Option<LifecycleTopics> {
        self.lifecycle
    }

    /// Publish a lifecycle event. Changes applied by the replay are staged
    /// for the next tick, since the flush that follows would otherwise drop
    /// them; direct changes are readable right away.
    fn publish<E: 'static>(
        &mut self,
        select: impl FnOnce(&LifecycleTopics) -> TopicHandle<E>,
        payload: impl FnOnce() -> E,
    ) {
        let Some(lifecycle) = self.lifecycle.as_ref() else {
            return;
        };
        let handle = select(lifecycle);
        let replaying = self.replaying;
        if let Some(topic) = self.topics.get_mut(handle) {
            if replaying {
                topic.emit(payload());
            } else {
                topic.emit_immediate(payload());
            }
        }
    }

    // ------------------------------------------------------------------
    // Systems and stepping
    // ------------------------------------------------------------------

    pub fn register_system<F>(
        &mut self,
        descriptor: SystemDescriptor,
        system: F,
    ) -> Result<SystemHandle, SystemRegistrationError>
    where
        F: FnMut(&mut World, &StepContext) -> WorldResult<()> + 'static,
    {
        if self.stepping {
            return Err(SystemRegistrationError::WorldRunning {
                name: descriptor.name().to_string(),
            });
        }
        self.systems.register(descriptor, Box::new(system))
    }

    /// Descriptor of a registered system; unavailable while stepping.
    pub fn system(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems.descriptor(handle)
    }

    pub fn system_handle(&self, name: &str) -> Option<SystemHandle> {
        self.systems.handle_of(name)
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Step using the wall-clock time since the previous `step`.
    pub fn step(&mut self) -> WorldResult<()> {
        let delta = self.clock.wall_delta();
        self.step_with(delta)
    }

    /// Run one tick with an explicit delta.
    ///
    /// Stages run in order with deferral on (`OnFirstStep` only on tick 0),
    /// then the command log is replayed, every topic is flushed and the
    /// per-tick kill set is reset. If a system or the replay fails, pending
    /// operations are dropped, topics are left unflushed and the error is
    /// returned.
    pub fn step_with(&mut self, delta: Duration) -> WorldResult<()> {
        if self.stepping {
            return Err(WorldError::AlreadyStepping);
        }
        self.metrics.tick_timer.begin();
        let (tick, elapsed) = self.clock.advance(delta);
        let mut systems = std::mem::take(&mut self.systems);
        self.stepping = true;
        self.commands.set_deferred(true);

        let mut outcome = Ok(());
        for stage in Stage::ALL {
            if stage == Stage::OnFirstStep && tick != 0 {
                continue;
            }
            let context = StepContext {
                stage,
                tick,
                delta,
                delta_time: delta_time(delta),
                elapsed,
            };
            outcome = self.run_stage(&mut systems, &context);
            if outcome.is_err() {
                break;
            }
        }

        self.systems = systems;
        self.stepping = false;
        self.commands.set_deferred(false);

        let result = match outcome {
            Ok(()) => self.replay(),
            Err(err) => {
                let pending = self.commands.take();
                let dropped = self.release_reserved(pending);
                tracing::warn!(tick, dropped, error = %err, "step aborted");
                Err(err)
            }
        };
        if result.is_ok() {
            self.topics.flush_all();
        }
        self.commands.reset_killed();
        self.metrics.tick_timer.end();
        result
    }

    fn run_stage(&mut self, systems: &mut SystemRegistry, context: &StepContext) -> WorldResult<()> {
        let stage_start = Instant::now();
        for system in systems.stage_mut(context.stage) {
            let start = Instant::now();
            let outcome = (system.run)(self, context);
            self.metrics
                .profiler
                .record(system.descriptor.name(), start.elapsed());
            if let Err(source) = outcome {
                tracing::warn!(
                    system = %system.descriptor.name(),
                    handle = %system.handle,
                    stage = %context.stage,
                    error = %source,
                    "system failed"
                );
                return Err(WorldError::SystemFailed {
                    name: system.descriptor.name().to_string(),
                    source: Box::new(source),
                });
            }
        }
        self.metrics
            .profiler
            .record(context.stage.name(), stage_start.elapsed());
        Ok(())
    }

    /// Steps started so far.
    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn metrics(&self) -> &WorldMetrics {
        &self.metrics
    }

    /// Clear and unregister every topic, drop pending operations and
    /// release query match lists.
    pub fn teardown(&mut self) {
        let pending = self.commands.take();
        self.release_reserved(pending);
        self.commands.clear();
        self.topics.teardown();
        self.lifecycle = None;
        self.queries.clear_matches();
        tracing::debug!(
            archetypes = self.graph.len(),
            entities = self.entities.alive(),
            "world torn down"
        );
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
