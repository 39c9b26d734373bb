//! Entity Component System core types.
//!
//! Entities with the same exact set of components share an archetype, a
//! table holding one structure-of-arrays column per data component.
//! Archetypes are linked by single-component transitions, queries cache the
//! archetypes they match, and structural changes made while the world steps
//! are buffered until every stage has run.

mod archetype;
mod builder;
mod command;
mod component;
mod entity;
mod events;
mod graph;
mod query;
mod stage;
pub mod storage;
mod system_descriptor;
mod system_handle;
mod system_registration_error;
mod system_registry;
mod topic;
mod value;
mod world;

pub use archetype::{Archetype, ArchetypeId, StorageError, EMPTY_ARCHETYPE};
pub use builder::EntityBuilder;
pub use command::{Commands, Operation};
pub use component::{
    ComponentSchema, FieldDef, FieldMeta, SchemaDef, SchemaError, SchemaId, SchemaKind,
    SchemaRegistry,
};
pub use entity::Entity;
pub use events::{
    ComponentAdded, ComponentRemoved, ComponentUpdated, EntityKilled, EntitySpawned,
    LifecycleTopics,
};
pub use query::{Query, QueryHandle};
pub use stage::Stage;
pub use storage::{BitSet, Column, ColumnError, SparseKey, SparseSet};
pub use system_descriptor::SystemDescriptor;
pub use system_handle::SystemHandle;
pub use system_registration_error::SystemRegistrationError;
pub use system_registry::SystemFn;
pub use topic::{since_epoch, Topic, TopicEvent, TopicHandle};
pub use value::{ComponentValue, FieldData, FieldKind, FieldType, Value};
pub use world::{World, WorldError, WorldResult};

/// Spawn an entity from a list of components.
///
/// `schema => value` attaches a data component with the given value; a bare
/// `schema` attaches it with its defaults (the only form for tags).
///
/// ```ignore
/// let e = spawn!(world, position => ComponentValue::new().with("x", 1.0f32), frozen)?;
/// ```
#[macro_export]
macro_rules! spawn {
    ($world:expr $(, $schema:expr $(=> $value:expr)?)+ $(,)?) => {{
        let builder = $crate::ecs::EntityBuilder::new();
        $(
            let builder = $crate::__spawn_component!(builder, $schema $(=> $value)?);
        )+
        $world.spawn_with(builder)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __spawn_component {
    ($builder:ident, $schema:expr => $value:expr) => {
        $builder.with($schema, $value)
    };
    ($builder:ident, $schema:expr) => {
        $builder.with_default($schema)
    };
}
