// events.rs - Structural lifecycle notifications
//
// Published on opt-in topics by the world whenever an entity is spawned or
// killed, or a component is attached, replaced or detached.

use crate::ecs::{ComponentValue, Entity, SchemaId, TopicHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySpawned {
    pub entity: Entity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityKilled {
    pub entity: Entity,
}

/// A component was attached; `value` is what ended up stored (empty for tags).
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentAdded {
    pub entity: Entity,
    pub schema: SchemaId,
    pub value: ComponentValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentRemoved {
    pub entity: Entity,
    pub schema: SchemaId,
    pub old_value: ComponentValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentUpdated {
    pub entity: Entity,
    pub schema: SchemaId,
    pub old: ComponentValue,
    pub new: ComponentValue,
}

/// Handles of the lifecycle topics registered by
/// `World::enable_lifecycle_events`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleTopics {
    pub spawned: TopicHandle<EntitySpawned>,
    pub killed: TopicHandle<EntityKilled>,
    pub added: TopicHandle<ComponentAdded>,
    pub removed: TopicHandle<ComponentRemoved>,
    pub updated: TopicHandle<ComponentUpdated>,
}
