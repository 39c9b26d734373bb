//! Entity handles and id allocation
//!
//! Entities are plain integer handles. Ids freed by a kill go to a
//! graveyard and are handed out again (last freed, first reused) before the
//! counter advances, which keeps the id space dense.

use crate::ecs::ArchetypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle: an index into the world's entity table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    Vacant,
    /// Id handed out while deferring, not yet placed in any archetype.
    Reserved,
    Placed(ArchetypeId),
}

pub(crate) type ResizeObserver = Box<dyn FnMut(usize)>;

/// Id allocator plus the authoritative entity -> archetype index.
pub(crate) struct Entities {
    next: u32,
    capacity: usize,
    graveyard: Vec<Entity>,
    slots: Vec<Slot>,
    alive: usize,
    observers: Vec<ResizeObserver>,
}

impl Entities {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            next: 0,
            capacity,
            graveyard: Vec::new(),
            slots: vec![Slot::Vacant; capacity],
            alive: 0,
            observers: Vec::new(),
        }
    }

    /// Hand out an id, reusing the graveyard first.
    pub fn allocate(&mut self) -> Entity {
        let entity = match self.graveyard.pop() {
            Some(entity) => entity,
            None => {
                if self.next as usize >= self.capacity {
                    self.grow();
                }
                let entity = Entity(self.next);
                self.next += 1;
                entity
            }
        };
        self.slots[entity.0 as usize] = Slot::Reserved;
        entity
    }

    fn grow(&mut self) {
        self.capacity *= 2;
        self.slots.resize(self.capacity, Slot::Vacant);
        tracing::info!(capacity = self.capacity, "resizing entity storage");
        for observer in &mut self.observers {
            observer(self.capacity);
        }
    }

    pub fn place(&mut self, entity: Entity, archetype: ArchetypeId) {
        if let Some(slot) = self.slots.get_mut(entity.0 as usize) {
            if !matches!(slot, Slot::Placed(_)) {
                self.alive += 1;
            }
            *slot = Slot::Placed(archetype);
        }
    }

    /// Return `entity` to the graveyard.
    pub fn release(&mut self, entity: Entity) {
        let Some(slot) = self.slots.get_mut(entity.0 as usize) else {
            return;
        };
        match *slot {
            Slot::Vacant => return,
            Slot::Placed(_) => self.alive -= 1,
            Slot::Reserved => {}
        }
        *slot = Slot::Vacant;
        self.graveyard.push(entity);
    }

    pub fn location(&self, entity: Entity) -> Option<ArchetypeId> {
        match self.slots.get(entity.0 as usize)? {
            Slot::Placed(archetype) => Some(*archetype),
            _ => None,
        }
    }

    /// Alive, or reserved by a pending deferred spawn.
    pub fn is_allocated(&self, entity: Entity) -> bool {
        matches!(
            self.slots.get(entity.0 as usize),
            Some(Slot::Reserved | Slot::Placed(_))
        )
    }

    pub fn alive(&self) -> usize {
        self.alive
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn on_resize(&mut self, observer: ResizeObserver) {
        self.observers.push(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn graveyard_is_reused_last_in_first_out() {
        let mut entities = Entities::with_capacity(8);
        let a = entities.allocate();
        let b = entities.allocate();
        let c = entities.allocate();
        for e in [a, b, c] {
            entities.place(e, 0);
        }

        entities.release(a);
        entities.release(c);
        assert_eq!(entities.allocate(), c);
        assert_eq!(entities.allocate(), a);
        assert_eq!(entities.allocate(), Entity::from_raw(3));
        assert_eq!(entities.alive(), 1);
    }

    #[test]
    fn exhaustion_doubles_capacity_and_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut entities = Entities::with_capacity(2);
        let sink = Rc::clone(&seen);
        entities.on_resize(Box::new(move |capacity| sink.borrow_mut().push(capacity)));

        let first = entities.allocate();
        entities.place(first, 3);
        entities.allocate();
        entities.allocate();
        entities.allocate();
        entities.allocate();

        assert_eq!(*seen.borrow(), vec![4, 8]);
        assert_eq!(entities.capacity(), 8);
        assert_eq!(entities.location(first), Some(3));
    }

    #[test]
    fn reserved_ids_are_allocated_but_not_located() {
        let mut entities = Entities::with_capacity(4);
        let e = entities.allocate();
        assert!(entities.is_allocated(e));
        assert_eq!(entities.location(e), None);
        entities.release(e);
        assert!(!entities.is_allocated(e));
    }
}
