//! Double-buffered event topics
//!
//! Producers write to `staged`; consumers read `ready`. Once per tick the
//! world flushes every registered topic: `ready` is cleared and the staged
//! events move over in emission order. An event therefore becomes visible
//! one tick after it was emitted, unless it was emitted immediately, in
//! which case it lands in `ready` straight away.

use once_cell::sync::Lazy;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::time::{Duration, Instant};

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Time elapsed since the first event timestamp was taken in this process.
pub fn since_epoch() -> Duration {
    EPOCH.elapsed()
}

/// An emitted payload plus its creation timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct TopicEvent<E> {
    pub payload: E,
    pub created_at: Duration,
}

impl<E> Deref for TopicEvent<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.payload
    }
}

pub struct Topic<E> {
    name: String,
    staged: Vec<TopicEvent<E>>,
    ready: Vec<TopicEvent<E>>,
    registered: bool,
}

impl<E> Topic<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            staged: Vec::new(),
            ready: Vec::new(),
            registered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emit for the next tick.
    pub fn emit(&mut self, payload: E) {
        self.push(payload, false);
    }

    /// Emit straight into `ready`, visible to everything that runs later
    /// in the current tick.
    pub fn emit_immediate(&mut self, payload: E) {
        self.push(payload, true);
    }

    fn push(&mut self, payload: E, immediate: bool) {
        if !self.registered {
            tracing::warn!(topic = %self.name, immediate, "emitting to unregistered topic");
        }
        let event = TopicEvent {
            payload,
            created_at: since_epoch(),
        };
        if immediate {
            self.ready.push(event);
        } else {
            self.staged.push(event);
        }
    }

    /// Drop `ready`, then move every staged event into it.
    pub fn flush(&mut self) {
        self.ready.clear();
        std::mem::swap(&mut self.ready, &mut self.staged);
    }

    pub fn clear(&mut self) {
        self.staged.clear();
        self.ready.clear();
    }

    /// Events readable this tick.
    pub fn iter(&self) -> impl Iterator<Item = &TopicEvent<E>> {
        self.ready.iter()
    }

    pub fn ready(&self) -> &[TopicEvent<E>] {
        &self.ready
    }

    pub fn staged(&self) -> &[TopicEvent<E>] {
        &self.staged
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl<E> fmt::Debug for Topic<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("staged", &self.staged.len())
            .field("ready", &self.ready.len())
            .field("registered", &self.registered)
            .finish()
    }
}

/// Typed handle to a topic owned by a world.
pub struct TopicHandle<E> {
    index: usize,
    _marker: PhantomData<fn() -> E>,
}

impl<E> TopicHandle<E> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<E> Clone for TopicHandle<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for TopicHandle<E> {}

impl<E> PartialEq for TopicHandle<E> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<E> Eq for TopicHandle<E> {}

impl<E> fmt::Debug for TopicHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicHandle({})", self.index)
    }
}

/// Type-erased view used to flush every topic regardless of payload type.
trait ErasedTopic {
    fn flush(&mut self);
    fn teardown(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: 'static> ErasedTopic for Topic<E> {
    fn flush(&mut self) {
        Topic::flush(self);
    }

    fn teardown(&mut self) {
        self.clear();
        self.registered = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
pub(crate) struct TopicRegistry {
    topics: Vec<Box<dyn ErasedTopic>>,
}

impl TopicRegistry {
    pub fn register<E: 'static>(&mut self, mut topic: Topic<E>) -> TopicHandle<E> {
        topic.registered = true;
        tracing::debug!(topic = %topic.name, "registered topic");
        self.topics.push(Box::new(topic));
        TopicHandle {
            index: self.topics.len() - 1,
            _marker: PhantomData,
        }
    }

    pub fn get<E: 'static>(&self, handle: TopicHandle<E>) -> Option<&Topic<E>> {
        self.topics.get(handle.index)?.as_any().downcast_ref()
    }

    pub fn get_mut<E: 'static>(&mut self, handle: TopicHandle<E>) -> Option<&mut Topic<E>> {
        self.topics.get_mut(handle.index)?.as_any_mut().downcast_mut()
    }

    pub fn flush_all(&mut self) {
        for topic in &mut self.topics {
            topic.flush();
        }
    }

    /// Clear and unregister every topic.
    pub fn teardown(&mut self) {
        for topic in &mut self.topics {
            topic.teardown();
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(topic: &Topic<&'static str>) -> Vec<&'static str> {
        topic.iter().map(|event| event.payload).collect()
    }

    #[test]
    fn staged_events_surface_after_one_flush() {
        let mut registry = TopicRegistry::default();
        let handle = registry.register(Topic::<&'static str>::new("log"));

        let topic = registry.get_mut(handle).unwrap();
        topic.emit("a");
        topic.emit("b");
        assert!(payloads(topic).is_empty());

        registry.flush_all();
        assert_eq!(payloads(registry.get(handle).unwrap()), vec!["a", "b"]);

        registry.flush_all();
        assert!(payloads(registry.get(handle).unwrap()).is_empty());
    }

    #[test]
    fn immediate_events_skip_staging_and_expire_on_flush() {
        let mut topic = Topic::new("log");
        topic.registered = true;
        topic.emit("later");
        topic.emit_immediate("now");
        assert_eq!(payloads(&topic), vec!["now"]);

        topic.flush();
        assert_eq!(payloads(&topic), vec!["later"]);
        assert!(topic.staged().is_empty());
    }

    #[test]
    fn events_are_timestamped_in_order() {
        let mut topic = Topic::new("numbers");
        topic.emit_immediate(1);
        topic.emit_immediate(2);
        let ready = topic.ready();
        assert!(ready[0].created_at <= ready[1].created_at);
        assert_eq!(*ready[1], 2);
    }

    #[test]
    fn teardown_unregisters() {
        let mut registry = TopicRegistry::default();
        let handle = registry.register(Topic::<u8>::new("bytes"));
        registry.get_mut(handle).unwrap().emit(1);
        registry.teardown();

        let topic = registry.get(handle).unwrap();
        assert!(!topic.is_registered());
        assert!(topic.staged().is_empty());
        assert_eq!(registry.len(), 1);
    }
}
