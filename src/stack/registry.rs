//! Id-assigning stores for in-flight events and reactions.
//!
//! Each registry hands out ids from its own counter. Ids start at 1 and are
//! never reused within a match, even after `clear`. Lookups of an absent id
//! return `None`; deciding whether that is an invariant break is the
//! caller's business.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::events::{Event, EventId, Reaction, ReactionId};

/// Something a [`Registry`] can store.
pub trait RegistryEntry {
    type Id: Copy + Eq + Ord + Hash + Debug;

    fn id_from_raw(raw: u64) -> Self::Id;

    fn assign_id(&mut self, id: Self::Id);
}

impl RegistryEntry for Event {
    type Id = EventId;

    fn id_from_raw(raw: u64) -> EventId {
        EventId::new(raw)
    }

    fn assign_id(&mut self, id: EventId) {
        self.id = id;
    }
}

impl RegistryEntry for Reaction {
    type Id = ReactionId;

    fn id_from_raw(raw: u64) -> ReactionId {
        ReactionId::new(raw)
    }

    fn assign_id(&mut self, id: ReactionId) {
        self.id = id;
    }
}

/// Generic id-assigning store.
#[derive(Clone, Debug)]
pub struct Registry<T: RegistryEntry> {
    entries: FxHashMap<T::Id, T>,
    next_id: u64,
}

pub type EventRegistry = Registry<Event>;
pub type ReactionRegistry = Registry<Reaction>;

impl<T: RegistryEntry> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            next_id: 1,
        }
    }
}

impl<T: RegistryEntry> Registry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next `register` call will assign.
    #[must_use]
    pub fn peek_next_id(&self) -> T::Id {
        T::id_from_raw(self.next_id)
    }

    /// Store an entry under a fresh id and return that id.
    pub fn register(&mut self, mut entry: T) -> T::Id {
        let id = T::id_from_raw(self.next_id);
        self.next_id += 1;
        entry.assign_id(id);
        self.entries.insert(id, entry);
        id
    }

    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: T::Id) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove an entry, handing it back. `None` if it was not registered.
    pub fn unregister(&mut self, id: T::Id) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Drop every entry. The id counter keeps running.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove every entry, returned in id order.
    pub fn drain_sorted(&mut self) -> Vec<T> {
        let mut entries: Vec<_> = self.entries.drain().collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Registered ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<T::Id> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Payload;
    use crate::events::{EventStatus, EventType};
    use crate::input::Choices;

    fn draft_event(event_type: &'static str) -> Event {
        Event {
            id: EventId::new(0),
            event_type: EventType::from_static(event_type),
            payload: Payload::new(),
            caused_by: None,
            chain_root: EventId::new(0),
            order: 0,
            status: EventStatus::Pending,
            group: None,
            prevents_group: false,
            prevention: None,
            choices: Choices::default(),
        }
    }

    #[test]
    fn test_register_assigns_increasing_ids() {
        let mut registry = EventRegistry::new();
        let a = registry.register(draft_event("A"));
        let b = registry.register(draft_event("B"));

        assert_eq!(a, EventId::new(1));
        assert_eq!(b, EventId::new(2));
        assert_eq!(registry.get(b).map(|e| e.id), Some(b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_absent_lookup_is_none() {
        let registry = EventRegistry::new();
        assert!(registry.get(EventId::new(7)).is_none());
        assert!(!registry.contains(EventId::new(7)));
    }

    #[test]
    fn test_unregister_once() {
        let mut registry = EventRegistry::new();
        let id = registry.register(draft_event("A"));

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_never_reused_after_clear() {
        let mut registry = EventRegistry::new();
        let first = registry.register(draft_event("A"));
        registry.clear();
        let second = registry.register(draft_event("B"));

        assert!(second > first);
        assert_eq!(registry.peek_next_id(), EventId::new(3));
    }

    #[test]
    fn test_drain_sorted() {
        let mut registry = EventRegistry::new();
        for name in ["A", "B", "C"] {
            registry.register(draft_event(name));
        }

        let drained: Vec<_> = registry.drain_sorted().into_iter().map(|e| e.id.raw()).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(registry.is_empty());
    }
}
