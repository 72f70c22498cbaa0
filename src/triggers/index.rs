//! Trigger storage indexed by event type.
//!
//! Rulesets keep their triggers here and answer
//! `triggers_for_event_type` from it. Wildcard triggers are kept apart and
//! returned for every type.

use rustc_hash::FxHashMap;

use crate::core::EntityId;
use crate::events::EventType;

use super::definition::{TriggerDefinition, TriggerId};

#[derive(Clone, Debug, Default)]
pub struct TriggerIndex {
    triggers: FxHashMap<TriggerId, TriggerDefinition>,
    by_event_type: FxHashMap<EventType, Vec<TriggerId>>,
    wildcard: Vec<TriggerId>,
}

impl TriggerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger, replacing any trigger with the same id.
    pub fn register(&mut self, trigger: TriggerDefinition) -> TriggerId {
        let id = trigger.id;
        self.unregister(id);

        for event_type in &trigger.event_types {
            if event_type.is_wildcard() {
                if !self.wildcard.contains(&id) {
                    self.wildcard.push(id);
                }
            } else {
                self.by_event_type
                    .entry(event_type.clone())
                    .or_default()
                    .push(id);
            }
        }

        self.triggers.insert(id, trigger);
        id
    }

    pub fn unregister(&mut self, id: TriggerId) -> Option<TriggerDefinition> {
        let trigger = self.triggers.remove(&id)?;

        self.wildcard.retain(|&tid| tid != id);
        for event_type in &trigger.event_types {
            if let Some(list) = self.by_event_type.get_mut(event_type) {
                list.retain(|&tid| tid != id);
                if list.is_empty() {
                    self.by_event_type.remove(event_type);
                }
            }
        }
        Some(trigger)
    }

    /// Remove every trigger owned by `source` (it left play).
    pub fn remove_for_source(&mut self, source: EntityId) -> usize {
        let doomed: Vec<_> = self
            .triggers
            .values()
            .filter(|t| t.source == Some(source))
            .map(|t| t.id)
            .collect();

        for id in &doomed {
            self.unregister(*id);
        }
        doomed.len()
    }

    #[must_use]
    pub fn get(&self, id: TriggerId) -> Option<&TriggerDefinition> {
        self.triggers.get(&id)
    }

    pub fn set_enabled(&mut self, id: TriggerId, enabled: bool) {
        if let Some(trigger) = self.triggers.get_mut(&id) {
            trigger.enabled = enabled;
        }
    }

    /// Enabled triggers listening for `event_type`, wildcards included, in id order.
    #[must_use]
    pub fn for_event_type(&self, event_type: &EventType) -> Vec<&TriggerDefinition> {
        let typed = self.by_event_type.get(event_type).into_iter().flatten();
        let mut ids: Vec<TriggerId> = typed.chain(self.wildcard.iter()).copied().collect();
        ids.sort_unstable();
        ids.dedup();

        ids.into_iter()
            .filter_map(|id| self.triggers.get(&id))
            .filter(|t| t.enabled)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerDefinition> {
        self.triggers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(id: u32, event_type: &'static str) -> TriggerDefinition {
        TriggerDefinition::new(TriggerId::new(id), format!("t{id}"), event_type)
    }

    #[test]
    fn test_lookup_by_type() {
        let mut index = TriggerIndex::new();
        index.register(trigger(2, "Damaged"));
        index.register(trigger(1, "Damaged"));
        index.register(trigger(3, "CardDrawn"));

        let ids: Vec<_> = index
            .for_event_type(&"Damaged".into())
            .iter()
            .map(|t| t.id.raw())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(index.for_event_type(&"Healed".into()).is_empty());
    }

    #[test]
    fn test_wildcard_joins_every_lookup() {
        let mut index = TriggerIndex::new();
        index.register(trigger(5, "*"));
        index.register(trigger(1, "Damaged"));

        let ids: Vec<_> = index
            .for_event_type(&"Damaged".into())
            .iter()
            .map(|t| t.id.raw())
            .collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(index.for_event_type(&"Anything".into()).len(), 1);
    }

    #[test]
    fn test_disabled_triggers_are_skipped() {
        let mut index = TriggerIndex::new();
        index.register(trigger(1, "Damaged"));
        index.set_enabled(TriggerId::new(1), false);

        assert!(index.for_event_type(&"Damaged".into()).is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_unregister_cleans_index() {
        let mut index = TriggerIndex::new();
        index.register(trigger(1, "Damaged").also_on("*"));

        assert!(index.unregister(TriggerId::new(1)).is_some());
        assert!(index.unregister(TriggerId::new(1)).is_none());
        assert!(index.for_event_type(&"Damaged".into()).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_for_source() {
        let mut index = TriggerIndex::new();
        index.register(trigger(1, "Damaged").with_source(EntityId::new(7)));
        index.register(trigger(2, "Damaged").with_source(EntityId::new(7)));
        index.register(trigger(3, "Damaged").with_source(EntityId::new(8)));

        assert_eq!(index.remove_for_source(EntityId::new(7)), 2);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_register_same_id_replaces() {
        let mut index = TriggerIndex::new();
        index.register(trigger(1, "Damaged"));
        index.register(trigger(1, "Healed"));

        assert!(index.for_event_type(&"Damaged".into()).is_empty());
        assert_eq!(index.for_event_type(&"Healed".into()).len(), 1);
    }
}
