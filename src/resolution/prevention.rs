//! Prevention and group atomicity.
//!
//! Events emitted together may share a group. When a member of a group is
//! prevented and any member of that group carries `prevents_group`, every
//! other still-pending member is prevented in the same step, in event-id
//! order, before any of them can pop.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::ConstraintViolation;
use crate::events::{Event, EventId, EventStatus, GroupId, PreventionCause};
use crate::stack::EventRegistry;

#[derive(Clone, Debug, Default)]
pub struct PreventionTracker {
    members: FxHashMap<GroupId, BTreeSet<EventId>>,
    /// Groups with at least one `prevents_group` member, seen at registration.
    propagating: FxHashSet<GroupId>,
    next_group: u64,
}

impl PreventionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh match-unique group id.
    pub fn allocate_group(&mut self) -> GroupId {
        self.next_group += 1;
        GroupId::new(self.next_group)
    }

    /// Record a newly registered event's group membership.
    pub fn track(&mut self, event: &Event) {
        if let Some(group) = event.group {
            self.members.entry(group).or_default().insert(event.id);
            if event.prevents_group {
                self.propagating.insert(group);
            }
        }
    }

    /// Forget an event that left the registry.
    pub fn untrack(&mut self, event: &Event) {
        let Some(group) = event.group else {
            return;
        };
        let now_empty = match self.members.get_mut(&group) {
            Some(members) => {
                members.remove(&event.id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.members.remove(&group);
            self.propagating.remove(&group);
        }
    }

    /// Tracked members of a group, ascending.
    pub fn members(&self, group: GroupId) -> impl Iterator<Item = EventId> + '_ {
        self.members.get(&group).into_iter().flatten().copied()
    }

    #[must_use]
    pub fn propagates(&self, group: GroupId) -> bool {
        self.propagating.contains(&group)
    }

    /// Prevent `id` and, when its group propagates, every pending sibling.
    ///
    /// Returns the events that transitioned, origin first. An event that is
    /// no longer pending is left alone and nothing is returned.
    pub fn mark_prevented(
        &self,
        id: EventId,
        registry: &mut EventRegistry,
    ) -> Result<Vec<EventId>, ConstraintViolation> {
        let event = registry.get_mut(id).ok_or(ConstraintViolation::MissingEvent(id))?;
        if event.status != EventStatus::Pending {
            return Ok(Vec::new());
        }
        event.status = EventStatus::Prevented;
        event.prevention = Some(PreventionCause::Direct);
        let group = event.group;

        let mut prevented = vec![id];
        if let Some(group) = group.filter(|g| self.propagates(*g)) {
            for member in self.members(group).filter(|m| *m != id) {
                if let Some(sibling) = registry.get_mut(member) {
                    if sibling.status == EventStatus::Pending {
                        sibling.status = EventStatus::Prevented;
                        sibling.prevention = Some(PreventionCause::Group { origin: id });
                        prevented.push(member);
                    }
                }
            }
            debug!(origin = %id, %group, count = prevented.len(), "group prevented");
        } else {
            debug!(event = %id, "event prevented");
        }
        Ok(prevented)
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.propagating.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Payload;
    use crate::events::EventType;
    use crate::input::Choices;

    fn event(group: Option<GroupId>, prevents_group: bool) -> Event {
        Event {
            id: EventId::new(0),
            event_type: EventType::new("Grouped"),
            payload: Payload::new(),
            caused_by: None,
            chain_root: EventId::new(0),
            order: 0,
            status: EventStatus::Pending,
            group,
            prevents_group,
            prevention: None,
            choices: Choices::default(),
        }
    }

    fn setup(flagged: bool) -> (PreventionTracker, EventRegistry, Vec<EventId>) {
        let mut tracker = PreventionTracker::new();
        let mut registry = EventRegistry::new();
        let group = tracker.allocate_group();
        let mut ids = Vec::new();
        for i in 0..3 {
            let id = registry.register(event(Some(group), flagged && i == 0));
            tracker.track(registry.get(id).unwrap());
            ids.push(id);
        }
        (tracker, registry, ids)
    }

    #[test]
    fn test_propagates_from_any_member() {
        let (tracker, mut registry, ids) = setup(true);

        let prevented = tracker.mark_prevented(ids[1], &mut registry).unwrap();
        assert_eq!(prevented, vec![ids[1], ids[0], ids[2]]);

        for id in &ids {
            assert_eq!(registry.get(*id).unwrap().status, EventStatus::Prevented);
        }
        assert_eq!(registry.get(ids[1]).unwrap().prevention, Some(PreventionCause::Direct));
        assert_eq!(
            registry.get(ids[0]).unwrap().prevention,
            Some(PreventionCause::Group { origin: ids[1] })
        );
    }

    #[test]
    fn test_unflagged_group_stays_independent() {
        let (tracker, mut registry, ids) = setup(false);

        assert_eq!(tracker.mark_prevented(ids[0], &mut registry).unwrap(), vec![ids[0]]);
        assert_eq!(registry.get(ids[1]).unwrap().status, EventStatus::Pending);
    }

    #[test]
    fn test_applied_members_untouched() {
        let (mut tracker, mut registry, ids) = setup(true);
        registry.get_mut(ids[2]).unwrap().status = EventStatus::Applied;

        let flagged = registry.unregister(ids[0]).unwrap();
        tracker.untrack(&flagged);
        assert!(tracker.propagates(flagged.group.unwrap()));

        let prevented = tracker.mark_prevented(ids[1], &mut registry).unwrap();
        assert_eq!(prevented, vec![ids[1]]);
        assert_eq!(registry.get(ids[2]).unwrap().status, EventStatus::Applied);
    }

    #[test]
    fn test_repeat_and_missing() {
        let (tracker, mut registry, ids) = setup(false);
        tracker.mark_prevented(ids[0], &mut registry).unwrap();
        assert!(tracker.mark_prevented(ids[0], &mut registry).unwrap().is_empty());

        assert_eq!(
            tracker.mark_prevented(EventId::new(77), &mut registry),
            Err(ConstraintViolation::MissingEvent(EventId::new(77)))
        );
    }
}
