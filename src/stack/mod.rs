//! The resolution stack and the registries behind it.
//!
//! The stack is the only resolvable work queue: every state mutation happens
//! while exactly one [`StackItem`] is being resolved. Items only carry ids;
//! the events and reactions themselves live in the registries.
//!
//! ## Example Usage
//!
//! ```
//! use stackwise::events::EventId;
//! use stackwise::stack::{EventStack, StackItem};
//!
//! let mut stack = EventStack::new(16);
//!
//! // The first item of a batch resolves first.
//! let batch: Vec<_> = [1, 2, 3]
//!     .into_iter()
//!     .map(|n| {
//!         let order = stack.next_order();
//!         StackItem::event(EventId::new(n), order)
//!     })
//!     .collect();
//! stack.push_all(batch).unwrap();
//!
//! assert_eq!(stack.pop().unwrap().event_id(), Some(EventId::new(1)));
//! assert_eq!(stack.len(), 2);
//! ```

mod priority;
mod registry;

pub use priority::{PassOutcome, PriorityRound};
pub use registry::{EventRegistry, ReactionRegistry, Registry, RegistryEntry};

use serde::{Deserialize, Serialize};

use crate::error::RecursionError;
use crate::events::{EventId, ReactionId};

/// What a stack item refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackItemKind {
    Event(EventId),
    Reaction(ReactionId),
}

/// The unit the stack schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackItem {
    pub kind: StackItemKind,

    /// Creation order, for stable tie-breaks in tooling.
    pub order: u64,

    /// Set once the event's before-reactions have been scheduled.
    pub before_scheduled: bool,
}

impl StackItem {
    #[must_use]
    pub const fn event(id: EventId, order: u64) -> Self {
        Self {
            kind: StackItemKind::Event(id),
            order,
            before_scheduled: false,
        }
    }

    #[must_use]
    pub const fn reaction(id: ReactionId, order: u64) -> Self {
        Self {
            kind: StackItemKind::Reaction(id),
            order,
            before_scheduled: false,
        }
    }

    #[must_use]
    pub const fn event_id(&self) -> Option<EventId> {
        match self.kind {
            StackItemKind::Event(id) => Some(id),
            StackItemKind::Reaction(_) => None,
        }
    }

    #[must_use]
    pub const fn reaction_id(&self) -> Option<ReactionId> {
        match self.kind {
            StackItemKind::Reaction(id) => Some(id),
            StackItemKind::Event(_) => None,
        }
    }
}

/// LIFO stack of resolvable items with a depth limit.
///
/// Popping an empty stack is not an error; callers check [`is_empty`]
/// first, since an empty stack means a priority window.
///
/// [`is_empty`]: EventStack::is_empty
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventStack {
    /// Index 0 = bottom, last = top.
    items: Vec<StackItem>,
    next_order: u64,
    max_depth: usize,
}

impl EventStack {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            items: Vec::new(),
            next_order: 0,
            max_depth,
        }
    }

    /// Take the next creation order number.
    pub fn next_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    /// Check that `additional` more items fit under the depth limit.
    pub fn ensure_room(&self, additional: usize) -> Result<(), RecursionError> {
        if self.items.len() + additional > self.max_depth {
            Err(RecursionError::StackDepth {
                limit: self.max_depth,
            })
        } else {
            Ok(())
        }
    }

    pub fn push(&mut self, item: StackItem) -> Result<(), RecursionError> {
        self.ensure_room(1)?;
        self.items.push(item);
        Ok(())
    }

    /// Push a batch so that its first item ends up on top and resolves first.
    ///
    /// Either the whole batch fits or nothing is pushed.
    pub fn push_all(&mut self, items: Vec<StackItem>) -> Result<(), RecursionError> {
        self.ensure_room(items.len())?;
        self.items.extend(items.into_iter().rev());
        Ok(())
    }

    pub fn pop(&mut self) -> Option<StackItem> {
        self.items.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&StackItem> {
        self.items.last()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop every item. The order counter keeps running.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Take every item out, top first.
    pub fn drain(&mut self) -> Vec<StackItem> {
        let mut items = std::mem::take(&mut self.items);
        items.reverse();
        items
    }

    /// Items from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &StackItem> {
        self.items.iter()
    }

    /// Whether an event is queued and still waiting for before-discovery.
    #[must_use]
    pub fn awaits_before_discovery(&self, id: EventId) -> bool {
        self.items
            .iter()
            .any(|item| item.event_id() == Some(id) && !item.before_scheduled)
    }

    /// Flag a queued event as before-scheduled. Returns whether it was found.
    pub fn mark_before_scheduled(&mut self, id: EventId) -> bool {
        match self.items.iter_mut().find(|item| item.event_id() == Some(id)) {
            Some(item) => {
                item.before_scheduled = true;
                true
            }
            None => false,
        }
    }
}
