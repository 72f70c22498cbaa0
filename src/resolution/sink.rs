//! Persistence seam.
//!
//! The actor hands every logged event to an [`EventSink`] and carries on
//! without waiting for durability. Replay only needs the appended sequence
//! plus the match seed.

use std::sync::{Arc, Mutex, PoisonError};

use crate::events::Event;

pub trait EventSink {
    /// Append events in log order. Fire-and-forget.
    fn append_events(&mut self, events: &[Event]);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn append_events(&mut self, _events: &[Event]) {}
}

/// Collects appended events in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn append_events(&mut self, events: &[Event]) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(events);
    }
}
