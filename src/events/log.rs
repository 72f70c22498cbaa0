//! The ordered event log.
//!
//! Events are appended in the exact order the resolution loop pops them to a
//! terminal status. Backed by `im::Vector`, so taking a snapshot for a
//! replay comparison does not copy the log.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::event::{Event, EventId, EventStatus, EventType};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vector<Event>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.entries.push_back(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Event> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.entries.iter()
    }

    /// Find a logged event by id.
    #[must_use]
    pub fn find(&self, id: EventId) -> Option<&Event> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Logged events of one type, in log order.
    pub fn of_type<'a>(&'a self, event_type: &'a EventType) -> impl Iterator<Item = &'a Event> + 'a {
        self.entries.iter().filter(move |e| e.event_type == *event_type)
    }

    /// Event type names in log order. Handy for asserting sequences.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.event_type.as_str()).collect()
    }

    /// Events that actually changed state, in order.
    pub fn applied(&self) -> impl Iterator<Item = &Event> {
        self.entries
            .iter()
            .filter(|e| e.status == EventStatus::Applied)
    }

    /// Encode the log with bincode.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&self.entries.iter().collect::<Vec<_>>())
    }

    /// Decode a log produced by [`EventLog::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        let events: Vec<Event> = bincode::deserialize(bytes)?;
        Ok(events.into_iter().collect())
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
