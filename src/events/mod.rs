//! Events, reactions and the event log.

mod event;
mod log;
mod reaction;

pub use event::{
    Event, EventDraft, EventId, EventStatus, EventType, GroupId, GroupTag, PreventionCause,
};
pub use log::EventLog;
pub use reaction::{Reaction, ReactionId, ReactionTiming};
