//! The per-match resolution loop and its message surface.

pub mod actor;
pub mod messages;
pub mod prevention;
pub mod replay;
pub mod sink;

pub use actor::{MatchActor, MatchPhase};
pub use messages::{Inbound, Outbound, SystemControl};
pub use prevention::PreventionTracker;
pub use replay::{fold_encoded, fold_log, rerun};
pub use sink::{EventSink, MemorySink, NullSink};
