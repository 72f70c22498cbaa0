//! Firing caps for triggers.
//!
//! Counts are keyed by (rule id, source, scope key). Per-event caps use the
//! causal-chain root as scope key; the other scopes use zero, and per-turn
//! counts are wiped when the turn ends. A reaction at its cap is dropped from
//! the discovered set; that is not an error.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::EntityId;
use crate::events::EventId;

use super::definition::{FireLimit, FireScope, TriggerId};

/// Key a firing is counted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LimitKey {
    pub trigger: TriggerId,
    pub source: Option<EntityId>,
    pub scope: FireScope,
    pub scope_key: u64,
}

impl LimitKey {
    /// Key for a firing of `trigger` caused somewhere in the chain rooted at `chain_root`.
    #[must_use]
    pub fn new(
        trigger: TriggerId,
        source: Option<EntityId>,
        scope: FireScope,
        chain_root: Option<EventId>,
    ) -> Self {
        let scope_key = match scope {
            FireScope::PerTurn | FireScope::PerSource => 0,
            FireScope::PerEvent => chain_root.map_or(0, EventId::raw),
        };
        Self {
            trigger,
            source,
            scope,
            scope_key,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LimiterTracker {
    counts: FxHashMap<LimitKey, u32>,
}

impl LimiterTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Firings recorded under `key`.
    #[must_use]
    pub fn count(&self, key: &LimitKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Whether one more firing fits under `limit`.
    #[must_use]
    pub fn allows(&self, key: &LimitKey, limit: &FireLimit) -> bool {
        self.count(key) < limit.max
    }

    /// Record a firing if it fits. Returns `false` when the cap is reached.
    pub fn try_fire(&mut self, key: LimitKey, limit: &FireLimit) -> bool {
        let count = self.counts.entry(key).or_insert(0);
        if *count >= limit.max {
            debug!(trigger = %key.trigger, source = ?key.source, scope = ?key.scope, max = limit.max, "trigger at firing cap");
            return false;
        }
        *count += 1;
        true
    }

    /// Turn boundary: forget per-turn counts.
    pub fn reset_turn(&mut self) {
        self.counts.retain(|key, _| key.scope != FireScope::PerTurn);
    }

    /// Causal chains ended (the stack emptied): forget per-event counts.
    pub fn reset_chains(&mut self) {
        self.counts.retain(|key, _| key.scope != FireScope::PerEvent);
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
