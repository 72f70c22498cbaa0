//! Engine configuration.
//!
//! A match is configured once at construction:
//! - `ResolutionLimits`: recursion guards for the resolution loop
//! - `PreventionNotice`: how many `EventPrevented` notices a prevented group produces
//! - `ExpiryPolicy`: what happens when a pending input expires
//!
//! The expiry policy has no default. Whether an expired decision takes its
//! default answer or aborts the enclosing action is a ruleset decision, so
//! `EngineConfig::new` requires it.

use serde::{Deserialize, Serialize};

/// Guards that turn runaway resolution into a `RecursionError`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionLimits {
    /// Maximum number of items on the stack at once.
    pub max_stack_depth: usize,

    /// Maximum reactions a single discovery pass may materialize for one event.
    pub max_reactions_per_event: usize,

    /// Maximum resolution steps between two priority windows.
    /// Also bounds automatic passes for players with no available actions.
    pub max_loop_iterations: usize,

    /// Maximum consecutive state-watcher passes before the stack settles.
    pub max_watcher_passes: usize,
}

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self {
            max_stack_depth: 256,
            max_reactions_per_event: 64,
            max_loop_iterations: 10_000,
            max_watcher_passes: 100,
        }
    }
}

/// Which members of a prevented group get an `EventPrevented` notice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreventionNotice {
    /// Only the directly prevented event.
    #[default]
    OriginOnly,
    /// Every prevented member, including ones prevented by group propagation.
    EveryMember,
}

/// What to do when a pending input expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryPolicy {
    /// Submit the request's default answer; abort when it has none.
    DefaultAnswer,
    /// Fail the suspended item and continue resolving.
    AbortAction,
}

/// Per-match engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub limits: ResolutionLimits,
    pub prevention_notice: PreventionNotice,
    pub expiry_policy: ExpiryPolicy,
}

impl EngineConfig {
    /// Create a config with default limits and the given expiry policy.
    #[must_use]
    pub fn new(expiry_policy: ExpiryPolicy) -> Self {
        Self {
            limits: ResolutionLimits::default(),
            prevention_notice: PreventionNotice::default(),
            expiry_policy,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResolutionLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.limits.max_stack_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_reactions_per_event(mut self, max: usize) -> Self {
        self.limits.max_reactions_per_event = max;
        self
    }

    #[must_use]
    pub fn with_max_loop_iterations(mut self, max: usize) -> Self {
        self.limits.max_loop_iterations = max;
        self
    }

    #[must_use]
    pub fn with_max_watcher_passes(mut self, max: usize) -> Self {
        self.limits.max_watcher_passes = max;
        self
    }

    #[must_use]
    pub fn with_prevention_notice(mut self, notice: PreventionNotice) -> Self {
        self.prevention_notice = notice;
        self
    }
}
