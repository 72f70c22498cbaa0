//! State-based watchers.
//!
//! A watcher is checked against state, not against an event: whenever the
//! stack empties after something applied, every watcher whose condition
//! holds fires as a state-based reaction. Its effects should make the
//! condition false, or it fires again on the next pass.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId};
use crate::effects::EffectOp;
use crate::triggers::{Predicate, TriggerId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateWatcher {
    pub id: TriggerId,
    pub name: String,
    pub source: Option<EntityId>,
    pub controller: Option<PlayerId>,
    pub condition: Predicate,
    pub effects: Vec<EffectOp>,
    pub declaration_index: u32,
}

impl StateWatcher {
    pub fn new(id: TriggerId, name: impl Into<String>, condition: Predicate) -> Self {
        Self {
            id,
            name: name.into(),
            source: None,
            controller: None,
            condition,
            effects: Vec::new(),
            declaration_index: 0,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_controller(mut self, controller: PlayerId) -> Self {
        self.controller = Some(controller);
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: EffectOp) -> Self {
        self.effects.push(effect);
        self
    }
}
