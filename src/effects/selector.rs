//! Entity selectors.
//!
//! A selector names a set of entities relative to the current state and an
//! evaluation context. Rulesets resolve selectors through
//! `Ruleset::evaluate_selector`; the built-in kinds are evaluated here and
//! `Named` is left to the ruleset. Results are ascending and deduplicated.

use serde::{Deserialize, Serialize};

use crate::core::EntityId;
use crate::triggers::{ConditionEvaluator, EvalContext, ValueExpr};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// Whatever the expressions evaluate to.
    Fixed(Vec<ValueExpr>),
    /// Every player still in the match.
    Players,
    /// Every live player except the one named.
    OpponentsOf(ValueExpr),
    /// Live non-player entities controlled by the player named.
    ControlledBy(ValueExpr),
    /// Every live non-player entity.
    AllEntities,
    /// Live non-player entities with a counter at least `min`.
    WithCounterAtLeast { key: String, min: i64 },
    Union(Vec<Selector>),
    /// Ruleset-defined.
    Named(String),
}

impl Selector {
    /// A single entity.
    #[must_use]
    pub fn one(expr: ValueExpr) -> Self {
        Self::Fixed(vec![expr])
    }

    #[must_use]
    pub fn opponents() -> Self {
        Self::OpponentsOf(ValueExpr::Controller)
    }
}

pub struct SelectorEvaluator;

impl SelectorEvaluator {
    #[must_use]
    pub fn evaluate(selector: &Selector, ctx: &EvalContext<'_>) -> Vec<EntityId> {
        let mut ids = Vec::new();
        Self::collect(selector, ctx, &mut ids);
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn collect(selector: &Selector, ctx: &EvalContext<'_>, out: &mut Vec<EntityId>) {
        let state = ctx.state;
        match selector {
            Selector::Fixed(exprs) => {
                out.extend(exprs.iter().filter_map(|e| ConditionEvaluator::entity(e, ctx)));
            }

            Selector::Players => {
                out.extend(state.live_players().map(EntityId::player));
            }

            Selector::OpponentsOf(player) => {
                if let Some(player) = ConditionEvaluator::player(player, ctx) {
                    out.extend(
                        state
                            .live_players()
                            .filter(|p| *p != player)
                            .map(EntityId::player),
                    );
                }
            }

            Selector::ControlledBy(player) => {
                if let Some(player) = ConditionEvaluator::player(player, ctx) {
                    out.extend(
                        state
                            .live_entities()
                            .filter(|(_, record)| record.controller == player)
                            .map(|(id, _)| id),
                    );
                }
            }

            Selector::AllEntities => {
                out.extend(state.live_entities().map(|(id, _)| id));
            }

            Selector::WithCounterAtLeast { key, min } => {
                out.extend(
                    state
                        .live_entities()
                        .filter(|(_, record)| record.counter(key) >= *min)
                        .map(|(id, _)| id),
                );
            }

            Selector::Union(parts) => {
                for part in parts {
                    Self::collect(part, ctx, out);
                }
            }

            Selector::Named(_) => {}
        }
    }
}
