//! Unit abilities and global rules for skirmish.

use crate::core::EntityId;
use crate::effects::{ChoiceSpec, EffectOp, EventTemplate, Selector};
use crate::triggers::{FireScope, Predicate, TriggerDefinition, TriggerId, ValueExpr};

use super::kinds;

/// "Whenever this unit is dealt damage, its owner draws a card."
pub fn on_damaged_draw(id: TriggerId, unit: EntityId) -> TriggerDefinition {
    TriggerDefinition::new(id, "Thick Hide", kinds::DAMAGED)
        .with_source(unit)
        .when(Predicate::field_is_source("target"))
        .with_effect(EffectOp::Emit(
            EventTemplate::new(kinds::CARD_DRAWN).with("player", ValueExpr::owner_of(ValueExpr::Source)),
        ))
}

/// "Whenever this unit is dealt damage, you may deal 1 damage to any target.
/// Once per turn."
pub fn may_ping(id: TriggerId, unit: EntityId) -> TriggerDefinition {
    let anything = Selector::Union(vec![Selector::Players, Selector::AllEntities]);
    TriggerDefinition::new(id, "Spiteful Retort", kinds::DAMAGED)
        .with_source(unit)
        .when(Predicate::field_is_source("target"))
        .with_effect(EffectOp::Choose(ChoiceSpec::target("ping", anything).optional()))
        .with_effect(EffectOp::Emit(
            EventTemplate::new(kinds::DAMAGED)
                .with("target", ValueExpr::chosen("ping", 0))
                .with("amount", ValueExpr::int(1))
                .with("source", ValueExpr::Source),
        ))
        .limited(FireScope::PerTurn, 1)
}

/// "Prevent all damage that would be dealt to `ward`."
pub fn guardian(id: TriggerId, unit: EntityId, ward: EntityId) -> TriggerDefinition {
    TriggerDefinition::new(id, "Guardian", kinds::DAMAGED)
        .before()
        .with_source(unit)
        .when(Predicate::equals(
            ValueExpr::field("target"),
            ValueExpr::Const(ward.into()),
        ))
        .with_effect(EffectOp::PreventTriggering)
}

/// "Damage dealt to this unit is reduced to 1."
pub fn armored(id: TriggerId, unit: EntityId) -> TriggerDefinition {
    TriggerDefinition::new(id, "Armored", kinds::DAMAGED)
        .before()
        .with_source(unit)
        .when(Predicate::field_is_source("target").and(Predicate::AtLeast(ValueExpr::field("amount"), 2)))
        .with_effect(EffectOp::set_payload("amount", ValueExpr::int(1)))
}

/// Global rule: "Cards cannot move."
pub fn block_move(id: TriggerId) -> TriggerDefinition {
    TriggerDefinition::new(id, "Stasis Field", kinds::CARD_MOVED)
        .before()
        .with_effect(EffectOp::PreventTriggering)
}

/// Global rule: every `Echo` emits `copies` more. Self-sustaining unless limited.
pub fn echo(id: TriggerId, copies: usize) -> TriggerDefinition {
    (0..copies).fold(TriggerDefinition::new(id, "Echo", kinds::ECHO), |trigger, _| {
        trigger.with_effect(EffectOp::Emit(EventTemplate::new(kinds::ECHO)))
    })
}
