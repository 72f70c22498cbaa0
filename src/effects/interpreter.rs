//! Runs a reaction's effect list.
//!
//! Effects run in order from the reaction's cursor. A run of consecutive
//! `Choose` operations whose slots are unanswered suspends the reaction with
//! one input request per slot; the cursor stays on the first of them, and the
//! consequences produced so far are handed back so the caller can keep them
//! until the reaction resumes.

use tracing::trace;

use crate::core::{GameState, PlayerId};
use crate::events::{Event, EventDraft, Reaction};
use crate::input::{Answer, InputKind, InputRequest};
use crate::rules::{Consequence, Ruleset};
use crate::triggers::{ConditionEvaluator, EvalContext};

use super::effect::{ChoiceSpec, EffectOp, EventTemplate, Fallback};
use super::fanout::FanOut;

/// Result of running a reaction's effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterpretOutcome {
    Done(Vec<Consequence>),
    NeedsInput {
        requests: Vec<InputRequest>,
        /// Consequences produced before the pause.
        staged: Vec<Consequence>,
    },
}

pub struct EffectInterpreter;

impl EffectInterpreter {
    /// Run `reaction` from its cursor. `event` is the live triggering event,
    /// `staged` the consequences kept from an earlier pause.
    pub fn run<R: Ruleset + ?Sized>(
        ruleset: &R,
        reaction: &mut Reaction,
        state: &GameState,
        event: Option<&Event>,
        mut staged: Vec<Consequence>,
    ) -> InterpretOutcome {
        while reaction.cursor < reaction.effects.len() {
            let op = reaction.effects[reaction.cursor].clone();
            let mut ctx = EvalContext::new(state, reaction.controller)
                .with_source(reaction.source)
                .with_choices(&reaction.choices);
            if let Some(event) = event {
                ctx = ctx.with_event(event);
            }

            match op {
                EffectOp::Emit(template) => {
                    staged.push(Consequence::Emit(Self::instantiate(&template, &ctx)));
                }

                EffectOp::FanOut {
                    selector,
                    template,
                    bind,
                } => {
                    let draft = Self::instantiate(&template, &ctx);
                    let mut fan_out = FanOut::new(selector, draft.event_type, reaction.controller)
                        .with_payload(draft.payload)
                        .bind_as(bind)
                        .from_source(reaction.source)
                        .with_choices(reaction.choices.clone());
                    fan_out.group = template.group;
                    fan_out.prevents_group = template.prevents_group;
                    staged.push(Consequence::FanOut(fan_out));
                }

                EffectOp::PreventTriggering => {
                    if let Some(id) = reaction.trigger_event {
                        staged.push(Consequence::Prevent(id));
                    }
                }

                EffectOp::Prevent(expr) => {
                    if let Some(id) = ConditionEvaluator::value(&expr, &ctx).and_then(|v| v.as_event()) {
                        staged.push(Consequence::Prevent(id));
                    }
                }

                EffectOp::SetPayload { key, value } => {
                    let value = ConditionEvaluator::value(&value, &ctx);
                    if let (Some(event), Some(value)) = (reaction.trigger_event, value) {
                        staged.push(Consequence::SetPayload { event, key, value });
                    }
                }

                EffectOp::Choose(_) => {
                    let mut requests = Vec::new();
                    let mut next = reaction.cursor;

                    while let Some(EffectOp::Choose(spec)) = reaction.effects.get(next) {
                        if reaction.choices.is_declined(&spec.slot) {
                            trace!(reaction = %reaction.id, slot = %spec.slot, "choice declined");
                            reaction.cursor = reaction.effects.len();
                            return InterpretOutcome::Done(staged);
                        }
                        if !reaction.choices.contains(&spec.slot) {
                            match Self::request(ruleset, spec, &ctx, reaction.controller) {
                                Some(request) => requests.push(request),
                                None => {
                                    trace!(reaction = %reaction.id, slot = %spec.slot, "no legal choice");
                                    reaction.cursor = reaction.effects.len();
                                    return InterpretOutcome::Done(staged);
                                }
                            }
                        }
                        next += 1;
                    }

                    if !requests.is_empty() {
                        return InterpretOutcome::NeedsInput { requests, staged };
                    }
                    reaction.cursor = next;
                    continue;
                }
            }

            reaction.cursor += 1;
        }

        InterpretOutcome::Done(staged)
    }

    /// Evaluate a template's fields. Fields that do not resolve are left out.
    #[must_use]
    pub fn instantiate(template: &EventTemplate, ctx: &EvalContext<'_>) -> EventDraft {
        let mut draft = EventDraft::new(&template.event_type);
        for (key, expr) in &template.fields {
            match ConditionEvaluator::value(expr, ctx) {
                Some(value) => {
                    draft.payload.insert(key.as_str(), value);
                }
                None => trace!(event_type = %template.event_type, field = %key, "field unresolved"),
            }
        }
        draft.group = template.group;
        draft.prevents_group = template.prevents_group;
        draft
    }

    /// Build the input request for a choice; `None` when nothing legal is offered.
    fn request<R: Ruleset + ?Sized>(
        ruleset: &R,
        spec: &ChoiceSpec,
        ctx: &EvalContext<'_>,
        controller: PlayerId,
    ) -> Option<InputRequest> {
        let chooser = ConditionEvaluator::player(&spec.chooser, ctx).unwrap_or(controller);
        let mut request =
            InputRequest::new(spec.slot.as_str(), chooser, spec.kind).with_count(spec.min, spec.max);

        match spec.kind {
            InputKind::TargetSelect | InputKind::OrderSelect => {
                let mut choices = spec
                    .selector
                    .as_ref()
                    .map(|s| ruleset.evaluate_selector(s, ctx))
                    .unwrap_or_default();
                choices.sort_unstable();
                choices.dedup();
                if choices.is_empty() || choices.len() < spec.min {
                    return None;
                }
                request = request.with_choices(choices);
            }
            InputKind::ModePick => {
                if spec.modes.is_empty() {
                    return None;
                }
                request = request.with_modes(spec.modes.iter().cloned());
            }
            InputKind::PayCost => {
                if let Some(cost) = &spec.cost {
                    request = request.with_cost(cost.clone());
                }
            }
            InputKind::Confirm => {}
        }

        if spec.optional {
            request = request.optional();
        }
        if let Some(ttl) = spec.ttl {
            request = request.with_ttl(ttl);
        }
        if spec.dependent {
            request = request.dependent();
        }
        if let Some(answer) = Self::fallback_answer(spec, &request) {
            request = request.with_default(answer);
        }
        Some(request)
    }

    fn fallback_answer(spec: &ChoiceSpec, request: &InputRequest) -> Option<Answer> {
        let constraints = &request.constraints;
        match spec.fallback {
            Fallback::None => None,
            Fallback::Decline => Some(Answer::decline()),
            Fallback::FirstOffered => Some(match spec.kind {
                InputKind::TargetSelect => {
                    let count = constraints.min.max(1).min(constraints.choices.len());
                    Answer::targets(constraints.choices.iter().copied().take(count))
                }
                InputKind::OrderSelect => Answer::targets(constraints.choices.iter().copied()),
                InputKind::ModePick => Answer::mode(constraints.modes.first()?.as_str()),
                InputKind::PayCost | InputKind::Confirm => Answer::activate(),
            }),
        }
    }
}
