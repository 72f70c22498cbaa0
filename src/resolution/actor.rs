//! The match actor: one resolution loop per match.
//!
//! The actor owns everything a match needs (state, stack, registries, RNG,
//! limiter, prevention tracker, input gate, log) and is driven entirely by
//! inbound messages. Each message runs the loop until it reaches one of the
//! two suspension points: waiting for an action in a priority window, or
//! waiting for answers to pending inputs.
//!
//! ## Phases
//!
//! - `Resolving`: pop the top item. An event that has not had its
//!   before-reactions scheduled gets them discovered and pushed above it.
//!   Otherwise the item applies (events fold into state through the ruleset,
//!   reactions run their effects), its consequences are pushed, and for
//!   events the after-reactions are pushed above those. When the stack
//!   drains, state watchers get a pass, then a priority window opens.
//! - `PriorityWindow`: priority goes to the active player.
//! - `AwaitingAction`: the holder acts or passes. All live players passing
//!   in a row resolves the stack, or advances the turn if it is empty.
//! - `Advancing`: push the next step boundary events.
//! - `AwaitingInput`: a step is suspended on the input gate.
//! - `Ended` / `Halted`: terminal, or waiting for an operator.
//!
//! Nothing here reads the clock or any process-wide state; every match is
//! independent and may run on its own thread.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::core::{Action, EngineConfig, ExpiryPolicy, GameState, MatchRng, PlayerId, PreventionNotice};
use crate::effects::{EffectInterpreter, InterpretOutcome, Materializer};
use crate::error::{
    ConstraintViolation, EngineError, RecursionError, TimeoutError, ValidationError,
};
use crate::events::{
    Event, EventDraft, EventId, EventLog, EventStatus, EventType, GroupId, GroupTag,
    PreventionCause, Reaction, ReactionTiming,
};
use crate::input::{Answer, Choices, InputRequest, PendingInput, PendingInputGate, PendingInputId};
use crate::rules::{ApplyContext, ApplyOutcome, Consequence, Ruleset};
use crate::stack::{
    EventRegistry, EventStack, PassOutcome, PriorityRound, ReactionRegistry, StackItem,
    StackItemKind,
};
use crate::triggers::{
    ConditionEvaluator, DiscoveryIndex, DiscoveryRecord, EvalContext, LimiterTracker,
};

use super::messages::{Inbound, Outbound, SystemControl};
use super::prevention::PreventionTracker;
use super::sink::{EventSink, NullSink};

/// Where the resolution loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    AwaitingAction,
    Resolving,
    PriorityWindow,
    AwaitingInput,
    Advancing,
    Ended,
    Halted,
}

/// A step paused on the input gate.
#[derive(Clone, Debug)]
struct Suspension {
    item: StackItem,
    /// Reaction consequences produced before the pause.
    staged: Vec<Consequence>,
}

/// Everything folding one event may touch.
#[derive(Clone, Debug)]
struct FoldCheckpoint {
    state: GameState,
    rng: MatchRng,
    limiter: LimiterTracker,
}

pub struct MatchActor<R: Ruleset> {
    match_id: u64,
    ruleset: R,
    config: EngineConfig,
    seed: u64,
    initial_state: GameState,
    state: GameState,
    rng: MatchRng,

    stack: EventStack,
    events: EventRegistry,
    reactions: ReactionRegistry,
    limiter: LimiterTracker,
    prevention: PreventionTracker,
    gate: PendingInputGate,
    priority: PriorityRound,

    phase: MatchPhase,
    started: bool,
    halt_reason: Option<String>,
    suspended: Option<Suspension>,

    /// Raised when an event applies; cleared by a watcher pass.
    state_dirty: bool,
    watcher_passes: usize,
    /// Pops since the stack last drained.
    iterations: usize,
    /// Depth of an interrupted priority window's stack. Resolution stops
    /// there and the window reopens.
    resolve_floor: Option<usize>,

    log: EventLog,
    discovery_trace: Vec<DiscoveryRecord>,
    journal: Vec<Inbound>,
    outbox: Vec<Outbound>,
    sink: Box<dyn EventSink + Send>,
}

impl<R: Ruleset> MatchActor<R> {
    /// Create an actor. Nothing happens until [`start`](Self::start).
    pub fn new(ruleset: R, config: EngineConfig, state: GameState, seed: u64) -> Self {
        let holder = state.active_player;
        Self {
            match_id: 0,
            stack: EventStack::new(config.limits.max_stack_depth),
            ruleset,
            config,
            seed,
            initial_state: state.clone(),
            state,
            rng: MatchRng::new(seed),
            events: EventRegistry::new(),
            reactions: ReactionRegistry::new(),
            limiter: LimiterTracker::new(),
            prevention: PreventionTracker::new(),
            gate: PendingInputGate::new(),
            priority: PriorityRound::new(holder),
            phase: MatchPhase::AwaitingAction,
            started: false,
            halt_reason: None,
            suspended: None,
            state_dirty: false,
            watcher_passes: 0,
            iterations: 0,
            resolve_floor: None,
            log: EventLog::new(),
            discovery_trace: Vec::new(),
            journal: Vec::new(),
            outbox: Vec::new(),
            sink: Box::new(NullSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Label used in log output.
    #[must_use]
    pub fn with_match_id(mut self, match_id: u64) -> Self {
        self.match_id = match_id;
        self
    }

    // === Accessors ===

    pub fn ruleset(&self) -> &R {
        &self.ruleset
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn initial_state(&self) -> &GameState {
        &self.initial_state
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Every discovery pass in order, for replay comparison.
    pub fn discovery_trace(&self) -> &[DiscoveryRecord] {
        &self.discovery_trace
    }

    /// Accepted inbound messages, in order.
    pub fn journal(&self) -> &[Inbound] {
        &self.journal
    }

    /// The priority holder while a window is open.
    pub fn priority_holder(&self) -> Option<PlayerId> {
        self.priority.is_open().then(|| self.priority.holder())
    }

    pub fn pending_inputs(&self) -> Vec<&PendingInput> {
        self.gate.pending().collect()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Events waiting on the stack, bottom to top.
    pub fn pending_events(&self) -> Vec<&Event> {
        self.stack
            .iter()
            .filter_map(StackItem::event_id)
            .filter_map(|id| self.events.get(id))
            .collect()
    }

    /// Trigger firing counts.
    pub fn limiter(&self) -> &LimiterTracker {
        &self.limiter
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halt_reason.as_deref()
    }

    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Take the outbound messages produced since the last call.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    // === Inbound ===

    /// Emit the opening events and run until the first suspension point.
    pub fn start(&mut self) -> Vec<Outbound> {
        if !self.started {
            self.started = true;
            debug!(match_id = self.match_id, seed = self.seed, "match starting");

            let mut drafts = vec![EventDraft::new(EventType::MATCH_STARTED)
                .with("players", self.state.player_count() as i64)
                .with("seed", self.seed as i64)];
            drafts.extend(self.turn_opening(self.state.turn_number + 1, self.state.active_player));

            self.phase = MatchPhase::Resolving;
            if let Err(err) = self.push_batch(drafts, None, None) {
                self.on_failure(None, err);
            }
            self.drive();
        }
        self.take_outbound()
    }

    /// Process one inbound message. Rejections come back as `error` messages.
    pub fn handle(&mut self, message: Inbound) -> Vec<Outbound> {
        let result = match message {
            Inbound::ActionSubmit {
                player,
                action_type,
                params,
            } => self.submit_action(Action {
                player,
                action_type,
                params,
            }),
            Inbound::InputSubmit {
                input_id,
                player,
                answer,
            } => self.submit_input(input_id, player, answer),
            Inbound::SystemControl(control) => self.control(control),
        };

        if let Err(err) = result {
            debug!(match_id = self.match_id, error = %err, "inbound rejected");
            self.outbox.push(Outbound::error(&err));
        }
        self.take_outbound()
    }

    /// Submit an action (or a pass) for the priority holder.
    pub fn submit_action(&mut self, action: Action) -> Result<(), EngineError> {
        self.check_open()?;
        match self.phase {
            MatchPhase::AwaitingAction => {}
            MatchPhase::AwaitingInput => return Err(ValidationError::AwaitingInput.into()),
            _ => return Err(ValidationError::NotAcceptingActions.into()),
        }

        let player = action.player;
        if self.state.is_eliminated(player) {
            return Err(ValidationError::Eliminated(player).into());
        }
        if self.priority.holder() != player {
            return Err(ValidationError::NotPriorityHolder { player }.into());
        }

        if action.is_pass() {
            self.pass(player)?;
        } else {
            let intent = self.ruleset.validate_action(&action, &self.state)?;
            self.push_batch(intent.events, None, None)?;
            debug!(
                match_id = self.match_id,
                %player,
                action_type = %action.action_type,
                "action accepted"
            );
            self.priority.respond(player);
            self.outbox.push(Outbound::PriorityChanged {
                active_player_id: player,
                window_open: true,
            });
        }

        self.journal.push(Inbound::action(action));
        self.drive();
        Ok(())
    }

    /// Answer an open pending input.
    pub fn submit_input(
        &mut self,
        input_id: PendingInputId,
        player: PlayerId,
        answer: Answer,
    ) -> Result<(), EngineError> {
        self.check_open()?;
        if self.phase != MatchPhase::AwaitingInput {
            return Err(ValidationError::NoPendingInput.into());
        }

        let opened = self.gate.submit(input_id, player, answer.clone(), &self.state)?;
        self.journal.push(Inbound::input(input_id, player, answer));
        self.announce(&opened);

        if self.gate.is_complete() {
            self.resume();
        }
        Ok(())
    }

    /// Concede, expire an input, or advance the match clock.
    pub fn control(&mut self, control: SystemControl) -> Result<(), EngineError> {
        self.check_open()?;
        match &control {
            SystemControl::Concede { player } => {
                let player = *player;
                if self.state.is_eliminated(player) {
                    return Err(ValidationError::Eliminated(player).into());
                }
                let depth = self.stack.len();
                let draft = EventDraft::new(EventType::PLAYER_CONCEDED).with("player", player);
                self.push_batch(vec![draft], None, None)?;
                self.journal.push(Inbound::SystemControl(control));

                if self.phase != MatchPhase::AwaitingInput {
                    if depth > 0 {
                        self.resolve_floor = Some(depth);
                    }
                    self.priority.close();
                    self.phase = MatchPhase::Resolving;
                }
                self.drive();
            }

            SystemControl::Timeout { input_id } => {
                let input_id = *input_id;
                if self.phase != MatchPhase::AwaitingInput {
                    return Err(ValidationError::NoPendingInput.into());
                }
                if self.gate.get(input_id).is_none() {
                    return Err(ValidationError::UnknownInput(input_id).into());
                }
                self.journal.push(Inbound::SystemControl(control));
                self.expire(input_id);
            }

            SystemControl::Tick { now } => {
                let due = self.gate.advance_clock(*now);
                self.journal.push(Inbound::SystemControl(control));
                for id in due {
                    if self.phase != MatchPhase::AwaitingInput {
                        break;
                    }
                    if self.gate.get(id).is_some() {
                        self.expire(id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Clear a halted match and reopen priority.
    pub fn operator_resume(&mut self) -> Result<(), EngineError> {
        if self.phase != MatchPhase::Halted {
            return Err(ValidationError::NotAcceptingActions.into());
        }
        warn!(
            match_id = self.match_id,
            reason = self.halt_reason.as_deref().unwrap_or(""),
            "operator resumed halted match"
        );

        for item in self.stack.drain() {
            self.fail_item(item);
        }
        self.events.clear();
        self.reactions.clear();
        self.prevention.clear();
        self.gate.clear();
        self.suspended = None;
        self.limiter.reset_chains();
        self.iterations = 0;
        self.watcher_passes = 0;
        self.resolve_floor = None;
        self.halt_reason = None;

        self.phase = MatchPhase::PriorityWindow;
        self.drive();
        Ok(())
    }

    fn check_open(&self) -> Result<(), EngineError> {
        if !self.started {
            return Err(ValidationError::NotStarted.into());
        }
        match self.phase {
            MatchPhase::Ended => Err(ValidationError::MatchEnded.into()),
            MatchPhase::Halted => Err(EngineError::Halted(
                self.halt_reason.clone().unwrap_or_default(),
            )),
            _ => Ok(()),
        }
    }

    // === Loop ===

    /// Run until a suspension point.
    fn drive(&mut self) {
        let mut auto_passes = 0usize;
        loop {
            match self.phase {
                MatchPhase::Resolving => self.resolve_stack(),
                MatchPhase::PriorityWindow => self.open_priority(),
                MatchPhase::Advancing => self.advance(),
                MatchPhase::AwaitingAction => {
                    let holder = self.priority.holder();
                    if self.ruleset.has_available_actions(holder, &self.state) {
                        return;
                    }
                    auto_passes += 1;
                    if auto_passes > self.config.limits.max_loop_iterations {
                        warn!(match_id = self.match_id, "automatic passes exhausted");
                        return;
                    }
                    trace!(match_id = self.match_id, player = %holder, "auto-pass");
                    if self.pass(holder).is_err() {
                        return;
                    }
                }
                MatchPhase::AwaitingInput | MatchPhase::Ended | MatchPhase::Halted => return,
            }
        }
    }

    fn resolve_stack(&mut self) {
        while self.phase == MatchPhase::Resolving {
            if let Some(floor) = self.resolve_floor {
                if !self.stack.is_empty() && self.stack.len() <= floor {
                    debug!(match_id = self.match_id, depth = floor, "interrupted window reopens");
                    self.resolve_floor = None;
                    self.iterations = 0;
                    self.phase = MatchPhase::PriorityWindow;
                    return;
                }
            }

            let Some(item) = self.stack.pop() else {
                if self.run_state_watchers() {
                    continue;
                }
                if self.phase == MatchPhase::Resolving {
                    self.resolve_floor = None;
                    self.limiter.reset_chains();
                    self.iterations = 0;
                    self.watcher_passes = 0;
                    self.phase = MatchPhase::PriorityWindow;
                }
                return;
            };

            self.iterations += 1;
            let limit = self.config.limits.max_loop_iterations;
            if self.iterations > limit {
                self.trip_iteration_guard(item, RecursionError::LoopIterations { limit });
                continue;
            }

            trace!(match_id = self.match_id, kind = ?item.kind, depth = self.stack.len(), "pop");
            if let Err(err) = self.step(item) {
                self.on_failure(Some(item), err);
            }
        }
    }

    fn step(&mut self, item: StackItem) -> Result<(), EngineError> {
        match item.kind {
            StackItemKind::Event(id) => self.step_event(item, id),
            StackItemKind::Reaction(id) => self.resolve_reaction(item, id, Vec::new(), Choices::new()),
        }
    }

    fn step_event(&mut self, item: StackItem, id: EventId) -> Result<(), EngineError> {
        let (status, group) = {
            let event = self.events.get(id).ok_or(ConstraintViolation::MissingEvent(id))?;
            (event.status, event.group)
        };

        match status {
            EventStatus::Pending => {}
            EventStatus::Prevented => return self.finish_prevented(id),
            EventStatus::Applied | EventStatus::Failed => {
                return Err(ConstraintViolation::NotPending { event: id, status }.into());
            }
        }

        if item.before_scheduled {
            let choices = self.events.get(id).map(|e| e.choices.clone()).unwrap_or_default();
            self.apply_event(item, id, choices)
        } else {
            self.schedule_before(item, id, group)
        }
    }

    /// Discover before-reactions for the event (and, for a group, every
    /// sibling still waiting) and push them above it.
    fn schedule_before(
        &mut self,
        item: StackItem,
        id: EventId,
        group: Option<GroupId>,
    ) -> Result<(), EngineError> {
        let members: Vec<EventId> = match group {
            Some(group) => self
                .prevention
                .members(group)
                .filter(|m| *m == id || self.stack.awaits_before_discovery(*m))
                .collect(),
            None => vec![id],
        };

        let discovery = DiscoveryIndex::new(&self.ruleset, self.config.limits.max_reactions_per_event);
        let charged = self.limiter.clone();
        let mut found = Vec::new();
        for member in &members {
            let Some(event) = self.events.get(*member) else {
                continue;
            };
            if event.status != EventStatus::Pending {
                continue;
            }
            // a failed pre-scan leaves every member undiscovered, so no firing is kept
            let reactions = match discovery.discover_before(event, &self.state, &mut self.limiter) {
                Ok(reactions) => reactions,
                Err(err) => {
                    self.limiter = charged;
                    return Err(err.into());
                }
            };
            self.discovery_trace.push(DiscoveryRecord::new(
                Some(*member),
                ReactionTiming::Before,
                &reactions,
            ));
            found.extend(reactions);
        }

        for member in members.iter().filter(|m| **m != id) {
            self.stack.mark_before_scheduled(*member);
        }

        let mut item = item;
        item.before_scheduled = true;

        if found.is_empty() {
            let choices = self.events.get(id).map(|e| e.choices.clone()).unwrap_or_default();
            return self.apply_event(item, id, choices);
        }

        self.stack.ensure_room(found.len() + 1)?;
        self.stack.push(item)?;
        let items = self.register_reactions(found);
        self.stack.push_all(items)?;
        Ok(())
    }

    /// Fold an event into state and schedule what follows from it.
    fn apply_event(&mut self, item: StackItem, id: EventId, choices: Choices) -> Result<(), EngineError> {
        let mut event = self
            .events
            .get(id)
            .cloned()
            .ok_or(ConstraintViolation::MissingEvent(id))?;
        if event.status != EventStatus::Pending {
            return Err(ConstraintViolation::NotPending {
                event: id,
                status: event.status,
            }
            .into());
        }

        let checkpoint = self.checkpoint();
        let outcome = {
            let mut ctx = ApplyContext {
                rng: &mut self.rng,
                choices: &choices,
            };
            self.ruleset.apply_event(&event, &mut self.state, &mut ctx)
        };

        let consequences = match outcome {
            ApplyOutcome::NeedsInput(requests) => {
                self.restore(checkpoint);
                if let Some(registered) = self.events.get_mut(id) {
                    registered.choices = choices;
                }
                return self.suspend(item, requests, Vec::new());
            }
            ApplyOutcome::Applied(consequences) => consequences,
        };

        event.choices = choices;
        let result = self.commit_applied(event, consequences);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    /// Schedule what follows from an event the ruleset just folded. On error
    /// the caller rolls the fold back, so a Failed event never changed state.
    fn commit_applied(&mut self, mut event: Event, mut consequences: Vec<Consequence>) -> Result<(), EngineError> {
        let id = event.id;
        event.status = EventStatus::Applied;
        self.state_dirty = true;
        trace!(match_id = self.match_id, event = %id, event_type = %event.event_type, "applied");

        fold_engine_event(&event, &mut self.state);
        if event.is_type(&EventType::TURN_STARTED) {
            self.limiter.reset_turn();
        }
        if event.is_type(&EventType::PLAYER_CONCEDED)
            && self.state.live_player_count() <= 1
            && !self.state.game_over
        {
            consequences.push(Consequence::EndGame {
                reason: "concession".to_string(),
            });
        }

        let drafts = self.deliver(consequences, Some(&event))?;

        let discovery = DiscoveryIndex::new(&self.ruleset, self.config.limits.max_reactions_per_event);
        let after = discovery.discover_after(&event, &self.state, &mut self.limiter)?;
        self.discovery_trace
            .push(DiscoveryRecord::new(Some(id), ReactionTiming::After, &after));

        self.stack.ensure_room(drafts.len() + after.len())?;
        let mut items = self.register_reactions(after);
        items.extend(self.register_drafts(drafts, Some(id), Some(event.chain_root)));
        self.stack.push_all(items)?;

        let mut done = self
            .events
            .unregister(id)
            .ok_or(ConstraintViolation::EventUnregisteredTwice(id))?;
        done.status = EventStatus::Applied;
        done.choices = event.choices;
        self.prevention.untrack(&done);
        self.append(done);

        if event.event_type == EventType::GAME_ENDED {
            self.end_match();
        }
        Ok(())
    }

    /// Run (or resume) a reaction's effects.
    fn resolve_reaction(
        &mut self,
        item: StackItem,
        id: crate::events::ReactionId,
        staged: Vec<Consequence>,
        answers: Choices,
    ) -> Result<(), EngineError> {
        let mut reaction: Reaction = self
            .reactions
            .get(id)
            .cloned()
            .ok_or(ConstraintViolation::MissingReaction(id))?;
        reaction.choices.merge(answers);

        let event: Option<Event> = reaction
            .trigger_event
            .and_then(|e| self.events.get(e).cloned())
            .or_else(|| reaction.event_snapshot.clone());

        if reaction.cursor == 0 && staged.is_empty() && reaction.choices.is_empty() {
            let mut ctx = EvalContext::new(&self.state, reaction.controller).with_source(reaction.source);
            if let Some(event) = &event {
                ctx = ctx.with_event(event);
            }
            if !ConditionEvaluator::all(&reaction.conditions, &ctx) {
                trace!(match_id = self.match_id, reaction = %id, "conditions no longer hold");
                self.reactions
                    .unregister(id)
                    .ok_or(ConstraintViolation::ReactionUnregisteredTwice(id))?;
                return Ok(());
            }
        }

        let outcome = EffectInterpreter::run(&self.ruleset, &mut reaction, &self.state, event.as_ref(), staged);
        match outcome {
            InterpretOutcome::NeedsInput { requests, staged } => {
                if let Some(registered) = self.reactions.get_mut(id) {
                    *registered = reaction;
                }
                self.suspend(item, requests, staged)
            }
            InterpretOutcome::Done(consequences) => {
                let drafts = self.deliver(consequences, event.as_ref())?;
                self.stack.ensure_room(drafts.len())?;
                let items = self.register_drafts(
                    drafts,
                    reaction.trigger_event,
                    event.as_ref().map(|e| e.chain_root),
                );
                self.stack.push_all(items)?;

                self.reactions
                    .unregister(id)
                    .ok_or(ConstraintViolation::ReactionUnregisteredTwice(id))?;
                trace!(
                    match_id = self.match_id,
                    reaction = %id,
                    trigger = %reaction.trigger_id,
                    "reaction resolved"
                );
                Ok(())
            }
        }
    }

    /// Log a prevented event and push its notice when one is due.
    fn finish_prevented(&mut self, id: EventId) -> Result<(), EngineError> {
        let event = self
            .events
            .unregister(id)
            .ok_or(ConstraintViolation::EventUnregisteredTwice(id))?;
        self.prevention.untrack(&event);

        let notify = match self.config.prevention_notice {
            PreventionNotice::EveryMember => true,
            PreventionNotice::OriginOnly => event.prevention == Some(PreventionCause::Direct),
        };
        debug!(match_id = self.match_id, event = %id, notify, "prevented event popped");

        let notice = notify.then(|| {
            EventDraft::new(EventType::EVENT_PREVENTED)
                .with("event_id", event.id)
                .with("event_type", event.event_type.as_str())
        });
        let chain_root = event.chain_root;
        self.append(event);

        if let Some(draft) = notice {
            self.push_batch(vec![draft], Some(id), Some(chain_root))?;
        }
        Ok(())
    }

    /// Handle consequences that act immediately and collect the events to push.
    fn deliver(
        &mut self,
        consequences: Vec<Consequence>,
        origin: Option<&Event>,
    ) -> Result<Vec<EventDraft>, EngineError> {
        let mut drafts = Vec::new();
        for consequence in consequences {
            match consequence {
                Consequence::Emit(draft) => drafts.push(draft),

                Consequence::FanOut(fan_out) => {
                    let projections = Materializer::expand(&self.ruleset, &fan_out, origin, &self.state);
                    debug!(
                        match_id = self.match_id,
                        event_type = %fan_out.event_type,
                        count = projections.len(),
                        "fan-out"
                    );
                    drafts.extend(projections);
                }

                Consequence::Prevent(target) => {
                    if self.events.contains(target) {
                        self.prevention.mark_prevented(target, &mut self.events)?;
                    } else {
                        debug!(match_id = self.match_id, event = %target, "prevent target already resolved");
                    }
                }

                Consequence::SetPayload { event, key, value } => match self.events.get_mut(event) {
                    Some(target) if target.status == EventStatus::Pending => {
                        target.payload.insert(key, value);
                    }
                    _ => debug!(match_id = self.match_id, %event, "payload target not pending"),
                },

                Consequence::EndGame { reason } => drafts.push(self.game_ended(&reason)),
            }
        }
        Ok(drafts)
    }

    /// Pause the current step on the input gate.
    fn suspend(
        &mut self,
        item: StackItem,
        requests: Vec<InputRequest>,
        staged: Vec<Consequence>,
    ) -> Result<(), EngineError> {
        if requests.is_empty() {
            return Err(ConstraintViolation::NoInputRequested(format!("{:?}", item.kind)).into());
        }

        let opened = self.gate.open_requests(requests);
        debug!(
            match_id = self.match_id,
            kind = ?item.kind,
            opened = opened.len(),
            "awaiting input"
        );
        self.announce(&opened);
        self.suspended = Some(Suspension { item, staged });
        self.phase = MatchPhase::AwaitingInput;
        Ok(())
    }

    /// Continue the suspended step with the collected answers.
    fn resume(&mut self) {
        let Some(suspension) = self.suspended.take() else {
            self.on_failure(None, ConstraintViolation::NothingSuspended.into());
            return;
        };
        let answers = self.gate.take_answers();
        self.phase = MatchPhase::Resolving;

        let result = match suspension.item.kind {
            StackItemKind::Event(id) => {
                let mut choices = self.events.get(id).map(|e| e.choices.clone()).unwrap_or_default();
                choices.merge(answers);
                self.apply_event(suspension.item, id, choices)
            }
            StackItemKind::Reaction(id) => {
                self.resolve_reaction(suspension.item, id, suspension.staged, answers)
            }
        };
        if let Err(err) = result {
            self.on_failure(Some(suspension.item), err);
        }
        self.drive();
    }

    /// Apply the expiry policy to one input.
    fn expire(&mut self, id: PendingInputId) {
        let Some(pending) = self.gate.get(id).cloned() else {
            return;
        };
        let timeout = EngineError::Timeout(TimeoutError {
            input: id,
            at: self.gate.now(),
        });
        warn!(match_id = self.match_id, input = %id, "pending input expired");
        self.outbox.push(Outbound::error(&timeout));

        let fallback = match self.config.expiry_policy {
            ExpiryPolicy::DefaultAnswer => pending.default_answer,
            ExpiryPolicy::AbortAction => None,
        };
        match fallback {
            Some(answer) => {
                let opened = self.gate.answer_with(id, answer);
                self.announce(&opened);
                if self.gate.is_complete() {
                    self.resume();
                }
            }
            None => {
                self.gate.clear();
                if let Some(suspension) = self.suspended.take() {
                    debug!(match_id = self.match_id, kind = ?suspension.item.kind, "suspended step aborted");
                    self.fail_item(suspension.item);
                }
                self.phase = MatchPhase::Resolving;
                self.drive();
            }
        }
    }

    /// Fire state watchers once the stack is empty. Returns whether anything
    /// was pushed.
    fn run_state_watchers(&mut self) -> bool {
        if !self.state_dirty {
            return false;
        }
        self.state_dirty = false;

        let discovery = DiscoveryIndex::new(&self.ruleset, self.config.limits.max_reactions_per_event);
        let found = discovery.discover_state_based(&self.state);
        if found.is_empty() {
            return false;
        }

        self.watcher_passes += 1;
        let limit = self.config.limits.max_watcher_passes;
        if self.watcher_passes > limit {
            self.on_failure(None, RecursionError::WatcherPasses { limit }.into());
            return false;
        }

        self.discovery_trace
            .push(DiscoveryRecord::new(None, ReactionTiming::StateBased, &found));
        if let Err(err) = self.stack.ensure_room(found.len()) {
            self.on_failure(None, err.into());
            return false;
        }
        let items = self.register_reactions(found);
        match self.stack.push_all(items) {
            Ok(()) => true,
            Err(err) => {
                self.on_failure(None, err.into());
                false
            }
        }
    }

    // === Priority and Turns ===

    fn open_priority(&mut self) {
        let active = self.state.active_player;
        let holder = if self.state.is_eliminated(active) {
            self.state.next_live_player(active)
        } else {
            active
        };
        self.priority.open(holder);
        self.phase = MatchPhase::AwaitingAction;
        self.outbox.push(Outbound::PriorityChanged {
            active_player_id: holder,
            window_open: true,
        });
    }

    fn pass(&mut self, player: PlayerId) -> Result<(), EngineError> {
        match self.priority.pass(player, &self.state) {
            PassOutcome::NotHolder => Err(ValidationError::NotPriorityHolder { player }.into()),
            PassOutcome::Passed { next } => {
                self.outbox.push(Outbound::PriorityChanged {
                    active_player_id: next,
                    window_open: true,
                });
                Ok(())
            }
            PassOutcome::AllPassed => {
                self.priority.close();
                self.phase = if self.stack.is_empty() {
                    MatchPhase::Advancing
                } else {
                    MatchPhase::Resolving
                };
                self.outbox.push(Outbound::PriorityChanged {
                    active_player_id: self.priority.holder(),
                    window_open: false,
                });
                Ok(())
            }
        }
    }

    /// Push the events for the next position in the turn structure.
    fn advance(&mut self) {
        let phase = self.state.phase_index;
        let step = self.state.step_index;
        let active = self.state.active_player;
        let turn = self.state.turn_number;

        let drafts = {
            let structure = self.ruleset.turn_structure();
            if structure.step(phase, step + 1).is_some() {
                self.step_entry(phase, step + 1)
            } else {
                let mut drafts = Vec::new();
                if structure.phase(phase).is_some() {
                    drafts.push(EventDraft::new(EventType::PHASE_ENDED).with("phase", phase as i64));
                }
                if structure.phase(phase + 1).is_some() {
                    drafts.extend(self.phase_entry(phase + 1));
                } else {
                    drafts.push(
                        EventDraft::new(EventType::TURN_ENDED)
                            .with("turn", i64::from(turn))
                            .with("player", active),
                    );
                    if structure.is_last_turn(turn) {
                        drafts.push(self.game_ended("turn limit"));
                    } else {
                        let next = self.state.next_live_player(active);
                        drafts.extend(self.turn_opening(turn + 1, next));
                    }
                }
                drafts
            }
        };

        debug!(match_id = self.match_id, turn, phase, step, "advancing");
        self.phase = MatchPhase::Resolving;
        if let Err(err) = self.push_batch(drafts, None, None) {
            self.on_failure(None, err);
        }
    }

    fn turn_opening(&self, turn: u32, player: PlayerId) -> Vec<EventDraft> {
        let mut drafts = vec![EventDraft::new(EventType::TURN_STARTED)
            .with("turn", i64::from(turn))
            .with("player", player)];
        if self.ruleset.turn_structure().phase(0).is_some() {
            drafts.extend(self.phase_entry(0));
        }
        drafts
    }

    fn phase_entry(&self, phase: usize) -> Vec<EventDraft> {
        let name = self
            .ruleset
            .turn_structure()
            .phase(phase)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let mut drafts = vec![EventDraft::new(EventType::PHASE_STARTED)
            .with("phase", phase as i64)
            .with("name", name)];
        drafts.extend(self.step_entry(phase, 0));
        drafts
    }

    fn step_entry(&self, phase: usize, step: usize) -> Vec<EventDraft> {
        let Some(def) = self.ruleset.turn_structure().step(phase, step) else {
            return Vec::new();
        };
        let mut drafts = vec![EventDraft::new(EventType::STEP_STARTED)
            .with("phase", phase as i64)
            .with("step", step as i64)
            .with("name", def.name.as_str())];
        if def.mandatory {
            drafts.extend(def.on_enter.iter().map(|event_type| {
                EventDraft::new(event_type)
                    .with("phase", phase as i64)
                    .with("step", step as i64)
            }));
        }
        drafts
    }

    fn game_ended(&self, reason: &str) -> EventDraft {
        let mut draft = EventDraft::new(EventType::GAME_ENDED).with("reason", reason);
        let mut live = self.state.live_players();
        if let (Some(winner), None) = (live.next(), live.next()) {
            draft = draft.with("winner", winner);
        }
        draft
    }

    // === Registration and Logging ===

    /// Register drafts and push them so the first resolves first.
    fn push_batch(
        &mut self,
        drafts: Vec<EventDraft>,
        caused_by: Option<EventId>,
        chain_root: Option<EventId>,
    ) -> Result<(), EngineError> {
        self.stack.ensure_room(drafts.len())?;
        let items = self.register_drafts(drafts, caused_by, chain_root);
        self.stack.push_all(items)?;
        Ok(())
    }

    /// Register drafts as pending events. Group tags map to fresh group ids,
    /// shared by every draft of the batch carrying the same tag.
    fn register_drafts(
        &mut self,
        drafts: Vec<EventDraft>,
        caused_by: Option<EventId>,
        chain_root: Option<EventId>,
    ) -> Vec<StackItem> {
        let mut groups: FxHashMap<GroupTag, GroupId> = FxHashMap::default();
        let mut items = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let group = draft
                .group
                .map(|tag| *groups.entry(tag).or_insert_with(|| self.prevention.allocate_group()));
            let order = self.stack.next_order();
            let id = self.events.peek_next_id();
            let event = Event {
                id,
                event_type: draft.event_type,
                payload: draft.payload,
                caused_by,
                chain_root: chain_root.unwrap_or(id),
                order,
                status: EventStatus::Pending,
                group,
                prevents_group: draft.prevents_group,
                prevention: None,
                choices: Choices::new(),
            };
            self.prevention.track(&event);
            let id = self.events.register(event);
            items.push(StackItem::event(id, order));
        }
        items
    }

    fn register_reactions(&mut self, reactions: Vec<Reaction>) -> Vec<StackItem> {
        reactions
            .into_iter()
            .map(|reaction| {
                let order = self.stack.next_order();
                let id = self.reactions.register(reaction);
                StackItem::reaction(id, order)
            })
            .collect()
    }

    fn append(&mut self, event: Event) {
        self.sink.append_events(std::slice::from_ref(&event));
        self.log.push(event.clone());
        self.outbox.push(Outbound::EventAppended { event });
    }

    fn announce(&mut self, opened: &[PendingInput]) {
        self.outbox.extend(opened.iter().map(Outbound::pending));
    }

    // === Failure ===

    fn on_failure(&mut self, item: Option<StackItem>, err: EngineError) {
        if let Some(item) = item {
            self.fail_item(item);
        }
        self.outbox.push(Outbound::error(&err));

        match &err {
            EngineError::Recursion(guard) if self.ruleset.is_recoverable(guard) => {
                warn!(match_id = self.match_id, error = %guard, "resolution guard tripped, continuing");
            }
            _ => {
                error!(match_id = self.match_id, error = %err, "match halted");
                self.halt(err.to_string());
            }
        }
    }

    /// Mark an item Failed (events) or discard it (reactions).
    fn fail_item(&mut self, item: StackItem) {
        match item.kind {
            StackItemKind::Event(id) => {
                if let Some(mut event) = self.events.unregister(id) {
                    if event.status == EventStatus::Pending {
                        event.status = EventStatus::Failed;
                    }
                    self.prevention.untrack(&event);
                    self.append(event);
                }
            }
            StackItemKind::Reaction(id) => {
                self.reactions.unregister(id);
            }
        }
    }

    fn trip_iteration_guard(&mut self, item: StackItem, err: RecursionError) {
        self.fail_item(item);
        for rest in self.stack.drain() {
            self.fail_item(rest);
        }
        self.events.clear();
        self.reactions.clear();
        self.prevention.clear();
        self.on_failure(None, err.into());
    }

    fn checkpoint(&self) -> FoldCheckpoint {
        FoldCheckpoint {
            state: self.state.clone(),
            rng: self.rng.clone(),
            limiter: self.limiter.clone(),
        }
    }

    fn restore(&mut self, checkpoint: FoldCheckpoint) {
        self.state = checkpoint.state;
        self.rng = checkpoint.rng;
        self.limiter = checkpoint.limiter;
    }

    fn halt(&mut self, reason: String) {
        self.priority.close();
        self.phase = MatchPhase::Halted;
        self.halt_reason = Some(reason);
    }

    fn end_match(&mut self) {
        self.state.game_over = true;
        self.stack.clear();
        self.events.clear();
        self.reactions.clear();
        self.prevention.clear();
        self.gate.clear();
        self.suspended = None;
        self.resolve_floor = None;
        self.priority.close();
        self.phase = MatchPhase::Ended;
        debug!(match_id = self.match_id, turn = self.state.turn_number, "match ended");
        self.outbox.push(Outbound::PriorityChanged {
            active_player_id: self.state.active_player,
            window_open: false,
        });
    }
}

/// State bookkeeping for the engine's own boundary events.
///
/// Runs after the ruleset folded the event, both live and in replay.
pub(crate) fn fold_engine_event(event: &Event, state: &mut GameState) {
    let index = |key: &str| event.payload.int(key).and_then(|v| usize::try_from(v).ok());
    let event_type = &event.event_type;

    if *event_type == EventType::TURN_STARTED {
        let turn = event.payload.int("turn").and_then(|v| u32::try_from(v).ok());
        if let (Some(turn), Some(player)) = (turn, event.payload.player("player")) {
            state.begin_turn(turn, player);
        }
    } else if *event_type == EventType::PHASE_STARTED {
        if let Some(phase) = index("phase") {
            state.phase_index = phase;
            state.step_index = 0;
        }
    } else if *event_type == EventType::STEP_STARTED {
        if let (Some(phase), Some(step)) = (index("phase"), index("step")) {
            state.phase_index = phase;
            state.step_index = step;
        }
    } else if *event_type == EventType::PLAYER_CONCEDED {
        if let Some(player) = event.payload.player("player") {
            state.eliminate(player);
        }
    } else if *event_type == EventType::GAME_ENDED {
        state.game_over = true;
    }
}
