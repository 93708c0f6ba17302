//! The game context: the root state-holder and the resolution kernel.
//!
//! A `Game` owns everything: the state tables, the subscriber store, the
//! subscriber registry, and a stack of action queues whose bottom entry is
//! the main queue. Exactly one queue is *active* at any moment, the top of
//! the stack, and every produced action is enqueued there.
//!
//! ## The drain
//!
//! Draining a queue repeats until it is empty:
//!
//! 1. Pop the *batch*: every pending action tied for the highest priority,
//!    in enqueue order.
//! 2. Emit a pre event for each batch action into a fresh sub-queue, drain
//!    it completely, and fold its history into this queue's.
//! 3. For each batch action in order: skip it if cancelled; otherwise run
//!    it and emit its post event. Post responses (and any events emitted by
//!    the action itself, such as status changes) collect into a second
//!    sub-queue, drained after the batch, its history folded in likewise.
//! 4. Record each batch action in this queue's history, tagged ran,
//!    cancelled, or failed.
//!
//! Sub-queues drain eagerly, so pre-responses take effect before the parent
//! action runs, regardless of their nominal priority. Cancellation is
//! cooperative: a `Cancel` action resolving in the pre phase suppresses the
//! target's run and post event, but the pre history is retained.
//!
//! ## Event processing
//!
//! `process_event` dispatches to the registry snapshot, gates each
//! subscriber's production through its constraints, and enqueues what
//! passes into the active queue. During an `instant` phase the main queue
//! then drains immediately; during an `end_of_phase` phase actions
//! accumulate until the phase ends.

pub mod behavior;

pub use behavior::Behavior;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::abilities::ability::{Ability, AbilityArgs};
use crate::abilities::constraint::UsageLedger;
use crate::abilities::trigger::Trigger;
use crate::actions::action::{Action, ActionId, ActionKind, ActionSpec};
use crate::actions::queue::{ActionQueue, ActionStatus, HistoryEntry, MAX_DEPTH};
use crate::auxiliary::tally::Tally;
use crate::auxiliary::{AuxKind, AuxObject, Ender, GAME_ENDER_KEY, LYNCH_TALLY_KEY};
use crate::core::config::GameConfig;
use crate::core::entity::ObjectId;
use crate::core::error::{ActionError, Diagnostic, DiagnosticKind, EngineError, VetoReason};
use crate::core::rng::GameRng;
use crate::events::event::{Event, EventPayload};
use crate::events::registry::SubscriberRegistry;
use crate::outcomes::{Outcome, OutcomeChecker};
use crate::state::actor::{Actor, Faction};
use crate::state::phase::{Phase, PhaseCycle, ResolutionPolicy, SHUTDOWN};
use crate::state::status::{StatusValue, DEAD, OUTCOME};
use crate::state::GameState;

/// The root of one game.
#[derive(Debug)]
pub struct Game {
    state: GameState,
    subscribers: FxHashMap<ObjectId, Behavior>,
    registry: SubscriberRegistry,
    aux_keys: FxHashMap<String, ObjectId>,

    /// Queue stack; index 0 is the main queue, the top is active.
    queues: Vec<ActionQueue>,
    cancelled: FxHashSet<ActionId>,
    usage: UsageLedger,

    diagnostics: Vec<Diagnostic>,
    journal: Vec<Event>,
    rng: GameRng,
    next_event_seq: u64,
    next_action_id: u64,
}

impl Game {
    /// Create a game from a configuration.
    pub fn new(config: GameConfig) -> Result<Self, EngineError> {
        let phases = PhaseCycle::new(config.cycle.clone())?;
        let mut game = Self {
            state: GameState::new(phases),
            subscribers: FxHashMap::default(),
            registry: SubscriberRegistry::new(),
            aux_keys: FxHashMap::default(),
            queues: vec![ActionQueue::new()],
            cancelled: FxHashSet::default(),
            usage: UsageLedger::new(),
            diagnostics: Vec::new(),
            journal: Vec::new(),
            rng: GameRng::new(config.seed),
            next_event_seq: 0,
            next_action_id: 0,
        };

        if config.lynch_tally {
            let day = config.cycle[0].name.clone();
            game.register_aux(AuxObject::new(
                ObjectId(0),
                LYNCH_TALLY_KEY,
                AuxKind::Tally(Tally::new(day)),
            ))?;
        }
        if config.game_ender {
            game.register_aux(AuxObject::new(
                ObjectId(0),
                GAME_ENDER_KEY,
                AuxKind::Ender(Ender::new()),
            ))?;
        }
        Ok(game)
    }

    // === Setup (driver surface) ===

    /// Add an actor. Legal only during `startup`.
    pub fn add_actor(&mut self, name: &str) -> Result<ObjectId, EngineError> {
        if !self.state.phases.current().is_startup() {
            return Err(EngineError::InvalidPhaseTransition(
                "actors can only be added during startup".into(),
            ));
        }
        let id = self.state.alloc_id();
        self.state.claim_name(name, id)?;
        self.state.insert_actor(Actor::new(id, name));
        Ok(id)
    }

    /// Add a faction. Legal only during `startup`.
    pub fn add_faction(&mut self, name: &str) -> Result<ObjectId, EngineError> {
        if !self.state.phases.current().is_startup() {
            return Err(EngineError::InvalidPhaseTransition(
                "factions can only be added during startup".into(),
            ));
        }
        let id = self.state.alloc_id();
        self.state.claim_name(name, id)?;
        self.state.insert_faction(Faction::new(id, name));
        Ok(id)
    }

    /// Add an actor to a faction. Direct mutation, legal at any time.
    pub fn join_faction(&mut self, actor: ObjectId, faction: ObjectId) {
        self.state.join_faction(actor, faction);
    }

    /// Remove an actor from a faction.
    pub fn leave_faction(&mut self, actor: ObjectId, faction: ObjectId) {
        self.state.leave_faction(actor, faction);
    }

    /// Register an ability. An id of 0 is replaced with a fresh one.
    ///
    /// Abilities may be added mid-game.
    pub fn add_ability(&mut self, mut ability: Ability) -> Result<ObjectId, EngineError> {
        if self.state.actor(ability.owner).is_none() {
            return Err(EngineError::EngineBug(format!(
                "ability owner does not exist: {}",
                ability.owner
            )));
        }
        if ability.id.raw() == 0 {
            ability.id = self.state.alloc_id();
        }
        let id = ability.id;
        let owner = ability.owner;
        self.install(Behavior::Ability(ability));
        if let Some(actor) = self.state.actor_mut(owner) {
            actor.abilities.push(id);
        }
        Ok(id)
    }

    /// Register a trigger. An id of 0 is replaced with a fresh one.
    ///
    /// Triggers may be added mid-game.
    pub fn add_trigger(&mut self, mut trigger: Trigger) -> Result<ObjectId, EngineError> {
        if self.state.actor(trigger.owner).is_none() {
            return Err(EngineError::EngineBug(format!(
                "trigger owner does not exist: {}",
                trigger.owner
            )));
        }
        if trigger.id.raw() == 0 {
            trigger.id = self.state.alloc_id();
        }
        let id = trigger.id;
        let owner = trigger.owner;
        self.install(Behavior::Trigger(trigger));
        if let Some(actor) = self.state.actor_mut(owner) {
            actor.triggers.push(id);
        }
        Ok(id)
    }

    /// Register an outcome checker. An id of 0 is replaced with a fresh one.
    pub fn add_checker(&mut self, mut checker: OutcomeChecker) -> Result<ObjectId, EngineError> {
        if self.state.faction(checker.faction).is_none() {
            return Err(EngineError::EngineBug(format!(
                "checker faction does not exist: {}",
                checker.faction
            )));
        }
        if checker.id.raw() == 0 {
            checker.id = self.state.alloc_id();
        }
        let id = checker.id;
        let faction = checker.faction;
        self.install(Behavior::Checker(checker));
        if let Some(f) = self.state.faction_mut(faction) {
            f.checkers.push(id);
        }
        Ok(id)
    }

    /// Register an aux object under its unique key. An id of 0 is replaced
    /// with a fresh one.
    pub fn register_aux(&mut self, mut aux: AuxObject) -> Result<ObjectId, EngineError> {
        if self.aux_keys.contains_key(&aux.key) {
            return Err(EngineError::DuplicateKey(aux.key.clone()));
        }
        if aux.id.raw() == 0 {
            aux.id = self.state.alloc_id();
        }
        let id = aux.id;
        self.aux_keys.insert(aux.key.clone(), id);
        self.install(Behavior::Aux(aux));
        Ok(id)
    }

    /// Remove a subscriber from the registry and the store.
    pub fn unregister(&mut self, id: ObjectId) {
        self.registry.unregister(id);
        if let Some(behavior) = self.subscribers.remove(&id) {
            if let Some(aux) = behavior.as_aux() {
                self.aux_keys.remove(&aux.key);
            }
        }
    }

    fn install(&mut self, behavior: Behavior) {
        let id = behavior.id();
        for key in behavior.subscriptions() {
            self.registry.register(key, id);
        }
        self.subscribers.insert(id, behavior);
    }

    // === Stimuli (driver surface) ===

    /// Process an externally supplied event: dispatch, enqueue responses
    /// into the active queue, and drain if the current phase is instant.
    pub fn process_event(&mut self, payload: EventPayload) -> Result<(), EngineError> {
        self.emit(payload);
        self.drain_if_instant()
    }

    /// Activate an actor's ability by name.
    ///
    /// Returns `InvalidActivation` when a constraint vetoed the production
    /// (the rest of the dispatch is unaffected), and `UnknownKind` when the
    /// actor has no such ability.
    pub fn activate(
        &mut self,
        actor: ObjectId,
        ability_name: &str,
        args: AbilityArgs,
    ) -> Result<(), EngineError> {
        if self.state.phases.current().is_shutdown() {
            return Err(EngineError::InvalidActivation(VetoReason::GameEnded));
        }
        let owner = self
            .state
            .actor(actor)
            .ok_or_else(|| EngineError::EngineBug(format!("no such actor: {actor}")))?;
        let ability = owner
            .abilities
            .iter()
            .copied()
            .find(|id| {
                matches!(self.subscribers.get(id),
                    Some(Behavior::Ability(a)) if a.name == ability_name)
            })
            .ok_or_else(|| EngineError::UnknownKind(ability_name.to_string()))?;

        let vetoes = self.emit(EventPayload::Activate { ability, args });
        self.drain_if_instant()?;

        if let Some((_, reason)) = vetoes.into_iter().find(|(id, _)| *id == ability) {
            return Err(EngineError::InvalidActivation(reason));
        }
        Ok(())
    }

    /// Advance to the next phase in the progression.
    ///
    /// Emits the phase-change event, then drains the main queue, which
    /// resolves the outgoing phase's accumulated actions, any lynch or
    /// outcome actions the event produced, and finally the transition
    /// itself.
    pub fn advance_phase(&mut self) -> Result<Phase, EngineError> {
        let from = self.state.phases.current();
        if from.is_shutdown() {
            return Err(EngineError::InvalidPhaseTransition(
                "shutdown is terminal".into(),
            ));
        }
        let to = self.state.phases.peek_next()?;
        self.transition(from, to)
    }

    /// Jump forward to a named phase. Admin/debug surface; `"shutdown"` is
    /// the only legal terminal target.
    pub fn set_phase(&mut self, name: &str) -> Result<Phase, EngineError> {
        let from = self.state.phases.current();
        if from.is_shutdown() {
            return Err(EngineError::InvalidPhaseTransition(
                "shutdown is terminal".into(),
            ));
        }
        let to = self.state.phases.resolve(name)?;
        self.transition(from, to)
    }

    fn transition(&mut self, from: Phase, to: Phase) -> Result<Phase, EngineError> {
        debug!(from = %from, to = %to, "phase transition");
        self.emit(EventPayload::PhaseChange {
            from,
            to: to.clone(),
        });
        self.enqueue(ActionSpec::new(
            ObjectId::GAME,
            ActionKind::Transition { to },
        ));
        self.drain_top()?;
        Ok(self.state.phases.current())
    }

    /// Enqueue an action into the active queue. Low-level surface for
    /// drivers and rule code; most actions arrive via handlers.
    pub fn enqueue(&mut self, spec: ActionSpec) -> ActionId {
        let id = ActionId(self.next_action_id);
        self.next_action_id += 1;
        self.top_queue_mut().enqueue(Action::from_spec(id, spec));
        id
    }

    /// Drain the main queue to empty. No-op while a drain is in progress.
    pub fn drain(&mut self) -> Result<(), EngineError> {
        if self.queues.len() == 1 {
            self.drain_top()?;
        }
        Ok(())
    }

    // === Queries (driver surface) ===

    /// Read-only view of the game state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The current phase.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.state.phases.current()
    }

    /// Has the game reached `shutdown`?
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state.phases.current().is_shutdown()
    }

    /// The full history of the main queue, in execution order.
    #[must_use]
    pub fn history(&self) -> &im::Vector<HistoryEntry> {
        self.queues[0].history()
    }

    /// History entries from the given index onward.
    #[must_use]
    pub fn history_since(&self, index: usize) -> Vec<HistoryEntry> {
        self.history().iter().skip(index).cloned().collect()
    }

    /// Look up an actor id by name.
    #[must_use]
    pub fn actor_id(&self, name: &str) -> Option<ObjectId> {
        self.state.actor_by_name(name).map(|a| a.id)
    }

    /// The aux object registered under a key.
    #[must_use]
    pub fn aux(&self, key: &str) -> Option<&AuxObject> {
        self.aux_keys
            .get(key)
            .and_then(|id| self.subscribers.get(id))
            .and_then(Behavior::as_aux)
    }

    /// The built-in lynch tally, if registered.
    #[must_use]
    pub fn tally(&self) -> Option<&Tally> {
        match self.aux(LYNCH_TALLY_KEY).map(|a| &a.kind) {
            Some(AuxKind::Tally(tally)) => Some(tally),
            _ => None,
        }
    }

    /// The lynch tally's current leader.
    #[must_use]
    pub fn tally_leader(&self) -> Option<ObjectId> {
        self.tally().and_then(Tally::leader)
    }

    /// Achieved outcomes per faction, read from member statuses.
    #[must_use]
    pub fn outcomes(&self) -> Vec<(ObjectId, Outcome)> {
        let mut result = Vec::new();
        for &fid in self.state.faction_ids() {
            let Some(faction) = self.state.faction(fid) else {
                continue;
            };
            let outcome = faction
                .members
                .iter()
                .filter_map(|&m| self.state.actor(m).and_then(|a| a.status.outcome()))
                .next();
            if let Some(outcome) = outcome {
                result.push((fid, outcome));
            }
        }
        result
    }

    /// Every event emitted so far, in emission order. In-memory only;
    /// drivers project their UI from this and from the history.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.journal
    }

    /// Events with a sequence number at or above `seq`.
    #[must_use]
    pub fn events_since(&self, seq: u64) -> &[Event] {
        let start = self.journal.partition_point(|e| e.seq < seq);
        &self.journal[start..]
    }

    /// Drain the diagnostics channel.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    // === The kernel ===

    fn top_queue_mut(&mut self) -> &mut ActionQueue {
        self.queues.last_mut().expect("queue stack is never empty")
    }

    fn drain_if_instant(&mut self) -> Result<(), EngineError> {
        if self.queues.len() == 1
            && self.state.phases.current().policy == ResolutionPolicy::Instant
        {
            self.drain_top()?;
        }
        Ok(())
    }

    /// Dispatch an event to the registry snapshot, gate each production
    /// through the producer's constraints, and enqueue what passes into
    /// the active queue. Returns the vetoes of this dispatch.
    fn emit(&mut self, payload: EventPayload) -> Vec<(ObjectId, VetoReason)> {
        let seq = self.next_event_seq;
        self.next_event_seq += 1;
        let event = Event { seq, payload };
        trace!(seq, "dispatching event");
        self.journal.push(event.clone());

        let mut vetoes = Vec::new();
        for id in self.registry.snapshot(&event) {
            let produced = {
                let Some(behavior) = self.subscribers.get_mut(&id) else {
                    continue;
                };
                behavior.handle(&self.state, &event)
            };
            if produced.is_empty() {
                continue;
            }

            let (constraints, owner_actor) = match self.subscribers.get(&id) {
                Some(b) => (b.constraints().to_vec(), b.owner_actor()),
                None => (Vec::new(), None),
            };

            let mut verdict = Ok(());
            'gate: for spec in &produced {
                for constraint in &constraints {
                    if let Err(reason) =
                        constraint.check(&self.state, &self.usage, id, owner_actor, spec)
                    {
                        verdict = Err(reason);
                        break 'gate;
                    }
                }
            }

            match verdict {
                Ok(()) => {
                    let keys: Vec<String> = constraints
                        .iter()
                        .filter_map(|c| c.usage_key().map(str::to_string))
                        .collect();
                    self.usage.record(id, keys);
                    for spec in produced {
                        self.enqueue(spec);
                    }
                }
                Err(reason) => {
                    debug!(owner = %id, %reason, "production vetoed");
                    self.diagnostics.push(Diagnostic {
                        seq,
                        detail: DiagnosticKind::Veto {
                            owner: id,
                            reason: reason.clone(),
                        },
                    });
                    vetoes.push((id, reason));
                }
            }
        }
        vetoes
    }

    fn push_subqueue(&mut self) -> Result<(), EngineError> {
        if self.queues.len() as u32 > MAX_DEPTH {
            return Err(EngineError::EngineBug(format!(
                "action queue depth exceeded {MAX_DEPTH}"
            )));
        }
        self.queues.push(ActionQueue::new());
        Ok(())
    }

    fn pop_subqueue(&mut self) -> Result<ActionQueue, EngineError> {
        if self.queues.len() <= 1 {
            return Err(EngineError::EngineBug("queue stack underflow".into()));
        }
        Ok(self.queues.pop().expect("length checked above"))
    }

    /// Drain the active queue to empty.
    fn drain_top(&mut self) -> Result<(), EngineError> {
        loop {
            let batch = self.top_queue_mut().pop_batch();
            if batch.is_empty() {
                return Ok(());
            }

            // Pre events; responses drain in their own sub-queue before
            // any batch action runs.
            self.push_subqueue()?;
            for action in &batch {
                self.emit(EventPayload::PreAction(action.view()));
            }
            self.drain_top()?;
            let sub = self.pop_subqueue()?;
            self.top_queue_mut().absorb_history(sub.into_history());

            // Run phase. Post responses and run-emitted events collect in
            // a second sub-queue, drained after the whole batch.
            self.push_subqueue()?;
            let mut entries = Vec::with_capacity(batch.len());
            for action in &batch {
                if self.cancelled.contains(&action.id) {
                    trace!(action = %action.id, "cancelled, skipping run");
                    entries.push(HistoryEntry {
                        action: action.view(),
                        status: ActionStatus::Cancelled,
                    });
                    continue;
                }
                match self.run_action(action) {
                    Ok(()) => {
                        let post = self.post_payload(action);
                        self.emit(post);
                        entries.push(HistoryEntry {
                            action: action.view(),
                            status: ActionStatus::Ran,
                        });
                    }
                    Err(err) => {
                        warn!(action = %action.id, %err, "action failed");
                        self.diagnostics.push(Diagnostic {
                            seq: self.next_event_seq,
                            detail: DiagnosticKind::ActionFailed {
                                action: action.id,
                                message: err.to_string(),
                            },
                        });
                        entries.push(HistoryEntry {
                            action: action.view(),
                            status: ActionStatus::Failed {
                                message: err.to_string(),
                            },
                        });
                    }
                }
            }
            self.drain_top()?;
            let sub = self.pop_subqueue()?;
            self.top_queue_mut().absorb_history(sub.into_history());

            for entry in entries {
                self.top_queue_mut().record(entry);
            }
        }
    }

    fn post_payload(&self, action: &Action) -> EventPayload {
        match &action.kind {
            ActionKind::Outcome { faction, outcome } => EventPayload::OutcomeAchieved {
                faction: *faction,
                outcome: *outcome,
                action: action.view(),
            },
            ActionKind::EndGame { .. } => EventPayload::GameEnded {
                outcomes: self.outcomes(),
                action: action.view(),
            },
            _ => EventPayload::PostAction(action.view()),
        }
    }

    /// Execute one action's mutation.
    fn run_action(&mut self, action: &Action) -> Result<(), ActionError> {
        match &action.kind {
            ActionKind::Kill { target } | ActionKind::Lynch { target } => {
                self.write_status(*target, DEAD, Some(StatusValue::Bool(true)))
            }
            // Tallies observe the post event; the vote itself mutates
            // nothing.
            ActionKind::Vote { .. } => Ok(()),
            ActionKind::Cancel { target } => {
                self.cancelled.insert(*target);
                Ok(())
            }
            ActionKind::Protect { target } => {
                if self.state.actor(*target).is_none() {
                    return Err(ActionError::MissingActor(*target));
                }
                let id = self.state.alloc_id();
                let guard = AuxObject::new(
                    id,
                    format!("guard.{}", action.id.raw()),
                    AuxKind::KillGuard { target: *target },
                )
                .phase_scoped();
                self.aux_keys.insert(guard.key.clone(), id);
                self.install(Behavior::Aux(guard));
                Ok(())
            }
            ActionKind::Outcome { faction, outcome } => {
                let members = self
                    .state
                    .faction(*faction)
                    .ok_or(ActionError::MissingFaction(*faction))?
                    .members
                    .clone();
                for member in members {
                    self.write_status(member, OUTCOME, Some(StatusValue::Outcome(*outcome)))?;
                }
                Ok(())
            }
            ActionKind::EndGame { .. } => {
                if !self.state.phases.current().is_shutdown() {
                    let shutdown = self
                        .state
                        .phases
                        .resolve(SHUTDOWN)
                        .map_err(|_| ActionError::MissingPhase(SHUTDOWN.into()))?;
                    self.state
                        .phases
                        .advance_to(&shutdown)
                        .map_err(|_| ActionError::MissingPhase(SHUTDOWN.into()))?;
                    self.end_phase_housekeeping();
                }
                Ok(())
            }
            ActionKind::Transition { to } => {
                // The game may have ended mid-drain; shutdown is sticky.
                if self.state.phases.current().is_shutdown() {
                    return Ok(());
                }
                let to = to.clone();
                self.state
                    .phases
                    .advance_to(&to)
                    .map_err(|_| ActionError::MissingPhase(to.name()))?;
                self.end_phase_housekeeping();
                Ok(())
            }
            ActionKind::SetStatus { actor, key, value } => {
                self.write_status(*actor, key, value.clone())
            }
        }
    }

    /// Write a status key and emit the change event synchronously.
    /// Handlers of the event observe the new value.
    fn write_status(
        &mut self,
        actor: ObjectId,
        key: &str,
        value: Option<StatusValue>,
    ) -> Result<(), ActionError> {
        let old = {
            let entry = self
                .state
                .actor_mut(actor)
                .ok_or(ActionError::MissingActor(actor))?;
            match &value {
                Some(v) => entry.status.set(key, v.clone()),
                None => entry.status.remove(key),
            }
        };
        if old != value {
            self.emit(EventPayload::StatusChange {
                actor,
                key: key.to_string(),
                old,
                new: value,
            });
        }
        Ok(())
    }

    /// Per-phase cleanup, run when a transition action executes: usage
    /// counters reset and phase-scoped aux objects unregister.
    fn end_phase_housekeeping(&mut self) {
        self.usage.clear();
        let expired: Vec<ObjectId> = self
            .subscribers
            .values()
            .filter_map(Behavior::as_aux)
            .filter(|aux| aux.phase_scoped)
            .map(|aux| aux.id)
            .collect();
        for id in expired {
            self.unregister(id);
        }
    }
}
