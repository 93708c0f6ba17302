//! Auxiliary objects.
//!
//! An aux object is a free-form subscriber registered under a unique string
//! key (duplicate keys are a setup error). Lifetime is independent of actors
//! and factions; phase-scoped aux objects are unregistered when the phase
//! transition action runs. The built-in kinds:
//!
//! - [`Tally`]: vote bookkeeping plus the lynch on day end.
//! - `Ender`: watches achieved outcomes and ends the game once every
//!   faction is settled.
//! - `KillGuard`: cancels kills against one actor; created by `Protect`
//!   actions and scoped to the current phase.

pub mod tally;

pub use tally::Tally;

use serde::{Deserialize, Serialize};

use crate::actions::action::{ActionKind, ActionSpec, ActionTag};
use crate::core::entity::ObjectId;
use crate::events::event::{Event, EventKey, EventPayload};
use crate::outcomes::Outcome;
use crate::state::GameState;

/// Reserved key of the built-in lynch tally.
pub const LYNCH_TALLY_KEY: &str = "tally.lynch";

/// Reserved key of the built-in game ender.
pub const GAME_ENDER_KEY: &str = "game.ender";

/// The behavior of an aux object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuxKind {
    /// Vote tally; lynches the leader when its phase ends.
    Tally(Tally),

    /// Ends the game when every faction is settled.
    Ender(Ender),

    /// Cancels kills against `target`.
    KillGuard { target: ObjectId },
}

/// A keyed auxiliary subscriber.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuxObject {
    /// Stable id.
    pub id: ObjectId,

    /// Unique registration key.
    pub key: String,

    /// Unregister when the current phase ends.
    pub phase_scoped: bool,

    /// What the object does.
    pub kind: AuxKind,
}

impl AuxObject {
    /// Create an aux object.
    pub fn new(id: ObjectId, key: impl Into<String>, kind: AuxKind) -> Self {
        Self {
            id,
            key: key.into(),
            phase_scoped: false,
            kind,
        }
    }

    /// Scope the object to the current phase (builder pattern).
    #[must_use]
    pub fn phase_scoped(mut self) -> Self {
        self.phase_scoped = true;
        self
    }

    /// Events this object listens to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<EventKey> {
        match self.kind {
            AuxKind::Tally(_) => vec![
                EventKey::PostAction(Some(ActionTag::Vote)),
                EventKey::PhaseChange,
            ],
            AuxKind::Ender(_) => vec![EventKey::OutcomeAchieved],
            AuxKind::KillGuard { .. } => vec![EventKey::PreAction(Some(ActionTag::Kill))],
        }
    }

    /// React to an event.
    pub fn handle(&mut self, state: &GameState, event: &Event) -> Vec<ActionSpec> {
        let id = self.id;
        match &mut self.kind {
            AuxKind::Tally(tally) => match &event.payload {
                EventPayload::PostAction(view) => {
                    if let ActionKind::Vote { voter, target } = view.kind {
                        tally.record(voter, target);
                    }
                    Vec::new()
                }
                EventPayload::PhaseChange { from, .. } => {
                    let mut produced = Vec::new();
                    if from.base == tally.phase {
                        if let Some(leader) = tally.leader() {
                            produced.push(ActionSpec::lynch(id, leader));
                        }
                    }
                    tally.reset();
                    produced
                }
                _ => Vec::new(),
            },
            AuxKind::Ender(ender) => match &event.payload {
                EventPayload::OutcomeAchieved {
                    faction, outcome, ..
                } => ender.observe(id, state, *faction, *outcome),
                _ => Vec::new(),
            },
            AuxKind::KillGuard { target } => match &event.payload {
                EventPayload::PreAction(view) => match view.kind {
                    ActionKind::Kill { target: victim } if victim == *target => {
                        vec![ActionSpec::cancel(id, view.id)]
                    }
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            },
        }
    }
}

/// Ends the game when all factions are settled.
///
/// A faction is settled when it has no living members, or when every living
/// member carries an outcome status.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ender {
    outcomes: Vec<(ObjectId, Outcome)>,
    fired: bool,
}

impl Ender {
    /// Create an ender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes recorded so far, in achievement order.
    #[must_use]
    pub fn outcomes(&self) -> &[(ObjectId, Outcome)] {
        &self.outcomes
    }

    fn settled(state: &GameState, faction: ObjectId) -> bool {
        state
            .living_members(faction)
            .iter()
            .all(|&m| state.actor(m).is_some_and(|a| a.status.outcome().is_some()))
    }

    fn observe(
        &mut self,
        self_id: ObjectId,
        state: &GameState,
        faction: ObjectId,
        outcome: Outcome,
    ) -> Vec<ActionSpec> {
        if let Some(entry) = self.outcomes.iter_mut().find(|(f, _)| *f == faction) {
            entry.1 = outcome;
        } else {
            self.outcomes.push((faction, outcome));
        }

        if self.fired {
            return Vec::new();
        }
        let all_settled = state
            .faction_ids()
            .iter()
            .all(|&f| Self::settled(state, f));
        if !all_settled {
            return Vec::new();
        }
        self.fired = true;
        vec![ActionSpec::new(self_id, ActionKind::EndGame {
            outcomes: self.outcomes.clone(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::action::{Action, ActionId, VoteTarget};
    use crate::core::config::PhaseSpec;
    use crate::state::actor::{Actor, Faction};
    use crate::state::phase::{Phase, PhaseCycle, ResolutionPolicy};
    use crate::state::status::{DEAD, OUTCOME};

    fn state() -> GameState {
        let cycle = PhaseCycle::new(vec![
            PhaseSpec::new("day", ResolutionPolicy::Instant),
            PhaseSpec::new("night", ResolutionPolicy::EndOfPhase),
        ])
        .unwrap();
        GameState::new(cycle)
    }

    fn phase(base: &str, cycle: u32) -> Phase {
        Phase {
            base: base.into(),
            cycle,
            policy: ResolutionPolicy::Instant,
        }
    }

    #[test]
    fn test_tally_observes_vote_posts() {
        let state = state();
        let mut aux = AuxObject::new(ObjectId(20), LYNCH_TALLY_KEY, AuxKind::Tally(Tally::new("day")));

        let vote = Action::from_spec(
            ActionId(1),
            ActionSpec::vote(ObjectId(5), ObjectId(1), VoteTarget::Actor(ObjectId(2))),
        );
        let event = Event {
            seq: 0,
            payload: EventPayload::PostAction(vote.view()),
        };
        assert!(aux.handle(&state, &event).is_empty());

        let AuxKind::Tally(tally) = &aux.kind else { unreachable!() };
        assert_eq!(tally.leader(), Some(ObjectId(2)));
    }

    #[test]
    fn test_tally_lynches_on_day_end() {
        let state = state();
        let mut tally = Tally::new("day");
        tally.record(ObjectId(1), VoteTarget::Actor(ObjectId(2)));
        let mut aux = AuxObject::new(ObjectId(20), LYNCH_TALLY_KEY, AuxKind::Tally(tally));

        let event = Event {
            seq: 0,
            payload: EventPayload::PhaseChange {
                from: phase("day", 1),
                to: phase("night", 1),
            },
        };
        let produced = aux.handle(&state, &event);
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].kind, ActionKind::Lynch { target: ObjectId(2) });

        // Votes are gone afterwards.
        let AuxKind::Tally(tally) = &aux.kind else { unreachable!() };
        assert!(tally.votes().is_empty());
    }

    #[test]
    fn test_tally_does_not_lynch_on_night_end() {
        let state = state();
        let mut tally = Tally::new("day");
        tally.record(ObjectId(1), VoteTarget::Actor(ObjectId(2)));
        let mut aux = AuxObject::new(ObjectId(20), LYNCH_TALLY_KEY, AuxKind::Tally(tally));

        let event = Event {
            seq: 0,
            payload: EventPayload::PhaseChange {
                from: phase("night", 1),
                to: phase("day", 2),
            },
        };
        assert!(aux.handle(&state, &event).is_empty());
    }

    #[test]
    fn test_kill_guard_cancels_matching_kill() {
        let state = state();
        let mut aux = AuxObject::new(
            ObjectId(20),
            "guard.3",
            AuxKind::KillGuard { target: ObjectId(3) },
        )
        .phase_scoped();

        let kill = Action::from_spec(ActionId(4), ActionSpec::kill(ObjectId(9), ObjectId(3)));
        let event = Event {
            seq: 0,
            payload: EventPayload::PreAction(kill.view()),
        };
        let produced = aux.handle(&state, &event);
        assert_eq!(produced[0].kind, ActionKind::Cancel { target: ActionId(4) });

        let other = Action::from_spec(ActionId(5), ActionSpec::kill(ObjectId(9), ObjectId(4)));
        let event = Event {
            seq: 0,
            payload: EventPayload::PreAction(other.view()),
        };
        assert!(aux.handle(&state, &event).is_empty());
    }

    #[test]
    fn test_ender_waits_for_all_factions() {
        let mut s = state();
        let town = s.alloc_id();
        let mafia = s.alloc_id();
        s.insert_faction(Faction::new(town, "town"));
        s.insert_faction(Faction::new(mafia, "mafia"));

        let alice = s.alloc_id();
        s.insert_actor(Actor::new(alice, "Alice"));
        s.join_faction(alice, town);
        let eddie = s.alloc_id();
        s.insert_actor(Actor::new(eddie, "Eddie"));
        s.join_faction(eddie, mafia);

        let mut ender = Ender::new();

        // Town achieves victory but Eddie is alive with no outcome: no end.
        s.actor_mut(alice)
            .unwrap()
            .status
            .set(OUTCOME, Outcome::Victory.into());
        let produced = ender.observe(ObjectId(30), &s, town, Outcome::Victory);
        assert!(produced.is_empty());

        // Eddie dies: mafia has no living members, so the game ends.
        s.actor_mut(eddie).unwrap().status.set(DEAD, true.into());
        let produced = ender.observe(ObjectId(30), &s, mafia, Outcome::Defeat);
        assert_eq!(produced.len(), 1);
        assert!(matches!(produced[0].kind, ActionKind::EndGame { .. }));

        // Fires only once.
        let produced = ender.observe(ObjectId(30), &s, mafia, Outcome::Defeat);
        assert!(produced.is_empty());
    }
}
