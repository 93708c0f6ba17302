//! Outcome detection.
//!
//! An [`OutcomeChecker`] is a passive subscriber bound to one faction. It
//! watches events likely to change the win state (kills, lynches, phase
//! changes) and, when its predicate first holds, produces a low-priority
//! `Outcome` action so the result settles after the action that caused it.
//! Predicates are pure functions of current state.

use serde::{Deserialize, Serialize};

use crate::actions::action::{ActionSpec, ActionTag};
use crate::core::entity::ObjectId;
use crate::events::event::{Event, EventKey, EventPayload};
use crate::state::GameState;

/// Terminal per-faction (and per-actor) result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Victory,
    Defeat,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Victory => write!(f, "victory"),
            Self::Defeat => write!(f, "defeat"),
        }
    }
}

/// A pure predicate over game state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCondition {
    /// The named faction has members and none of them is alive.
    FactionEliminated(ObjectId),

    /// The named faction's living members are a strict majority of all
    /// living actors.
    FactionMajority(ObjectId),
}

impl WinCondition {
    /// Evaluate the predicate against current state.
    #[must_use]
    pub fn holds(&self, state: &GameState) -> bool {
        match *self {
            Self::FactionEliminated(faction) => {
                let Some(f) = state.faction(faction) else {
                    return false;
                };
                !f.members.is_empty() && state.living_members(faction).is_empty()
            }
            Self::FactionMajority(faction) => {
                let living = state.living_actors().len();
                living > 0 && state.living_members(faction).len() * 2 > living
            }
        }
    }
}

/// Watches for a faction's outcome.
///
/// Fires at most once per game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutcomeChecker {
    /// Stable id.
    pub id: ObjectId,

    /// The faction this checker reports for.
    pub faction: ObjectId,

    /// The outcome to report when the condition holds.
    pub outcome: Outcome,

    /// The predicate.
    pub condition: WinCondition,

    /// Set once the outcome action has been produced.
    pub achieved: bool,
}

impl OutcomeChecker {
    /// Create a checker.
    #[must_use]
    pub fn new(id: ObjectId, faction: ObjectId, outcome: Outcome, condition: WinCondition) -> Self {
        Self {
            id,
            faction,
            outcome,
            condition,
            achieved: false,
        }
    }

    /// Events this checker listens to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<EventKey> {
        vec![
            EventKey::PostAction(Some(ActionTag::Kill)),
            EventKey::PostAction(Some(ActionTag::Lynch)),
            EventKey::PhaseChange,
        ]
    }

    /// Evaluate on an event; produce the outcome action on the first hit.
    pub fn handle(&mut self, state: &GameState, event: &Event) -> Vec<ActionSpec> {
        debug_assert!(matches!(
            event.payload,
            EventPayload::PostAction(_) | EventPayload::PhaseChange { .. }
        ));
        if self.achieved || !self.condition.holds(state) {
            return Vec::new();
        }
        self.achieved = true;
        vec![ActionSpec::outcome(self.id, self.faction, self.outcome)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PhaseSpec;
    use crate::state::actor::{Actor, Faction};
    use crate::state::phase::{PhaseCycle, ResolutionPolicy};
    use crate::state::status::DEAD;

    fn two_faction_state() -> (GameState, ObjectId, ObjectId) {
        let cycle = PhaseCycle::new(vec![
            PhaseSpec::new("day", ResolutionPolicy::Instant),
            PhaseSpec::new("night", ResolutionPolicy::EndOfPhase),
        ])
        .unwrap();
        let mut state = GameState::new(cycle);

        let town = state.alloc_id();
        let mafia = state.alloc_id();
        state.insert_faction(Faction::new(town, "town"));
        state.insert_faction(Faction::new(mafia, "mafia"));

        for (name, faction) in [("Alice", town), ("Bob", town), ("Eddie", mafia)] {
            let id = state.alloc_id();
            state.claim_name(name, id).unwrap();
            state.insert_actor(Actor::new(id, name));
            state.join_faction(id, faction);
        }
        (state, town, mafia)
    }

    #[test]
    fn test_faction_eliminated() {
        let (mut state, _, mafia) = two_faction_state();
        let cond = WinCondition::FactionEliminated(mafia);
        assert!(!cond.holds(&state));

        let eddie = state.actor_by_name("Eddie").unwrap().id;
        state.actor_mut(eddie).unwrap().status.set(DEAD, true.into());
        assert!(cond.holds(&state));
    }

    #[test]
    fn test_faction_majority() {
        let (mut state, _, mafia) = two_faction_state();
        let cond = WinCondition::FactionMajority(mafia);
        // 1 mafia of 3 living: no majority.
        assert!(!cond.holds(&state));

        // Kill both townies: 1 of 1 living is a strict majority.
        for name in ["Alice", "Bob"] {
            let id = state.actor_by_name(name).unwrap().id;
            state.actor_mut(id).unwrap().status.set(DEAD, true.into());
        }
        assert!(cond.holds(&state));
    }

    #[test]
    fn test_checker_fires_once() {
        let (mut state, town, mafia) = two_faction_state();
        let mut checker = OutcomeChecker::new(
            ObjectId(99),
            town,
            Outcome::Victory,
            WinCondition::FactionEliminated(mafia),
        );

        let eddie = state.actor_by_name("Eddie").unwrap().id;
        state.actor_mut(eddie).unwrap().status.set(DEAD, true.into());

        let event = Event {
            seq: 0,
            payload: EventPayload::PhaseChange {
                from: state.phases.current(),
                to: state.phases.peek_next().unwrap(),
            },
        };

        let produced = checker.handle(&state, &event);
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].priority, -10);

        // Second evaluation produces nothing.
        assert!(checker.handle(&state, &event).is_empty());
    }
}
