//! Activated abilities.
//!
//! An ability is a subscriber that reacts to its own activation event by
//! producing actions. The behaviors are a closed set of kinds; prefabs
//! resolve kind names through the string registry. Constraints attached to
//! the ability are evaluated by the dispatch layer when it produces
//! actions: a violation drops the whole production.

use serde::{Deserialize, Serialize};

use super::constraint::Constraint;
use crate::actions::action::{ActionKind, ActionSpec, VoteTarget};
use crate::core::entity::ObjectId;
use crate::events::event::{Event, EventKey, EventPayload};
use crate::state::GameState;

/// Arguments supplied with an activation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityArgs {
    /// No arguments.
    Empty,
    /// A single actor target.
    Actor(ObjectId),
    /// A vote target.
    Vote(VoteTarget),
    /// A phase name.
    Phase(String),
}

impl AbilityArgs {
    /// The actor this activation is aimed at, if any.
    #[must_use]
    pub fn target_actor(&self) -> Option<ObjectId> {
        match self {
            Self::Actor(id) | Self::Vote(VoteTarget::Actor(id)) => Some(*id),
            _ => None,
        }
    }
}

/// The behavior of an activated ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Cast a vote (lynch voting).
    Vote,

    /// Kill the target.
    Kill,

    /// Shield the target from kills until the end of the phase.
    Protect,

    /// Move the phase progression. Typically admin-only.
    ChangePhase,
}

/// An activated ability owned by an actor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ability {
    /// Stable id.
    pub id: ObjectId,

    /// Owning actor.
    pub owner: ObjectId,

    /// Name the driver activates this ability by, unique per owner.
    pub name: String,

    /// What activating does.
    pub kind: AbilityKind,

    /// Gates on production, checked in order.
    pub constraints: Vec<Constraint>,

    /// Overrides the default priority of produced actions.
    pub priority: Option<i32>,
}

impl Ability {
    /// Create an ability.
    pub fn new(id: ObjectId, owner: ObjectId, name: impl Into<String>, kind: AbilityKind) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            kind,
            constraints: Vec::new(),
            priority: None,
        }
    }

    /// Attach a constraint (builder pattern).
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Override the priority of produced actions (builder pattern).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Events this ability listens to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<EventKey> {
        vec![EventKey::Activate]
    }

    /// React to an activation addressed to this ability.
    pub fn handle(&mut self, state: &GameState, event: &Event) -> Vec<ActionSpec> {
        let EventPayload::Activate { ability, args } = &event.payload else {
            return Vec::new();
        };
        if *ability != self.id {
            return Vec::new();
        }
        let mut produced = self.make_actions(state, args);
        if let Some(priority) = self.priority {
            for spec in &mut produced {
                spec.priority = priority;
            }
        }
        produced
    }

    fn make_actions(&self, state: &GameState, args: &AbilityArgs) -> Vec<ActionSpec> {
        match (&self.kind, args) {
            (AbilityKind::Vote, AbilityArgs::Vote(target)) => {
                vec![ActionSpec::vote(self.id, self.owner, *target)]
            }
            (AbilityKind::Vote, AbilityArgs::Actor(target)) => {
                vec![ActionSpec::vote(self.id, self.owner, VoteTarget::Actor(*target))]
            }
            (AbilityKind::Kill, AbilityArgs::Actor(target)) => {
                vec![ActionSpec::kill(self.id, *target)]
            }
            (AbilityKind::Protect, AbilityArgs::Actor(target)) => {
                vec![ActionSpec::protect(self.id, *target)]
            }
            (AbilityKind::ChangePhase, AbilityArgs::Phase(name)) => {
                match state.phases.resolve(name) {
                    Ok(to) => vec![ActionSpec::new(self.id, ActionKind::Transition { to })],
                    Err(_) => Vec::new(),
                }
            }
            // Wrong argument shape for the kind: no production.
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PhaseSpec;
    use crate::state::phase::{PhaseCycle, ResolutionPolicy};

    fn state() -> GameState {
        let cycle = PhaseCycle::new(vec![
            PhaseSpec::new("day", ResolutionPolicy::Instant),
            PhaseSpec::new("night", ResolutionPolicy::EndOfPhase),
        ])
        .unwrap();
        GameState::new(cycle)
    }

    fn activate(ability: ObjectId, args: AbilityArgs) -> Event {
        Event {
            seq: 0,
            payload: EventPayload::Activate { ability, args },
        }
    }

    #[test]
    fn test_kill_ability() {
        let state = state();
        let mut ability = Ability::new(ObjectId(5), ObjectId(1), "kill", AbilityKind::Kill);

        let produced = ability.handle(&state, &activate(ObjectId(5), AbilityArgs::Actor(ObjectId(2))));
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].kind, ActionKind::Kill { target: ObjectId(2) });
        assert_eq!(produced[0].source, ObjectId(5));
    }

    #[test]
    fn test_activation_for_other_ability_is_ignored() {
        let state = state();
        let mut ability = Ability::new(ObjectId(5), ObjectId(1), "kill", AbilityKind::Kill);

        let produced = ability.handle(&state, &activate(ObjectId(6), AbilityArgs::Actor(ObjectId(2))));
        assert!(produced.is_empty());
    }

    #[test]
    fn test_vote_accepts_actor_args() {
        let state = state();
        let mut ability = Ability::new(ObjectId(5), ObjectId(1), "vote", AbilityKind::Vote);

        let produced = ability.handle(&state, &activate(ObjectId(5), AbilityArgs::Actor(ObjectId(2))));
        assert_eq!(
            produced[0].kind,
            ActionKind::Vote {
                voter: ObjectId(1),
                target: VoteTarget::Actor(ObjectId(2)),
            }
        );
    }

    #[test]
    fn test_wrong_args_shape_produces_nothing() {
        let state = state();
        let mut ability = Ability::new(ObjectId(5), ObjectId(1), "kill", AbilityKind::Kill);

        let produced = ability.handle(&state, &activate(ObjectId(5), AbilityArgs::Empty));
        assert!(produced.is_empty());
    }

    #[test]
    fn test_priority_override() {
        let state = state();
        let mut ability = Ability::new(ObjectId(5), ObjectId(1), "kill", AbilityKind::Kill)
            .with_priority(10);

        let produced = ability.handle(&state, &activate(ObjectId(5), AbilityArgs::Actor(ObjectId(2))));
        assert_eq!(produced[0].priority, 10);
    }

    #[test]
    fn test_change_phase_resolves_name() {
        let state = state();
        let mut ability =
            Ability::new(ObjectId(5), ObjectId(1), "advance", AbilityKind::ChangePhase);

        let produced = ability.handle(
            &state,
            &activate(ObjectId(5), AbilityArgs::Phase("night".into())),
        );
        assert_eq!(produced.len(), 1);
        assert!(matches!(produced[0].kind, ActionKind::Transition { .. }));

        let produced = ability.handle(
            &state,
            &activate(ObjectId(5), AbilityArgs::Phase("twilight".into())),
        );
        assert!(produced.is_empty());
    }
}
