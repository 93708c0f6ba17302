//! Actions: deferred mutations.
//!
//! An action is the only thing that mutates game state. Handlers produce
//! [`ActionSpec`]s; the queue assigns each an [`ActionId`] at enqueue time
//! and brackets its execution with pre/post events. Actions never emit
//! events themselves.
//!
//! ## Priorities
//!
//! Higher priority resolves first; ties break by enqueue order. The built-in
//! kinds carry conventional defaults so that rule interactions come out
//! right without tuning:
//!
//! | kind | priority |
//! |---|---|
//! | `Protect` | 80 |
//! | `Cancel` | 50 |
//! | `Kill`, `Lynch`, `Vote`, `SetStatus` | 0 |
//! | `Outcome` | −10 |
//! | `Transition` | −100 |
//! | `EndGame` | 100 |
//!
//! `Transition` sits below everything so a phase change resolves after the
//! phase's accumulated actions; `Outcome` sits just below the default tier
//! so win detection settles after the action that caused it.

use serde::{Deserialize, Serialize};

use crate::core::entity::ObjectId;
use crate::outcomes::Outcome;
use crate::state::phase::Phase;
use crate::state::status::StatusValue;

/// Unique identifier for an enqueued action.
///
/// Doubles as the enqueue sequence number: ids are assigned monotonically,
/// so smaller id means enqueued earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl ActionId {
    /// Create a new action ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action({})", self.0)
    }
}

/// Discriminant of an action kind, used for event subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTag {
    Kill,
    Lynch,
    Vote,
    Cancel,
    Protect,
    Outcome,
    EndGame,
    Transition,
    SetStatus,
}

/// What a vote is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteTarget {
    /// Vote for an actor.
    Actor(ObjectId),
    /// Retract the standing vote.
    Unvote,
    /// Vote for no lynch.
    AgainstAll,
}

/// The behavior of an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Kill the target (night-kill style; cancellable by kill guards).
    Kill { target: ObjectId },

    /// Lynch the target. A distinct kind from `Kill` so that kill
    /// protection does not stop a lynch.
    Lynch { target: ObjectId },

    /// Register a vote. Execution is a no-op; tallies track votes by
    /// observing the post event.
    Vote { voter: ObjectId, target: VoteTarget },

    /// Cancel a pending action by id.
    Cancel { target: ActionId },

    /// Shield an actor from kills until the end of the phase.
    Protect { target: ObjectId },

    /// A faction achieves victory or defeat.
    Outcome { faction: ObjectId, outcome: Outcome },

    /// End the game: move to `shutdown` and announce the final outcomes.
    EndGame { outcomes: Vec<(ObjectId, Outcome)> },

    /// Move the phase progression to `to`.
    Transition { to: Phase },

    /// Write (or clear) a status key on an actor.
    SetStatus {
        actor: ObjectId,
        key: String,
        value: Option<StatusValue>,
    },
}

impl ActionKind {
    /// The subscription tag for this kind.
    #[must_use]
    pub fn tag(&self) -> ActionTag {
        match self {
            Self::Kill { .. } => ActionTag::Kill,
            Self::Lynch { .. } => ActionTag::Lynch,
            Self::Vote { .. } => ActionTag::Vote,
            Self::Cancel { .. } => ActionTag::Cancel,
            Self::Protect { .. } => ActionTag::Protect,
            Self::Outcome { .. } => ActionTag::Outcome,
            Self::EndGame { .. } => ActionTag::EndGame,
            Self::Transition { .. } => ActionTag::Transition,
            Self::SetStatus { .. } => ActionTag::SetStatus,
        }
    }

    /// The conventional priority for this kind.
    #[must_use]
    pub fn default_priority(&self) -> i32 {
        match self {
            Self::Protect { .. } => 80,
            Self::Cancel { .. } => 50,
            Self::EndGame { .. } => 100,
            Self::Outcome { .. } => -10,
            Self::Transition { .. } => -100,
            _ => 0,
        }
    }

    /// The actor this action is aimed at, if any.
    ///
    /// Used by target-inspecting constraints.
    #[must_use]
    pub fn target_actor(&self) -> Option<ObjectId> {
        match self {
            Self::Kill { target }
            | Self::Lynch { target }
            | Self::Protect { target }
            | Self::Vote {
                target: VoteTarget::Actor(target),
                ..
            } => Some(*target),
            _ => None,
        }
    }
}

/// An action as produced by a handler, before it has an id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// The subscriber that produced this action.
    pub source: ObjectId,

    /// Resolution priority, higher first.
    pub priority: i32,

    /// What the action does.
    pub kind: ActionKind,
}

impl ActionSpec {
    /// Create a spec with the kind's default priority.
    #[must_use]
    pub fn new(source: ObjectId, kind: ActionKind) -> Self {
        let priority = kind.default_priority();
        Self {
            source,
            priority,
            kind,
        }
    }

    /// Override the priority (builder pattern).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// A kill.
    #[must_use]
    pub fn kill(source: ObjectId, target: ObjectId) -> Self {
        Self::new(source, ActionKind::Kill { target })
    }

    /// A lynch.
    #[must_use]
    pub fn lynch(source: ObjectId, target: ObjectId) -> Self {
        Self::new(source, ActionKind::Lynch { target })
    }

    /// A vote.
    #[must_use]
    pub fn vote(source: ObjectId, voter: ObjectId, target: VoteTarget) -> Self {
        Self::new(source, ActionKind::Vote { voter, target })
    }

    /// A cancellation of a pending action.
    #[must_use]
    pub fn cancel(source: ObjectId, target: ActionId) -> Self {
        Self::new(source, ActionKind::Cancel { target })
    }

    /// A kill protection.
    #[must_use]
    pub fn protect(source: ObjectId, target: ObjectId) -> Self {
        Self::new(source, ActionKind::Protect { target })
    }

    /// A faction outcome.
    #[must_use]
    pub fn outcome(source: ObjectId, faction: ObjectId, outcome: Outcome) -> Self {
        Self::new(source, ActionKind::Outcome { faction, outcome })
    }
}

/// An enqueued action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    /// Unique id, assigned at enqueue; also the enqueue sequence number.
    pub id: ActionId,

    /// The subscriber that produced this action.
    pub source: ObjectId,

    /// Resolution priority, higher first.
    pub priority: i32,

    /// What the action does.
    pub kind: ActionKind,
}

impl Action {
    /// Build an action from a spec and a freshly assigned id.
    #[must_use]
    pub fn from_spec(id: ActionId, spec: ActionSpec) -> Self {
        Self {
            id,
            source: spec.source,
            priority: spec.priority,
            kind: spec.kind,
        }
    }

    /// An immutable view for events and history.
    #[must_use]
    pub fn view(&self) -> ActionView {
        ActionView {
            id: self.id,
            source: self.source,
            priority: self.priority,
            kind: self.kind.clone(),
        }
    }
}

/// Immutable snapshot of an action, carried by pre/post events and history
/// entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionView {
    pub id: ActionId,
    pub source: ObjectId,
    pub priority: i32,
    pub kind: ActionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priorities() {
        let src = ObjectId(1);
        assert_eq!(ActionSpec::kill(src, ObjectId(2)).priority, 0);
        assert_eq!(ActionSpec::cancel(src, ActionId(0)).priority, 50);
        assert_eq!(ActionSpec::protect(src, ObjectId(2)).priority, 80);
        assert_eq!(
            ActionSpec::outcome(src, ObjectId(3), Outcome::Victory).priority,
            -10
        );
    }

    #[test]
    fn test_priority_override() {
        let spec = ActionSpec::kill(ObjectId(1), ObjectId(2)).with_priority(10);
        assert_eq!(spec.priority, 10);
    }

    #[test]
    fn test_tags() {
        assert_eq!(
            ActionKind::Kill { target: ObjectId(2) }.tag(),
            ActionTag::Kill
        );
        assert_eq!(
            ActionKind::Lynch { target: ObjectId(2) }.tag(),
            ActionTag::Lynch
        );
    }

    #[test]
    fn test_target_actor() {
        assert_eq!(
            ActionKind::Kill { target: ObjectId(2) }.target_actor(),
            Some(ObjectId(2))
        );
        assert_eq!(
            ActionKind::Vote {
                voter: ObjectId(1),
                target: VoteTarget::Actor(ObjectId(2)),
            }
            .target_actor(),
            Some(ObjectId(2))
        );
        assert_eq!(
            ActionKind::Vote {
                voter: ObjectId(1),
                target: VoteTarget::Unvote,
            }
            .target_actor(),
            None
        );
        assert_eq!(
            ActionKind::Cancel { target: ActionId(3) }.target_actor(),
            None
        );
    }

    #[test]
    fn test_view_roundtrip() {
        let action = Action::from_spec(ActionId(7), ActionSpec::kill(ObjectId(1), ObjectId(2)));
        let view = action.view();
        assert_eq!(view.id, ActionId(7));
        assert_eq!(view.kind, ActionKind::Kill { target: ObjectId(2) });

        let json = serde_json::to_string(&view).unwrap();
        let back: ActionView = serde_json::from_str(&json).unwrap();
        assert_eq!(view, back);
    }
}
