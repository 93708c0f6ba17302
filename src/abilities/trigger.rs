//! Passive triggers.
//!
//! A trigger is the passive analogue of an ability: the same constraint
//! gate, but keyed to arbitrary events instead of an activation. The
//! built-in kinds react to pre-kill events: guards answer with
//! cancellations, watchers with status marks.

use serde::{Deserialize, Serialize};

use super::constraint::Constraint;
use crate::actions::action::{ActionKind, ActionSpec, ActionTag};
use crate::core::entity::ObjectId;
use crate::events::event::{Event, EventKey, EventPayload};
use crate::state::GameState;

/// Status key written by [`TriggerKind::Watcher`].
pub const ATTACKED: &str = "attacked";

/// The behavior of a passive trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Kills against the owner are cancelled.
    Unkillable,

    /// Kills against a specific actor are cancelled.
    Protector { target: ObjectId },

    /// Marks the target's status when someone attempts to kill them.
    /// Tracker-style information roles read the mark afterwards; the kill
    /// itself is unaffected.
    Watcher { target: ObjectId },
}

/// A passive trigger owned by an actor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trigger {
    /// Stable id.
    pub id: ObjectId,

    /// Owning actor.
    pub owner: ObjectId,

    /// Display name.
    pub name: String,

    /// What the trigger does.
    pub kind: TriggerKind,

    /// Gates on production, checked in order.
    pub constraints: Vec<Constraint>,

    /// Overrides the default priority of produced actions.
    pub priority: Option<i32>,
}

impl Trigger {
    /// Create a trigger.
    pub fn new(id: ObjectId, owner: ObjectId, name: impl Into<String>, kind: TriggerKind) -> Self {
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

    /// Events this trigger listens to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<EventKey> {
        match self.kind {
            TriggerKind::Unkillable
            | TriggerKind::Protector { .. }
            | TriggerKind::Watcher { .. } => {
                vec![EventKey::PreAction(Some(ActionTag::Kill))]
            }
        }
    }

    /// React to an event.
    pub fn handle(&mut self, _state: &GameState, event: &Event) -> Vec<ActionSpec> {
        let EventPayload::PreAction(view) = &event.payload else {
            return Vec::new();
        };
        let ActionKind::Kill { target } = view.kind else {
            return Vec::new();
        };

        let mut produced = match self.kind {
            TriggerKind::Unkillable if target == self.owner => {
                vec![ActionSpec::cancel(self.id, view.id)]
            }
            TriggerKind::Protector { target: guarded } if target == guarded => {
                vec![ActionSpec::cancel(self.id, view.id)]
            }
            TriggerKind::Watcher { target: watched } if target == watched => {
                vec![ActionSpec::new(
                    self.id,
                    ActionKind::SetStatus {
                        actor: watched,
                        key: ATTACKED.into(),
                        value: Some(true.into()),
                    },
                )]
            }
            _ => Vec::new(),
        };
        if let Some(priority) = self.priority {
            for spec in &mut produced {
                spec.priority = priority;
            }
        }
        produced
    }
}
