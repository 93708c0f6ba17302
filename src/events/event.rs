//! Events and the subscription key lattice.
//!
//! An event is an immutable notification that something happened or is
//! about to happen. The payload is a closed enum; extensibility lives in
//! the *keys*: a subscriber may listen to a concrete kind (`PreAction` of
//! kills only) or to an ancestor category (any `PreAction`). Each event
//! exposes its key list most-specific-first; the registry dispatches
//! exact-kind handlers before category handlers.
//!
//! Specialized post events: an `Outcome` action's post event is
//! [`EventPayload::OutcomeAchieved`] and an `EndGame` action's post event is
//! [`EventPayload::GameEnded`]. Both remain members of the post-action
//! category, so a subscriber listening to "any post action" still sees them.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::abilities::ability::AbilityArgs;
use crate::actions::action::{ActionTag, ActionView};
use crate::core::entity::ObjectId;
use crate::outcomes::Outcome;
use crate::state::phase::Phase;
use crate::state::status::StatusValue;

/// What an event describes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// An action is about to be considered for execution.
    PreAction(ActionView),

    /// An action executed.
    PostAction(ActionView),

    /// The phase is changing from `from` to `to`. Emitted before the
    /// outgoing phase's accumulated actions drain.
    PhaseChange { from: Phase, to: Phase },

    /// An actor's status key changed. Emitted synchronously after the
    /// write; handlers observe the new value.
    StatusChange {
        actor: ObjectId,
        key: String,
        old: Option<StatusValue>,
        new: Option<StatusValue>,
    },

    /// A driver asked for an ability activation.
    Activate { ability: ObjectId, args: AbilityArgs },

    /// A faction achieved an outcome (the post event of an `Outcome`
    /// action).
    OutcomeAchieved {
        faction: ObjectId,
        outcome: Outcome,
        action: ActionView,
    },

    /// The game ended (the post event of an `EndGame` action).
    GameEnded {
        outcomes: Vec<(ObjectId, Outcome)>,
        action: ActionView,
    },
}

impl EventPayload {
    /// Subscription keys this event matches, most specific first.
    #[must_use]
    pub fn keys(&self) -> SmallVec<[EventKey; 3]> {
        match self {
            Self::PreAction(view) => SmallVec::from_slice(&[
                EventKey::PreAction(Some(view.kind.tag())),
                EventKey::PreAction(None),
            ]),
            Self::PostAction(view) => SmallVec::from_slice(&[
                EventKey::PostAction(Some(view.kind.tag())),
                EventKey::PostAction(None),
            ]),
            Self::PhaseChange { .. } => SmallVec::from_slice(&[EventKey::PhaseChange]),
            Self::StatusChange { .. } => SmallVec::from_slice(&[EventKey::StatusChange]),
            Self::Activate { .. } => SmallVec::from_slice(&[EventKey::Activate]),
            Self::OutcomeAchieved { .. } => SmallVec::from_slice(&[
                EventKey::OutcomeAchieved,
                EventKey::PostAction(Some(ActionTag::Outcome)),
                EventKey::PostAction(None),
            ]),
            Self::GameEnded { .. } => SmallVec::from_slice(&[
                EventKey::GameEnded,
                EventKey::PostAction(Some(ActionTag::EndGame)),
                EventKey::PostAction(None),
            ]),
        }
    }

    /// The action view carried by pre/post events, if any.
    #[must_use]
    pub fn action(&self) -> Option<&ActionView> {
        match self {
            Self::PreAction(view) | Self::PostAction(view) => Some(view),
            Self::OutcomeAchieved { action, .. } | Self::GameEnded { action, .. } => Some(action),
            _ => None,
        }
    }
}

/// A subscription key: a concrete event kind or an ancestor category.
///
/// `PreAction(None)` / `PostAction(None)` are the categories; with a tag
/// they are concrete kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKey {
    PreAction(Option<ActionTag>),
    PostAction(Option<ActionTag>),
    PhaseChange,
    StatusChange,
    Activate,
    OutcomeAchieved,
    GameEnded,
}

/// A stamped event: payload plus the sequence number assigned at emission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing emission sequence number.
    pub seq: u64,

    /// What happened.
    pub payload: EventPayload,
}
