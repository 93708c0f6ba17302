//! The unified subscriber type.
//!
//! Every subscriber the registry can point at is one of these variants.
//! `handle` may mutate the subscriber's own bookkeeping (tally maps,
//! fired flags) but only reads game state; all game-state mutation happens
//! when actions run.

use serde::{Deserialize, Serialize};

use crate::abilities::ability::Ability;
use crate::abilities::constraint::Constraint;
use crate::abilities::trigger::Trigger;
use crate::actions::action::ActionSpec;
use crate::auxiliary::AuxObject;
use crate::core::entity::ObjectId;
use crate::events::event::{Event, EventKey};
use crate::outcomes::OutcomeChecker;
use crate::state::GameState;

/// A registered subscriber.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Behavior {
    /// An activated ability.
    Ability(Ability),

    /// A passive trigger.
    Trigger(Trigger),

    /// A keyed auxiliary object.
    Aux(AuxObject),

    /// A faction outcome checker.
    Checker(OutcomeChecker),
}

impl Behavior {
    /// The subscriber's id.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Ability(a) => a.id,
            Self::Trigger(t) => t.id,
            Self::Aux(x) => x.id,
            Self::Checker(c) => c.id,
        }
    }

    /// Events this subscriber listens to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<EventKey> {
        match self {
            Self::Ability(a) => a.subscriptions(),
            Self::Trigger(t) => t.subscriptions(),
            Self::Aux(x) => x.subscriptions(),
            Self::Checker(c) => c.subscriptions(),
        }
    }

    /// React to an event.
    pub fn handle(&mut self, state: &GameState, event: &Event) -> Vec<ActionSpec> {
        match self {
            Self::Ability(a) => a.handle(state, event),
            Self::Trigger(t) => t.handle(state, event),
            Self::Aux(x) => x.handle(state, event),
            Self::Checker(c) => c.handle(state, event),
        }
    }

    /// Constraints gating this subscriber's production.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        match self {
            Self::Ability(a) => &a.constraints,
            Self::Trigger(t) => &t.constraints,
            _ => &[],
        }
    }

    /// The actor that owns this subscriber, if any.
    #[must_use]
    pub fn owner_actor(&self) -> Option<ObjectId> {
        match self {
            Self::Ability(a) => Some(a.owner),
            Self::Trigger(t) => Some(t.owner),
            _ => None,
        }
    }

    /// The aux object inside, if this is one.
    #[must_use]
    pub fn as_aux(&self) -> Option<&AuxObject> {
        match self {
            Self::Aux(x) => Some(x),
            _ => None,
        }
    }
}
