//! Error taxonomy and the diagnostics channel.
//!
//! Three tiers of failure:
//!
//! - **Setup and driver errors** ([`EngineError`]): raised synchronously from
//!   driver calls (duplicate names, unknown kinds, illegal phase
//!   transitions, vetoed activations, kernel invariant violations).
//! - **Rule vetoes** ([`VetoReason`]): a constraint refused an ability or
//!   trigger production. Silent to other subscribers (the would-be actions
//!   simply never appear), but recorded on the diagnostics channel and, for
//!   driver-initiated activations, surfaced as
//!   [`EngineError::InvalidActivation`].
//! - **Action failures** ([`ActionError`]): an action's execution failed.
//!   The drain continues; the history entry is marked failed and no
//!   post-event is emitted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::ObjectId;
use crate::actions::ActionId;

/// Driver-facing engine errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An object with this name already exists in the game.
    #[error("name already in use: {0:?}")]
    DuplicateName(String),

    /// A string-keyed kind lookup (ability, trigger, constraint,
    /// win condition, phase) found nothing.
    #[error("unknown kind: {0:?}")]
    UnknownKind(String),

    /// The requested phase transition is not legal.
    #[error("invalid phase transition: {0}")]
    InvalidPhaseTransition(String),

    /// An aux object with this key is already registered.
    #[error("aux key already registered: {0:?}")]
    DuplicateKey(String),

    /// An activation was vetoed by a constraint.
    #[error("activation vetoed: {0}")]
    InvalidActivation(VetoReason),

    /// A kernel invariant was violated. This indicates a programming error
    /// in a subscriber or the engine itself, not bad driver input.
    #[error("engine bug: {0}")]
    EngineBug(String),
}

/// Why a constraint vetoed a production.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VetoReason {
    /// The owning actor is dead.
    #[error("source actor is dead")]
    SourceDead,

    /// A targeted actor is dead.
    #[error("target actor is dead")]
    TargetDead,

    /// The current phase is not one the ability may be used in.
    #[error("not usable during {phase:?}")]
    WrongPhase { phase: String },

    /// A per-phase usage limit was exhausted.
    #[error("usage limit reached")]
    LimitReached,

    /// The target shares a faction with the source.
    #[error("cannot target own faction")]
    SelfFactionTarget,

    /// The game is over; nothing activates after shutdown.
    #[error("game has ended")]
    GameEnded,
}

/// Why an action's execution failed.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionError {
    /// The action referenced an actor that does not exist.
    #[error("no such actor: {0}")]
    MissingActor(ObjectId),

    /// The action referenced a faction that does not exist.
    #[error("no such faction: {0}")]
    MissingFaction(ObjectId),

    /// The action referenced a phase that does not exist.
    #[error("no such phase: {0:?}")]
    MissingPhase(String),
}

/// A single entry on the diagnostics channel.
///
/// Drivers drain these with [`Game::take_diagnostics`]
/// (crate::game::Game::take_diagnostics); the kernel also mirrors them to
/// `tracing`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Event sequence number current when the diagnostic was recorded.
    pub seq: u64,

    /// What happened.
    pub detail: DiagnosticKind,
}

/// Kinds of diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A subscriber's production was vetoed by one of its constraints.
    Veto {
        /// The ability or trigger whose production was dropped.
        owner: ObjectId,
        /// The first violated constraint's reason.
        reason: VetoReason,
    },

    /// An action's execution failed mid-drain.
    ActionFailed {
        /// The failed action.
        action: ActionId,
        /// Failure description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::DuplicateName("Alice".into());
        assert_eq!(format!("{err}"), "name already in use: \"Alice\"");

        let err = EngineError::InvalidActivation(VetoReason::LimitReached);
        assert_eq!(format!("{err}"), "activation vetoed: usage limit reached");
    }

    #[test]
    fn test_veto_reason_display() {
        let reason = VetoReason::WrongPhase {
            phase: "night 1".into(),
        };
        assert_eq!(format!("{reason}"), "not usable during \"night 1\"");
    }

    #[test]
    fn test_diagnostic_serialization() {
        let diag = Diagnostic {
            seq: 7,
            detail: DiagnosticKind::Veto {
                owner: ObjectId(3),
                reason: VetoReason::SourceDead,
            },
        };
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(diag, back);
    }
}
