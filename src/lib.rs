//! # mafia-engine
//!
//! A rules engine for Mafia/Werewolf-style social deduction games.
//!
//! The engine takes a declarative setup (players, factions, roles,
//! abilities, constraints, win conditions) and maintains a single
//! authoritative game state driven by external stimuli: phase changes and
//! ability activations. Every rule interaction (vote counting, night-kill
//! resolution, protection, usage limits, win detection) is a subscriber
//! that reacts to events by producing deferred actions, which the kernel
//! composes deterministically.
//!
//! ## Design Principles
//!
//! 1. **Two-layer dispatch**: events notify subscribers synchronously;
//!    actions resolve through a priority-ordered queue whose drain brackets
//!    every action with pre/post events, recursively.
//!
//! 2. **Deterministic**: for a fixed input script the history is identical
//!    across runs. No RNG in the kernel; ordering is always
//!    (priority, enqueue sequence, registration order).
//!
//! 3. **Handlers as data**: subscribers are closed enums interpreted by the
//!    engine, not callbacks. Handlers read state and produce actions; only
//!    actions mutate.
//!
//! 4. **Single-threaded and cooperative**: one logical call stack owns the
//!    game; reentrancy happens via nested queue drains, never threads.
//!
//! ## Modules
//!
//! - `core`: object ids, configuration, errors, RNG
//! - `state`: actors, factions, statuses, phases
//! - `events`: event types and the subscriber registry
//! - `actions`: action types and the queue
//! - `abilities`: activated abilities, passive triggers, constraints
//! - `outcomes`: win conditions and outcome checkers
//! - `auxiliary`: keyed helper subscribers (tally, ender, guards)
//! - `game`: the game context and the resolution kernel
//! - `prefab`: declarative templates and kind registries

pub mod abilities;
pub mod actions;
pub mod auxiliary;
pub mod core;
pub mod events;
pub mod game;
pub mod outcomes;
pub mod prefab;
pub mod state;

// Re-export commonly used types
pub use crate::core::{
    ActionError, Diagnostic, DiagnosticKind, EngineError, GameConfig, GameRng, ObjectId,
    PhaseSpec, VetoReason,
};

pub use crate::state::{
    Actor, Faction, GameState, Phase, PhaseCycle, ResolutionPolicy, Status, StatusValue, DEAD,
    OUTCOME, SHUTDOWN, STARTUP,
};

pub use crate::events::{Event, EventKey, EventPayload, SubscriberRegistry};

pub use crate::actions::{
    Action, ActionId, ActionKind, ActionQueue, ActionSpec, ActionStatus, ActionTag, ActionView,
    HistoryEntry, VoteTarget,
};

pub use crate::abilities::{Ability, AbilityArgs, AbilityKind, Constraint, Trigger, TriggerKind};

pub use crate::outcomes::{Outcome, OutcomeChecker, WinCondition};

pub use crate::auxiliary::{AuxKind, AuxObject, Ender, Tally, GAME_ENDER_KEY, LYNCH_TALLY_KEY};

pub use crate::game::{Behavior, Game};

pub use crate::prefab::{
    AbilitySpec, ConstraintSpec, FactionSpec, KindRegistry, Prefab, RoleSpec, TriggerSpec,
    Variant, WinConditionSpec, MAFIA_KILL_KEY,
};
