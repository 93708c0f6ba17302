//! Abilities, triggers, and their constraint gate.

pub mod ability;
pub mod constraint;
pub mod trigger;

pub use ability::{Ability, AbilityArgs, AbilityKind};
pub use constraint::{Constraint, UsageLedger};
pub use trigger::{Trigger, TriggerKind};
