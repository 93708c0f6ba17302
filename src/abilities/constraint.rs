//! Constraints: the veto layer.
//!
//! A constraint is bound to exactly one ability or trigger and gates its
//! production: when the dispatch layer receives actions from a subscriber,
//! it checks every attached constraint and drops the whole production on
//! the first violation, reporting a [`VetoReason`]. Constraints are never
//! registered as event subscribers; they are evaluated synchronously at
//! production time.
//!
//! Per-phase limits count *firings* (one per production that passes the
//! gate) in a [`UsageLedger`] owned by the game and cleared when the phase
//! transition action runs.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::actions::action::ActionSpec;
use crate::core::entity::ObjectId;
use crate::core::error::VetoReason;
use crate::state::GameState;

/// A gate on ability/trigger production.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// The owning actor must be alive.
    SourceAlive,

    /// Every targeted actor must be alive.
    TargetAlive,

    /// The current phase's base name must be one of these.
    PhaseIs(Vec<String>),

    /// This subscriber may fire at most `n` times per phase.
    LimitPerPhaseActor(u32),

    /// All subscribers sharing `key` may fire at most `n` times per phase
    /// combined. Faction-wide kill limits use this.
    LimitPerPhaseKey { key: String, max: u32 },

    /// Targets must not share a faction with the owning actor.
    NoSelfFactionTarget,
}

impl Constraint {
    /// Check one produced action.
    ///
    /// `owner` is the producing subscriber's id; `owner_actor` its owning
    /// actor, if it has one.
    pub fn check(
        &self,
        state: &GameState,
        usage: &UsageLedger,
        owner: ObjectId,
        owner_actor: Option<ObjectId>,
        spec: &ActionSpec,
    ) -> Result<(), VetoReason> {
        match self {
            Self::SourceAlive => match owner_actor {
                Some(actor) if state.is_alive(actor) => Ok(()),
                Some(_) => Err(VetoReason::SourceDead),
                None => Ok(()),
            },
            Self::TargetAlive => match spec.kind.target_actor() {
                Some(target) if !state.is_alive(target) => Err(VetoReason::TargetDead),
                _ => Ok(()),
            },
            Self::PhaseIs(names) => {
                let phase = state.phases.current();
                if names.iter().any(|n| *n == phase.base || *n == phase.name()) {
                    Ok(())
                } else {
                    Err(VetoReason::WrongPhase { phase: phase.name() })
                }
            }
            Self::LimitPerPhaseActor(max) => {
                if usage.fires(owner) < *max {
                    Ok(())
                } else {
                    Err(VetoReason::LimitReached)
                }
            }
            Self::LimitPerPhaseKey { key, max } => {
                if usage.key_fires(key) < *max {
                    Ok(())
                } else {
                    Err(VetoReason::LimitReached)
                }
            }
            Self::NoSelfFactionTarget => {
                let (Some(actor), Some(target)) = (owner_actor, spec.kind.target_actor()) else {
                    return Ok(());
                };
                let (Some(a), Some(t)) = (state.actor(actor), state.actor(target)) else {
                    return Ok(());
                };
                if a.shares_faction(t) {
                    Err(VetoReason::SelfFactionTarget)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The shared-usage key this constraint counts against, if any.
    #[must_use]
    pub fn usage_key(&self) -> Option<&str> {
        match self {
            Self::LimitPerPhaseKey { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Per-phase firing counts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UsageLedger {
    fires: FxHashMap<ObjectId, u32>,
    keys: FxHashMap<String, u32>,
}

impl UsageLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the subscriber has fired this phase.
    #[must_use]
    pub fn fires(&self, owner: ObjectId) -> u32 {
        self.fires.get(&owner).copied().unwrap_or(0)
    }

    /// How many times the shared key has been used this phase.
    #[must_use]
    pub fn key_fires(&self, key: &str) -> u32 {
        self.keys.get(key).copied().unwrap_or(0)
    }

    /// Record one firing for a subscriber and its shared keys.
    pub fn record(&mut self, owner: ObjectId, keys: impl IntoIterator<Item = String>) {
        *self.fires.entry(owner).or_insert(0) += 1;
        for key in keys {
            *self.keys.entry(key).or_insert(0) += 1;
        }
    }

    /// Reset all counts (phase boundary).
    pub fn clear(&mut self) {
        self.fires.clear();
        self.keys.clear();
    }
}
