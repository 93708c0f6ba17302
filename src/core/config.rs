//! Game configuration.
//!
//! Games configure the engine at startup by providing a `GameConfig`:
//! the phase cycle, the RNG seed, and which built-in aux objects are
//! registered automatically. Configuration over convention: the engine
//! hardcodes nothing beyond the reserved `startup`/`shutdown` phases.

use serde::{Deserialize, Serialize};

use crate::state::phase::ResolutionPolicy;

/// One step of the repeating phase cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// Base phase name, e.g. `"day"`. Display names carry the cycle
    /// number (`"day 1"`, `"day 2"`, …).
    pub name: String,

    /// How actions enqueued during this phase are resolved.
    pub policy: ResolutionPolicy,
}

impl PhaseSpec {
    /// Create a new phase spec.
    pub fn new(name: impl Into<String>, policy: ResolutionPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }
}

/// Complete game configuration.
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Seed for the game's RNG (prefab role assignment).
    pub seed: u64,

    /// The repeating phase cycle. Defaults to an instant `day` followed by
    /// an end-of-phase `night`.
    pub cycle: Vec<PhaseSpec>,

    /// Register the built-in lynch tally under `"tally.lynch"`.
    pub lynch_tally: bool,

    /// Register the built-in game ender under `"game.ender"`.
    pub game_ender: bool,
}

impl GameConfig {
    /// Create a configuration with the default day/night cycle and the
    /// built-in tally and ender enabled.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            cycle: vec![
                PhaseSpec::new("day", ResolutionPolicy::Instant),
                PhaseSpec::new("night", ResolutionPolicy::EndOfPhase),
            ],
            lynch_tally: true,
            game_ender: true,
        }
    }

    /// Replace the phase cycle (builder pattern).
    #[must_use]
    pub fn with_cycle(mut self, cycle: Vec<PhaseSpec>) -> Self {
        self.cycle = cycle;
        self
    }

    /// Disable the built-in lynch tally (builder pattern).
    #[must_use]
    pub fn without_lynch_tally(mut self) -> Self {
        self.lynch_tally = false;
        self
    }

    /// Disable the built-in game ender (builder pattern).
    #[must_use]
    pub fn without_game_ender(mut self) -> Self {
        self.game_ender = false;
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cycle() {
        let config = GameConfig::new(42);
        assert_eq!(config.cycle.len(), 2);
        assert_eq!(config.cycle[0].name, "day");
        assert_eq!(config.cycle[0].policy, ResolutionPolicy::Instant);
        assert_eq!(config.cycle[1].name, "night");
        assert_eq!(config.cycle[1].policy, ResolutionPolicy::EndOfPhase);
        assert!(config.lynch_tally);
        assert!(config.game_ender);
    }

    #[test]
    fn test_builder() {
        let config = GameConfig::new(1)
            .with_cycle(vec![PhaseSpec::new("dusk", ResolutionPolicy::Instant)])
            .without_lynch_tally()
            .without_game_ender();

        assert_eq!(config.cycle.len(), 1);
        assert!(!config.lynch_tally);
        assert!(!config.game_ender);
    }
}
