//! Phases and the phase cycle.
//!
//! A phase is a named interval with an action-resolution policy. Two names
//! are reserved: `startup` (initial) and `shutdown` (terminal), both always
//! instant. Between them the game walks a repeating cycle (by default an
//! instant `day` followed by an end-of-phase `night`) and phase display
//! names carry the cycle number: `day 1`, `night 1`, `day 2`, …
//!
//! The cycle only moves forward. `resolve` accepts a bare base name
//! (meaning the next occurrence of that phase) or an explicit `"day 3"`
//! style name; a target behind the current position is an error.

use serde::{Deserialize, Serialize};

use crate::core::config::PhaseSpec;
use crate::core::error::EngineError;

/// Reserved name of the initial phase.
pub const STARTUP: &str = "startup";

/// Reserved name of the terminal phase.
pub const SHUTDOWN: &str = "shutdown";

/// How actions enqueued during a phase are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionPolicy {
    /// The main queue drains immediately after every processed event.
    Instant,
    /// Actions accumulate and drain when the phase ends.
    EndOfPhase,
}

/// A phase of the game.
///
/// Equality is on identity (base name + cycle number), not policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Phase {
    /// Base name: `"startup"`, `"shutdown"`, or a cycle step name.
    pub base: String,

    /// Cycle number, starting at 1. Zero for `startup`/`shutdown`.
    pub cycle: u32,

    /// Resolution policy for this phase.
    pub policy: ResolutionPolicy,
}

impl Phase {
    fn reserved(base: &str) -> Self {
        Self {
            base: base.into(),
            cycle: 0,
            policy: ResolutionPolicy::Instant,
        }
    }

    /// Display name: `"day 2"`, or the bare name for reserved phases.
    #[must_use]
    pub fn name(&self) -> String {
        if self.cycle == 0 {
            self.base.clone()
        } else {
            format!("{} {}", self.base, self.cycle)
        }
    }

    /// Is this the startup phase?
    #[must_use]
    pub fn is_startup(&self) -> bool {
        self.base == STARTUP
    }

    /// Is this the shutdown phase?
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.base == SHUTDOWN
    }
}

impl PartialEq for Phase {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.cycle == other.cycle
    }
}

impl Eq for Phase {}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Position within the phase progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Position {
    Startup,
    Step(u64),
    Shutdown,
}

/// The phase progression of one game.
///
/// `startup → <cycle step 0> 1 → <cycle step 1> 1 → … → shutdown`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseCycle {
    steps: Vec<PhaseSpec>,
    position: Position,
}

impl PhaseCycle {
    /// Create a phase cycle from step specs.
    ///
    /// Step names must be unique and must not use the reserved names.
    pub fn new(steps: Vec<PhaseSpec>) -> Result<Self, EngineError> {
        if steps.is_empty() {
            return Err(EngineError::InvalidPhaseTransition(
                "phase cycle must have at least one step".into(),
            ));
        }
        let mut seen = Vec::new();
        for step in &steps {
            if step.name == STARTUP || step.name == SHUTDOWN {
                return Err(EngineError::DuplicateName(step.name.clone()));
            }
            if seen.contains(&step.name.as_str()) {
                return Err(EngineError::DuplicateName(step.name.clone()));
            }
            seen.push(&step.name);
        }
        Ok(Self {
            steps,
            position: Position::Startup,
        })
    }

    fn phase_at(&self, index: u64) -> Phase {
        let step = &self.steps[(index % self.steps.len() as u64) as usize];
        Phase {
            base: step.name.clone(),
            cycle: (index / self.steps.len() as u64) as u32 + 1,
            policy: step.policy,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn current(&self) -> Phase {
        match self.position {
            Position::Startup => Phase::reserved(STARTUP),
            Position::Shutdown => Phase::reserved(SHUTDOWN),
            Position::Step(i) => self.phase_at(i),
        }
    }

    /// The phase `advance` would move to, without moving.
    pub fn peek_next(&self) -> Result<Phase, EngineError> {
        match self.position {
            Position::Startup => Ok(self.phase_at(0)),
            Position::Step(i) => Ok(self.phase_at(i + 1)),
            Position::Shutdown => Err(EngineError::InvalidPhaseTransition(
                "shutdown is terminal".into(),
            )),
        }
    }

    /// Move to the next phase in the progression and return it.
    pub fn advance(&mut self) -> Result<Phase, EngineError> {
        self.position = match self.position {
            Position::Startup => Position::Step(0),
            Position::Step(i) => Position::Step(i + 1),
            Position::Shutdown => {
                return Err(EngineError::InvalidPhaseTransition(
                    "shutdown is terminal".into(),
                ))
            }
        };
        Ok(self.current())
    }

    /// Resolve a phase name to the phase it denotes from the current
    /// position.
    ///
    /// A bare cycle-step name (`"night"`) means its next occurrence; an
    /// explicit name (`"night 3"`) is absolute. `"shutdown"` is always
    /// legal; `"startup"` is only the current phase, never a target.
    pub fn resolve(&self, name: &str) -> Result<Phase, EngineError> {
        if name == SHUTDOWN {
            return Ok(Phase::reserved(SHUTDOWN));
        }
        if name == STARTUP {
            return Err(EngineError::InvalidPhaseTransition(
                "cannot return to startup".into(),
            ));
        }

        let (base, explicit_cycle) = match name.rsplit_once(' ') {
            Some((base, num)) => match num.parse::<u32>() {
                Ok(n) if n >= 1 => (base, Some(n)),
                _ => (name, None),
            },
            None => (name, None),
        };

        let step_index = self
            .steps
            .iter()
            .position(|s| s.name == base)
            .ok_or_else(|| EngineError::UnknownKind(name.to_string()))? as u64;

        let len = self.steps.len() as u64;
        let index = match explicit_cycle {
            Some(n) => (u64::from(n) - 1) * len + step_index,
            None => {
                // Next occurrence strictly after the current position.
                match self.position {
                    Position::Startup => step_index,
                    Position::Step(i) => {
                        let round = i / len;
                        let candidate = round * len + step_index;
                        if candidate > i {
                            candidate
                        } else {
                            candidate + len
                        }
                    }
                    Position::Shutdown => {
                        return Err(EngineError::InvalidPhaseTransition(
                            "shutdown is terminal".into(),
                        ))
                    }
                }
            }
        };
        Ok(self.phase_at(index))
    }

    /// Jump forward to the given phase.
    ///
    /// The target must be `shutdown` or a cycle phase at or ahead of the
    /// current position; moving backwards is an error.
    pub fn advance_to(&mut self, target: &Phase) -> Result<Phase, EngineError> {
        if self.position == Position::Shutdown {
            return Err(EngineError::InvalidPhaseTransition(
                "shutdown is terminal".into(),
            ));
        }
        if target.is_shutdown() {
            self.position = Position::Shutdown;
            return Ok(self.current());
        }
        if target.is_startup() {
            return Err(EngineError::InvalidPhaseTransition(
                "cannot return to startup".into(),
            ));
        }

        let len = self.steps.len() as u64;
        let step_index = self
            .steps
            .iter()
            .position(|s| s.name == target.base)
            .ok_or_else(|| EngineError::UnknownKind(target.base.clone()))? as u64;
        let index = (u64::from(target.cycle) - 1) * len + step_index;

        match self.position {
            Position::Startup => {}
            Position::Step(i) if index > i => {}
            Position::Step(_) => {
                return Err(EngineError::InvalidPhaseTransition(format!(
                    "cannot move back to {}",
                    target.name()
                )))
            }
            Position::Shutdown => unreachable!(),
        }
        self.position = Position::Step(index);
        Ok(self.current())
    }
}
