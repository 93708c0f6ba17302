//! Core building blocks: object identity, configuration, errors, RNG.

pub mod config;
pub mod entity;
pub mod error;
pub mod rng;

pub use config::{GameConfig, PhaseSpec};
pub use entity::ObjectId;
pub use error::{ActionError, Diagnostic, DiagnosticKind, EngineError, VetoReason};
pub use rng::GameRng;
