//! Object identification.
//!
//! Every first-class game object (actor, faction, ability, trigger, aux
//! object, outcome checker, and the game itself) has a unique `ObjectId`
//! assigned by the [`Game`](crate::game::Game) at creation time.
//!
//! ## ID Layout
//!
//! - `0`: reserved for the game context itself (the source of system
//!   actions such as phase transitions).
//! - `1..`: everything else, in creation order.
//!
//! Ids are never reused. Cross-references between objects (actor ↔ faction,
//! ability ↔ actor) are stored as ids and resolved at use time, so the
//! ownership graph has no cycles: the game owns everything, everyone else
//! holds ids.

use serde::{Deserialize, Serialize};

/// Unique identifier for any game object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// The game context's own id.
    pub const GAME: ObjectId = ObjectId(0);

    /// Create a new object ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}
