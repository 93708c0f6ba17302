//! Actors and factions.
//!
//! An actor is a player entity: display name, factions (at least one in a
//! well-formed game), ability/trigger ids, and a status bag. A faction is a
//! named team: an ordered member list plus the ids of its outcome checkers.
//!
//! Membership changes are direct mutations, not action-mediated; they go
//! through [`GameState`](super::GameState) so both back-references stay
//! consistent.

use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::core::entity::ObjectId;

/// A player entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Actor {
    /// Stable id.
    pub id: ObjectId,

    /// Display name, unique within the game.
    pub name: String,

    /// Factions this actor belongs to, in join order.
    pub factions: Vec<ObjectId>,

    /// Activated abilities owned by this actor.
    pub abilities: Vec<ObjectId>,

    /// Passive triggers owned by this actor.
    pub triggers: Vec<ObjectId>,

    /// Mutable attribute bag.
    pub status: Status,
}

impl Actor {
    /// Create a new actor with an empty status.
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            factions: Vec::new(),
            abilities: Vec::new(),
            triggers: Vec::new(),
            status: Status::new(),
        }
    }

    /// Is this actor alive?
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.status.is_dead()
    }

    /// Does this actor share a faction with `other`?
    #[must_use]
    pub fn shares_faction(&self, other: &Actor) -> bool {
        self.factions.iter().any(|f| other.factions.contains(f))
    }
}

/// A team of actors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Faction {
    /// Stable id.
    pub id: ObjectId,

    /// Display name, unique within the game.
    pub name: String,

    /// Member actor ids, in join order.
    pub members: Vec<ObjectId>,

    /// Outcome checkers bound to this faction.
    pub checkers: Vec<ObjectId>,
}

impl Faction {
    /// Create a new empty faction.
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
            checkers: Vec::new(),
        }
    }
}
