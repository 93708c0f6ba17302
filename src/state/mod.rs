//! Game state: actors, factions, statuses, and the phase cycle.
//!
//! `GameState` is the read side handed to subscribers during dispatch.
//! All mutation happens through the [`Game`](crate::game::Game) (setup calls
//! and action execution); handlers only ever see `&GameState`.

pub mod actor;
pub mod phase;
pub mod status;

pub use actor::{Actor, Faction};
pub use phase::{Phase, PhaseCycle, ResolutionPolicy, SHUTDOWN, STARTUP};
pub use status::{Status, StatusValue, DEAD, OUTCOME};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::entity::ObjectId;
use crate::core::error::EngineError;

/// The authoritative state of one game.
///
/// Lookup tables are hash maps; iteration always goes through the ordered
/// id vectors so that dispatch and queries are deterministic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    next_id: u32,
    names: FxHashMap<String, ObjectId>,

    actors: FxHashMap<ObjectId, Actor>,
    actor_order: Vec<ObjectId>,

    factions: FxHashMap<ObjectId, Faction>,
    faction_order: Vec<ObjectId>,

    /// The phase progression.
    pub phases: PhaseCycle,
}

impl GameState {
    /// Create an empty state positioned at `startup`.
    pub fn new(phases: PhaseCycle) -> Self {
        Self {
            next_id: 1, // 0 is the game itself
            names: FxHashMap::default(),
            actors: FxHashMap::default(),
            actor_order: Vec::new(),
            factions: FxHashMap::default(),
            faction_order: Vec::new(),
            phases,
        }
    }

    /// Allocate the next object id.
    pub fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Reserve a unique display name for an id.
    pub fn claim_name(&mut self, name: &str, id: ObjectId) -> Result<(), EngineError> {
        if self.names.contains_key(name) {
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        self.names.insert(name.to_string(), id);
        Ok(())
    }

    /// Resolve a display name to an id.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    // === Actors ===

    /// Insert a fully-built actor.
    pub(crate) fn insert_actor(&mut self, actor: Actor) {
        self.actor_order.push(actor.id);
        self.actors.insert(actor.id, actor);
    }

    /// Get an actor by id.
    #[must_use]
    pub fn actor(&self, id: ObjectId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Get a mutable actor by id.
    pub(crate) fn actor_mut(&mut self, id: ObjectId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Get an actor by name.
    #[must_use]
    pub fn actor_by_name(&self, name: &str) -> Option<&Actor> {
        self.id_by_name(name).and_then(|id| self.actor(id))
    }

    /// All actor ids in creation order.
    #[must_use]
    pub fn actor_ids(&self) -> &[ObjectId] {
        &self.actor_order
    }

    /// Iterate actors in creation order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actor_order.iter().filter_map(|id| self.actors.get(id))
    }

    /// Is the actor alive? Unknown ids are not alive.
    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.actor(id).is_some_and(Actor::is_alive)
    }

    /// Ids of all living actors, in creation order.
    #[must_use]
    pub fn living_actors(&self) -> Vec<ObjectId> {
        self.actor_order
            .iter()
            .copied()
            .filter(|&id| self.is_alive(id))
            .collect()
    }

    // === Factions ===

    /// Insert a fully-built faction.
    pub(crate) fn insert_faction(&mut self, faction: Faction) {
        self.faction_order.push(faction.id);
        self.factions.insert(faction.id, faction);
    }

    /// Get a faction by id.
    #[must_use]
    pub fn faction(&self, id: ObjectId) -> Option<&Faction> {
        self.factions.get(&id)
    }

    /// Get a mutable faction by id.
    pub(crate) fn faction_mut(&mut self, id: ObjectId) -> Option<&mut Faction> {
        self.factions.get_mut(&id)
    }

    /// Get a faction by name.
    #[must_use]
    pub fn faction_by_name(&self, name: &str) -> Option<&Faction> {
        self.id_by_name(name).and_then(|id| self.faction(id))
    }

    /// All faction ids in creation order.
    #[must_use]
    pub fn faction_ids(&self) -> &[ObjectId] {
        &self.faction_order
    }

    /// Add an actor to a faction, keeping both back-references consistent.
    pub fn join_faction(&mut self, actor: ObjectId, faction: ObjectId) {
        if let Some(f) = self.factions.get_mut(&faction) {
            if !f.members.contains(&actor) {
                f.members.push(actor);
            }
        }
        if let Some(a) = self.actors.get_mut(&actor) {
            if !a.factions.contains(&faction) {
                a.factions.push(faction);
            }
        }
    }

    /// Remove an actor from a faction.
    pub fn leave_faction(&mut self, actor: ObjectId, faction: ObjectId) {
        if let Some(f) = self.factions.get_mut(&faction) {
            f.members.retain(|&m| m != actor);
        }
        if let Some(a) = self.actors.get_mut(&actor) {
            a.factions.retain(|&f| f != faction);
        }
    }

    /// Living members of a faction, in join order.
    #[must_use]
    pub fn living_members(&self, faction: ObjectId) -> Vec<ObjectId> {
        self.faction(faction)
            .map(|f| {
                f.members
                    .iter()
                    .copied()
                    .filter(|&m| self.is_alive(m))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PhaseSpec;

    fn state() -> GameState {
        let cycle = PhaseCycle::new(vec![
            PhaseSpec::new("day", ResolutionPolicy::Instant),
            PhaseSpec::new("night", ResolutionPolicy::EndOfPhase),
        ])
        .unwrap();
        GameState::new(cycle)
    }

    #[test]
    fn test_ids_start_after_game() {
        let mut s = state();
        assert_eq!(s.alloc_id(), ObjectId(1));
        assert_eq!(s.alloc_id(), ObjectId(2));
    }

    #[test]
    fn test_duplicate_name() {
        let mut s = state();
        s.claim_name("Alice", ObjectId(1)).unwrap();
        assert_eq!(
            s.claim_name("Alice", ObjectId(2)),
            Err(EngineError::DuplicateName("Alice".into()))
        );
    }

    #[test]
    fn test_faction_membership_roundtrip() {
        let mut s = state();
        let a = s.alloc_id();
        let f = s.alloc_id();
        s.insert_actor(Actor::new(a, "Alice"));
        s.insert_faction(Faction::new(f, "town"));

        s.join_faction(a, f);
        assert_eq!(s.faction(f).unwrap().members, vec![a]);
        assert_eq!(s.actor(a).unwrap().factions, vec![f]);

        s.leave_faction(a, f);
        assert!(s.faction(f).unwrap().members.is_empty());
        assert!(s.actor(a).unwrap().factions.is_empty());
    }

    #[test]
    fn test_living_members() {
        let mut s = state();
        let a = s.alloc_id();
        let b = s.alloc_id();
        let f = s.alloc_id();
        s.insert_actor(Actor::new(a, "Alice"));
        s.insert_actor(Actor::new(b, "Bob"));
        s.insert_faction(Faction::new(f, "town"));
        s.join_faction(a, f);
        s.join_faction(b, f);

        s.actor_mut(b).unwrap().status.set(DEAD, true.into());

        assert_eq!(s.living_members(f), vec![a]);
        assert_eq!(s.living_actors(), vec![a]);
    }
}
