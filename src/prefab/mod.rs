//! Declarative game templates.
//!
//! A prefab is the in-memory model a declarative loader targets: factions
//! with win-condition specs, roles with ability and trigger specs, and
//! variants mapping a player count to a role multiset. Kind names resolve
//! through string-keyed registries ([`KindRegistry`]); an unresolved name
//! is an [`EngineError::UnknownKind`].
//!
//! Building a prefab into a [`Game`] shuffles the variant's role deck with
//! the game's seeded RNG and deals one role per player, so a fixed seed
//! gives a fixed assignment.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::abilities::ability::{Ability, AbilityKind};
use crate::abilities::constraint::Constraint;
use crate::abilities::trigger::{Trigger, TriggerKind};
use crate::core::config::GameConfig;
use crate::core::entity::ObjectId;
use crate::core::error::EngineError;
use crate::game::Game;
use crate::outcomes::{Outcome, OutcomeChecker, WinCondition};

/// Shared usage key of the faction-wide mafia kill.
pub const MAFIA_KILL_KEY: &str = "mafia_kill";

/// A constraint spec: kind name plus optional parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Kind name, resolved through the registry.
    pub kind: String,

    /// Phase names, for phase constraints.
    #[serde(default)]
    pub phases: Vec<String>,

    /// Shared usage key, for key-limited constraints.
    #[serde(default)]
    pub key: Option<String>,

    /// Usage limit, for limited constraints. Defaults to 1.
    #[serde(default)]
    pub uses: Option<u32>,
}

impl ConstraintSpec {
    /// A bare kind with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// A phase constraint.
    pub fn phase(names: &[&str]) -> Self {
        Self {
            kind: "phase".into(),
            phases: names.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// A shared key limit.
    pub fn key_limited(key: impl Into<String>, uses: u32) -> Self {
        Self {
            kind: "key_phase_limited".into(),
            key: Some(key.into()),
            uses: Some(uses),
            ..Self::default()
        }
    }
}

/// An ability spec on a role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySpec {
    /// Kind name, resolved through the registry.
    pub kind: String,

    /// Name the ability is activated by.
    pub name: String,

    /// Constraint specs.
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

/// A trigger spec on a role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Kind name, resolved through the registry.
    pub kind: String,

    /// Display name.
    pub name: String,
}

/// A win-condition spec on a faction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinConditionSpec {
    /// Kind name, resolved through the registry.
    pub kind: String,

    /// The outcome to report when the condition holds.
    pub outcome: Outcome,

    /// The faction the condition inspects. Defaults to the owning faction.
    #[serde(default)]
    pub faction: Option<String>,
}

/// A faction spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSpec {
    /// Faction name.
    pub name: String,

    /// Win-condition specs.
    #[serde(default)]
    pub win_conditions: Vec<WinConditionSpec>,
}

/// A role spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name.
    pub name: String,

    /// Faction the role belongs to.
    pub faction: String,

    /// Ability specs.
    #[serde(default)]
    pub abilities: Vec<AbilitySpec>,

    /// Trigger specs.
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
}

/// A variant: the role multiset for one player count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Player count this variant serves.
    pub players: usize,

    /// (role name, count) pairs.
    pub roles: Vec<(String, usize)>,
}

/// A declarative game template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefab {
    /// Template name.
    pub name: String,

    /// Faction specs.
    pub factions: Vec<FactionSpec>,

    /// Role specs.
    pub roles: Vec<RoleSpec>,

    /// Variants by player count.
    pub variants: Vec<Variant>,
}

/// Kind identifiers the constraint registry resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConstraintTemplate {
    SourceAlive,
    TargetAlive,
    PhaseIs,
    LimitPerPhaseActor,
    LimitPerPhaseKey,
    NoSelfFactionTarget,
}

/// Kind identifiers the win-condition registry resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WinConditionTemplate {
    FactionEliminated,
    Majority,
}

/// String-keyed registries for prefab resolution.
#[derive(Clone, Debug)]
pub struct KindRegistry {
    abilities: FxHashMap<String, AbilityKind>,
    triggers: FxHashMap<String, TriggerKind>,
    constraints: FxHashMap<String, ConstraintTemplate>,
    win_conditions: FxHashMap<String, WinConditionTemplate>,
}

impl KindRegistry {
    /// The registry with all built-in kinds.
    #[must_use]
    pub fn new() -> Self {
        let mut abilities = FxHashMap::default();
        abilities.insert("vote".to_string(), AbilityKind::Vote);
        abilities.insert("lynch_vote".to_string(), AbilityKind::Vote);
        abilities.insert("kill".to_string(), AbilityKind::Kill);
        abilities.insert("protect".to_string(), AbilityKind::Protect);
        abilities.insert("phase_change".to_string(), AbilityKind::ChangePhase);

        let mut triggers = FxHashMap::default();
        triggers.insert("unkillable".to_string(), TriggerKind::Unkillable);

        let mut constraints = FxHashMap::default();
        constraints.insert("alive".to_string(), ConstraintTemplate::SourceAlive);
        constraints.insert("target_alive".to_string(), ConstraintTemplate::TargetAlive);
        constraints.insert("phase".to_string(), ConstraintTemplate::PhaseIs);
        constraints.insert(
            "action_limit".to_string(),
            ConstraintTemplate::LimitPerPhaseActor,
        );
        constraints.insert(
            "key_phase_limited".to_string(),
            ConstraintTemplate::LimitPerPhaseKey,
        );
        constraints.insert(
            "no_self_faction".to_string(),
            ConstraintTemplate::NoSelfFactionTarget,
        );

        let mut win_conditions = FxHashMap::default();
        win_conditions.insert(
            "faction_eliminated".to_string(),
            WinConditionTemplate::FactionEliminated,
        );
        win_conditions.insert("majority".to_string(), WinConditionTemplate::Majority);

        Self {
            abilities,
            triggers,
            constraints,
            win_conditions,
        }
    }

    /// Resolve an ability kind name.
    pub fn ability(&self, name: &str) -> Result<AbilityKind, EngineError> {
        self.abilities
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownKind(name.to_string()))
    }

    /// Resolve a trigger kind name.
    pub fn trigger(&self, name: &str) -> Result<TriggerKind, EngineError> {
        self.triggers
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownKind(name.to_string()))
    }

    /// Resolve a constraint spec.
    pub fn constraint(&self, spec: &ConstraintSpec) -> Result<Constraint, EngineError> {
        let template = self
            .constraints
            .get(&spec.kind)
            .ok_or_else(|| EngineError::UnknownKind(spec.kind.clone()))?;
        let constraint = match template {
            ConstraintTemplate::SourceAlive => Constraint::SourceAlive,
            ConstraintTemplate::TargetAlive => Constraint::TargetAlive,
            ConstraintTemplate::PhaseIs => Constraint::PhaseIs(spec.phases.clone()),
            ConstraintTemplate::LimitPerPhaseActor => {
                Constraint::LimitPerPhaseActor(spec.uses.unwrap_or(1))
            }
            ConstraintTemplate::LimitPerPhaseKey => {
                let key = spec.key.clone().ok_or_else(|| {
                    EngineError::UnknownKind("key_phase_limited without a key".to_string())
                })?;
                Constraint::LimitPerPhaseKey {
                    key,
                    max: spec.uses.unwrap_or(1),
                }
            }
            ConstraintTemplate::NoSelfFactionTarget => Constraint::NoSelfFactionTarget,
        };
        Ok(constraint)
    }

    /// Resolve a win-condition spec for a faction.
    ///
    /// `own` is the owning faction, `by_name` resolves referenced ones.
    fn win_condition(
        &self,
        spec: &WinConditionSpec,
        own: ObjectId,
        by_name: &FxHashMap<String, ObjectId>,
    ) -> Result<WinCondition, EngineError> {
        let template = self
            .win_conditions
            .get(&spec.kind)
            .ok_or_else(|| EngineError::UnknownKind(spec.kind.clone()))?;
        let subject = match &spec.faction {
            Some(name) => *by_name
                .get(name)
                .ok_or_else(|| EngineError::UnknownKind(name.clone()))?,
            None => own,
        };
        Ok(match template {
            WinConditionTemplate::FactionEliminated => WinCondition::FactionEliminated(subject),
            WinConditionTemplate::Majority => WinCondition::FactionMajority(subject),
        })
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Prefab {
    /// The classic open setup: a town of citizens against a mafia that
    /// shares one night kill.
    #[must_use]
    pub fn vanilla() -> Self {
        let citizen_abilities = vec![AbilitySpec {
            kind: "vote".into(),
            name: "vote".into(),
            constraints: vec![ConstraintSpec::new("alive"), ConstraintSpec::phase(&["day"])],
        }];
        let mafioso_abilities = vec![
            AbilitySpec {
                kind: "vote".into(),
                name: "vote".into(),
                constraints: vec![ConstraintSpec::new("alive"), ConstraintSpec::phase(&["day"])],
            },
            AbilitySpec {
                kind: "kill".into(),
                name: "kill".into(),
                constraints: vec![
                    ConstraintSpec::new("alive"),
                    ConstraintSpec::new("target_alive"),
                    ConstraintSpec::phase(&["night"]),
                    ConstraintSpec::key_limited(MAFIA_KILL_KEY, 1),
                    ConstraintSpec::new("no_self_faction"),
                ],
            },
        ];

        Self {
            name: "vanilla".into(),
            factions: vec![
                FactionSpec {
                    name: "town".into(),
                    win_conditions: vec![
                        WinConditionSpec {
                            kind: "faction_eliminated".into(),
                            outcome: Outcome::Victory,
                            faction: Some("mafia".into()),
                        },
                        WinConditionSpec {
                            kind: "majority".into(),
                            outcome: Outcome::Defeat,
                            faction: Some("mafia".into()),
                        },
                    ],
                },
                FactionSpec {
                    name: "mafia".into(),
                    win_conditions: vec![
                        WinConditionSpec {
                            kind: "majority".into(),
                            outcome: Outcome::Victory,
                            faction: None,
                        },
                        WinConditionSpec {
                            kind: "faction_eliminated".into(),
                            outcome: Outcome::Defeat,
                            faction: None,
                        },
                    ],
                },
            ],
            roles: vec![
                RoleSpec {
                    name: "citizen".into(),
                    faction: "town".into(),
                    abilities: citizen_abilities,
                    triggers: Vec::new(),
                },
                RoleSpec {
                    name: "mafioso".into(),
                    faction: "mafia".into(),
                    abilities: mafioso_abilities,
                    triggers: Vec::new(),
                },
            ],
            variants: (3..=10)
                .map(|players| {
                    let mafiosi = if players >= 7 { 2 } else { 1 };
                    Variant {
                        players,
                        roles: vec![
                            ("citizen".into(), players - mafiosi),
                            ("mafioso".into(), mafiosi),
                        ],
                    }
                })
                .collect(),
        }
    }

    /// The variant serving a player count.
    #[must_use]
    pub fn variant_for(&self, players: usize) -> Option<&Variant> {
        self.variants.iter().find(|v| v.players == players)
    }

    /// Build a game, dealing roles to the named players.
    pub fn build(&self, players: &[&str], config: GameConfig) -> Result<Game, EngineError> {
        self.build_with(&KindRegistry::new(), players, config)
    }

    /// Build with an explicit kind registry.
    pub fn build_with(
        &self,
        registry: &KindRegistry,
        players: &[&str],
        config: GameConfig,
    ) -> Result<Game, EngineError> {
        let variant = self
            .variant_for(players.len())
            .ok_or_else(|| {
                EngineError::UnknownKind(format!(
                    "{}: no variant for {} players",
                    self.name,
                    players.len()
                ))
            })?
            .clone();

        let mut game = Game::new(config)?;

        // Factions first; win conditions may reference each other.
        let mut faction_ids: FxHashMap<String, ObjectId> = FxHashMap::default();
        for spec in &self.factions {
            let id = game.add_faction(&spec.name)?;
            faction_ids.insert(spec.name.clone(), id);
        }
        for spec in &self.factions {
            let own = faction_ids[&spec.name];
            for wc in &spec.win_conditions {
                let condition = registry.win_condition(wc, own, &faction_ids)?;
                game.add_checker(OutcomeChecker::new(ObjectId(0), own, wc.outcome, condition))?;
            }
        }

        // Deal the role deck.
        let mut deck: Vec<&RoleSpec> = Vec::new();
        for (role_name, count) in &variant.roles {
            let role = self
                .roles
                .iter()
                .find(|r| r.name == *role_name)
                .ok_or_else(|| EngineError::UnknownKind(role_name.clone()))?;
            for _ in 0..*count {
                deck.push(role);
            }
        }
        if deck.len() != players.len() {
            return Err(EngineError::EngineBug(format!(
                "variant for {} players deals {} roles",
                players.len(),
                deck.len()
            )));
        }
        game.rng_mut().shuffle(&mut deck);

        for (name, role) in players.iter().zip(deck) {
            let actor = game.add_actor(name)?;
            let faction = *faction_ids
                .get(&role.faction)
                .ok_or_else(|| EngineError::UnknownKind(role.faction.clone()))?;
            game.join_faction(actor, faction);

            for spec in &role.abilities {
                let kind = registry.ability(&spec.kind)?;
                let mut ability = Ability::new(ObjectId(0), actor, &spec.name, kind);
                for c in &spec.constraints {
                    ability.constraints.push(registry.constraint(c)?);
                }
                game.add_ability(ability)?;
            }
            for spec in &role.triggers {
                let kind = registry.trigger(&spec.kind)?;
                game.add_trigger(Trigger::new(ObjectId(0), actor, &spec.name, kind))?;
            }
        }

        Ok(game)
    }
}
