//! Battle scenarios loaded from TOML
//!
//! A scenario names its weapon definitions once and mounts them on
//! combatants by id. Formations refer to their members and designated
//! target by combatant name.

use ahash::AHashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::battle::ai::behavior::{BehaviorRegistry, BehaviorScope, Mood, UnitRole};
use crate::battle::battlefield::{Battlefield, Combatant, CombatantKind, Formation, HeatState};
use crate::combat::weapons::WeaponDef;
use crate::core::error::{FireControlError, Result};
use crate::core::types::{Position, TeamId, UnitId};

/// A loaded scenario
#[derive(Debug, Clone)]
pub struct Scenario {
    pub battlefield: Battlefield,
    /// Combatant that attacks when the caller names none
    pub attacker: Option<UnitId>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    attacker: Option<String>,
    #[serde(default)]
    behavior: Option<BehaviorRegistry>,
    #[serde(default)]
    team_behavior: Vec<TeamBehaviorSpec>,
    #[serde(default)]
    weapons: Vec<WeaponDef>,
    #[serde(default)]
    combatants: Vec<CombatantSpec>,
    #[serde(default)]
    formations: Vec<FormationSpec>,
}

#[derive(Debug, Deserialize)]
struct TeamBehaviorSpec {
    team: u32,
    #[serde(flatten)]
    scope: BehaviorScope,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CombatantSpec {
    name: String,
    team: u32,
    kind: CombatantKind,
    x: f32,
    y: f32,
    weapons: Vec<String>,
    /// Rounds left per ammo id, applied to every weapon carrying that ammo
    ammo_remaining: HashMap<String, u32>,
    heat: Option<HeatState>,
    melee_damage: Option<f32>,
    leap_damage: Option<f32>,
    movement_range: f32,
    flying_height: f32,
    evasive: bool,
    concealed: bool,
    dead: bool,
    spawn_protected: bool,
    shutdown: bool,
    prone: bool,
    has_moved: bool,
    can_move_after_shooting: bool,
    leg_damage_level: f32,
    max_damage_level: f32,
    durability: f32,
    resolve: f32,
    weakest_location: Option<String>,
    role: UnitRole,
    personality: Option<String>,
    mood: Mood,
    behavior: BehaviorScope,
}

impl Default for CombatantSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            team: 0,
            kind: CombatantKind::Unit,
            x: 0.0,
            y: 0.0,
            weapons: Vec::new(),
            ammo_remaining: HashMap::new(),
            heat: None,
            melee_damage: None,
            leap_damage: None,
            movement_range: 0.0,
            flying_height: 0.0,
            evasive: false,
            concealed: false,
            dead: false,
            spawn_protected: false,
            shutdown: false,
            prone: false,
            has_moved: false,
            can_move_after_shooting: false,
            leg_damage_level: 0.0,
            max_damage_level: 0.0,
            durability: 100.0,
            resolve: 0.0,
            weakest_location: None,
            role: UnitRole::default(),
            personality: None,
            mood: Mood::default(),
            behavior: BehaviorScope::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FormationSpec {
    team: u32,
    members: Vec<String>,
    #[serde(default)]
    designated_target: Option<String>,
    #[serde(default)]
    behavior: BehaviorScope,
}

/// Parse a scenario from TOML
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    let file: ScenarioFile = toml::from_str(content)?;

    let mut battlefield = Battlefield::new();
    if let Some(registry) = file.behavior {
        battlefield.behavior = registry;
    }
    for (name, value) in BehaviorScope::global_defaults().values {
        battlefield.behavior.global.values.entry(name).or_insert(value);
    }
    for spec in file.team_behavior {
        battlefield.behavior.teams.insert(TeamId(spec.team), spec.scope);
    }

    let defs: AHashMap<String, Arc<WeaponDef>> = file
        .weapons
        .into_iter()
        .map(|def| (def.id.clone(), Arc::new(def)))
        .collect();

    for spec in file.combatants {
        let combatant = build_combatant(spec, &defs)?;
        battlefield.add(combatant);
    }

    for spec in file.formations {
        let formation = build_formation(spec, &battlefield)?;
        battlefield.add_formation(formation);
    }

    let attacker = match file.attacker {
        Some(name) => Some(lookup(&battlefield, &name)?),
        None => None,
    };

    tracing::info!(
        "Loaded scenario: {} combatants, {} formations, {} weapon definitions",
        battlefield.combatants.len(),
        battlefield.formations.len(),
        defs.len()
    );
    Ok(Scenario {
        battlefield,
        attacker,
    })
}

/// Load a scenario file
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_scenario(&contents)
}

fn build_combatant(spec: CombatantSpec, defs: &AHashMap<String, Arc<WeaponDef>>) -> Result<Combatant> {
    let position = Position::new(spec.x, spec.y);
    let team = TeamId(spec.team);
    let mut combatant = match spec.kind {
        CombatantKind::Unit => Combatant::unit(spec.name, team, position),
        CombatantKind::Structure => Combatant::structure(spec.name, team, position),
    };

    for weapon_id in &spec.weapons {
        let def = defs
            .get(weapon_id)
            .ok_or_else(|| FireControlError::UnknownWeaponDef(weapon_id.clone()))?;
        combatant.add_weapon(def.clone());
    }
    for weapon in combatant.weapons.iter_mut() {
        for (ammo_id, rounds) in &spec.ammo_remaining {
            if weapon.def.ammo.iter().any(|a| a.id == *ammo_id) {
                weapon.set_remaining_ammo(ammo_id, *rounds);
            }
        }
    }

    combatant.movement_range = spec.movement_range;
    if let Some(damage) = spec.melee_damage {
        combatant = combatant.with_melee(damage, spec.movement_range);
    }
    if let Some(damage) = spec.leap_damage {
        combatant = combatant.with_leap(damage, spec.movement_range);
    }

    combatant.heat = spec.heat;
    combatant.flying_height = spec.flying_height;
    combatant.evasive = spec.evasive;
    combatant.concealed = spec.concealed;
    combatant.is_dead = spec.dead;
    combatant.spawn_protected = spec.spawn_protected;
    combatant.shutdown = spec.shutdown;
    combatant.prone = spec.prone;
    combatant.has_moved_this_round = spec.has_moved;
    combatant.can_move_after_shooting = spec.can_move_after_shooting;
    combatant.leg_damage_level = spec.leg_damage_level;
    combatant.max_damage_level = spec.max_damage_level;
    combatant.durability = spec.durability;
    combatant.resolve = spec.resolve;
    combatant.weakest_location = spec.weakest_location;
    combatant.role = spec.role;
    combatant.personality = spec.personality;
    combatant.mood = spec.mood;
    combatant.behavior = spec.behavior;
    Ok(combatant)
}

fn build_formation(spec: FormationSpec, battlefield: &Battlefield) -> Result<Formation> {
    let mut formation = Formation::new(TeamId(spec.team)).with_behavior(spec.behavior);
    for name in &spec.members {
        formation.members.push(lookup(battlefield, name)?);
    }
    formation.designated_target = match spec.designated_target {
        Some(name) => Some(lookup(battlefield, &name)?),
        None => None,
    };
    Ok(formation)
}

fn lookup(battlefield: &Battlefield, name: &str) -> Result<UnitId> {
    battlefield
        .find_by_name(name)
        .map(|c| c.id)
        .ok_or_else(|| FireControlError::UnitNotFound(name.to_string()))
}
