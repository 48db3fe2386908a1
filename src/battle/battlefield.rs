//! Battlefield snapshot: combatants, formations and shared behavior scopes
//!
//! The attack engine reads this snapshot; only committing a chosen order
//! writes back to it (the selected ammo-modes of the attacker's weapons).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::battle::ai::behavior::{BehaviorRegistry, BehaviorScope, Mood, UnitRole};
use crate::combat::weapons::{Weapon, WeaponDef, WeaponKind};
use crate::core::types::{FormationId, Position, TeamId, UnitId, WeaponId};

/// Whether a combatant is a unit or a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatantKind {
    #[default]
    Unit,
    Structure,
}

/// Heat bookkeeping for heat-tracked units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatState {
    pub current: f32,
    /// Heat already queued this activation (jumping, previous attacks)
    pub temp: f32,
    /// Heat dissipated at the end of the activation
    pub heatsink_capacity: f32,
    /// Highest heat the unit tolerates before risking shutdown
    pub acceptable: f32,
}

/// A unit or structure on the battlefield
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: UnitId,
    pub name: String,
    pub team: TeamId,
    pub kind: CombatantKind,
    pub formation: Option<FormationId>,

    // Position
    pub position: Position,
    pub flying_height: f32,
    pub evasive: bool,
    /// Out of sight from every hostile position
    pub concealed: bool,

    // Status
    pub is_dead: bool,
    pub spawn_protected: bool,
    pub shutdown: bool,
    pub prone: bool,
    pub heat: Option<HeatState>,
    pub has_moved_this_round: bool,
    pub can_move_after_shooting: bool,
    pub jump_capable: bool,
    /// Distance the unit can cover to reach a melee position
    pub movement_range: f32,
    /// Damage level (0.0 to 1.0) of the unit's legs
    pub leg_damage_level: f32,
    /// Damage level (0.0 to 1.0) of the most damaged hittable location
    pub max_damage_level: f32,
    /// Armor plus structure remaining
    pub durability: f32,
    /// Points available for special attacks (called shots, offensive pushes)
    pub resolve: f32,
    /// Location a called shot would aim for
    pub weakest_location: Option<String>,

    // Weapons
    pub weapons: Vec<Weapon>,
    pub melee_weapon: Option<Weapon>,
    pub leap_weapon: Option<Weapon>,
    /// Raw damage of the physical melee strike
    pub melee_damage: f32,
    /// Raw damage of the leap strike
    pub leap_damage: f32,

    // Behavior
    pub role: UnitRole,
    pub personality: Option<String>,
    pub mood: Mood,
    /// Per-unit behavior overrides
    pub behavior: BehaviorScope,

    next_weapon_id: u32,
}

impl Combatant {
    fn new(name: impl Into<String>, team: TeamId, kind: CombatantKind, position: Position) -> Self {
        Self {
            id: UnitId::new(),
            name: name.into(),
            team,
            kind,
            formation: None,
            position,
            flying_height: 0.0,
            evasive: false,
            concealed: false,
            is_dead: false,
            spawn_protected: false,
            shutdown: false,
            prone: false,
            heat: None,
            has_moved_this_round: false,
            can_move_after_shooting: false,
            jump_capable: false,
            movement_range: 0.0,
            leg_damage_level: 0.0,
            max_damage_level: 0.0,
            durability: 100.0,
            resolve: 0.0,
            weakest_location: None,
            weapons: Vec::new(),
            melee_weapon: None,
            leap_weapon: None,
            melee_damage: 0.0,
            leap_damage: 0.0,
            role: UnitRole::default(),
            personality: None,
            mood: Mood::default(),
            behavior: BehaviorScope::default(),
            next_weapon_id: 1,
        }
    }

    pub fn unit(name: impl Into<String>, team: TeamId, position: Position) -> Self {
        Self::new(name, team, CombatantKind::Unit, position)
    }

    pub fn structure(name: impl Into<String>, team: TeamId, position: Position) -> Self {
        Self::new(name, team, CombatantKind::Structure, position)
    }

    fn next_weapon_id(&mut self) -> WeaponId {
        let id = WeaponId(self.next_weapon_id);
        self.next_weapon_id += 1;
        id
    }

    /// Mount a weapon built from `def`
    pub fn with_weapon(mut self, def: Arc<WeaponDef>) -> Self {
        self.add_weapon(def);
        self
    }

    pub fn add_weapon(&mut self, def: Arc<WeaponDef>) -> WeaponId {
        let id = self.next_weapon_id();
        self.weapons.push(Weapon::new(id, def));
        id
    }

    pub fn with_heat(mut self, heat: HeatState) -> Self {
        self.heat = Some(heat);
        self
    }

    /// Give the unit a physical melee strike
    pub fn with_melee(mut self, damage: f32, movement_range: f32) -> Self {
        let id = self.next_weapon_id();
        let def = Arc::new(WeaponDef::strike("melee", WeaponKind::MeleeStrike));
        self.melee_weapon = Some(Weapon::new(id, def));
        self.melee_damage = damage;
        self.movement_range = self.movement_range.max(movement_range);
        self
    }

    /// Give the unit jump jets and a leap strike
    pub fn with_leap(mut self, damage: f32, jump_range: f32) -> Self {
        let id = self.next_weapon_id();
        let def = Arc::new(WeaponDef::strike("leap", WeaponKind::LeapStrike));
        self.leap_weapon = Some(Weapon::new(id, def));
        self.leap_damage = damage;
        self.jump_capable = true;
        self.movement_range = self.movement_range.max(jump_range);
        self
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    pub fn is_unit(&self) -> bool {
        self.kind == CombatantKind::Unit
    }

    pub fn is_flying(&self) -> bool {
        self.flying_height > 0.0
    }

    /// Only units can take evasive action
    pub fn is_evasive(&self) -> bool {
        self.is_unit() && self.evasive
    }

    /// Shut down or knocked prone; special attacks only apply to these targets
    pub fn is_incapacitated(&self) -> bool {
        self.shutdown || self.prone
    }

    pub fn is_hostile_to(&self, other: &Combatant) -> bool {
        self.team != other.team
    }

    /// Current heat and the heat ceiling; units without heat never overheat
    pub fn heat_budget(&self) -> (f32, f32) {
        match &self.heat {
            Some(heat) => (heat.current, heat.acceptable),
            None => (0.0, f32::MAX),
        }
    }

    /// Look up any weapon the unit carries, including the synthetic strikes
    pub fn weapon(&self, id: WeaponId) -> Option<&Weapon> {
        self.all_weapons().find(|w| w.id == id)
    }

    pub fn weapon_mut(&mut self, id: WeaponId) -> Option<&mut Weapon> {
        self.weapons
            .iter_mut()
            .chain(self.melee_weapon.iter_mut())
            .chain(self.leap_weapon.iter_mut())
            .find(|w| w.id == id)
    }

    pub fn all_weapons(&self) -> impl Iterator<Item = &Weapon> {
        self.weapons
            .iter()
            .chain(self.melee_weapon.iter())
            .chain(self.leap_weapon.iter())
    }
}

/// A group of units that shares a designated target
#[derive(Debug, Clone)]
pub struct Formation {
    pub id: FormationId,
    pub team: TeamId,
    pub members: Vec<UnitId>,
    pub designated_target: Option<UnitId>,
    pub behavior: BehaviorScope,
}

impl Formation {
    pub fn new(team: TeamId) -> Self {
        Self {
            id: FormationId::new(),
            team,
            members: Vec::new(),
            designated_target: None,
            behavior: BehaviorScope::default(),
        }
    }

    pub fn with_behavior(mut self, behavior: BehaviorScope) -> Self {
        self.behavior = behavior;
        self
    }
}

/// Everything the engine may read while deciding
#[derive(Debug, Clone, Default)]
pub struct Battlefield {
    pub combatants: Vec<Combatant>,
    pub formations: Vec<Formation>,
    pub behavior: BehaviorRegistry,
}

impl Battlefield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, combatant: Combatant) -> UnitId {
        let id = combatant.id;
        self.combatants.push(combatant);
        id
    }

    /// Add a formation and point its members at it
    pub fn add_formation(&mut self, formation: Formation) -> FormationId {
        let id = formation.id;
        for member in &formation.members {
            if let Some(unit) = self.get_mut(*member) {
                unit.formation = Some(id);
            }
        }
        self.formations.push(formation);
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.name == name)
    }

    pub fn formation(&self, id: FormationId) -> Option<&Formation> {
        self.formations.iter().find(|f| f.id == id)
    }

    pub fn formation_of(&self, unit: &Combatant) -> Option<&Formation> {
        unit.formation.and_then(|id| self.formation(id))
    }

    /// Living hostile combatants, in battlefield order
    pub fn enemies_of(&self, unit: &Combatant) -> Vec<&Combatant> {
        self.combatants
            .iter()
            .filter(|c| c.id != unit.id && c.is_alive() && unit.is_hostile_to(c))
            .collect()
    }

    /// The formation's designated target if it is still alive
    pub fn designated_target_for(&self, unit: &Combatant) -> Option<&Combatant> {
        self.formation_of(unit)
            .and_then(|f| f.designated_target)
            .and_then(|id| self.get(id))
            .filter(|target| target.is_alive())
    }
}
