//! Weapon groups: identical weapon instances fired as a single unit
//!
//! Grouping by definition keeps the combination space proportional to the
//! number of distinct weapons rather than the number of mounted ones.

use std::fmt;

use crate::battle::battlefield::Combatant;
use crate::combat::weapons::{AmmoModePair, Weapon, WeaponDef};

/// One or more weapons sharing a definition, with the ammo-modes still
/// considered valid for them
#[derive(Debug, Clone)]
pub struct WeaponGroup<'a> {
    members: Vec<&'a Weapon>,
    pub ammo_modes: Vec<AmmoModePair>,
    /// Per-shot damage replacing the definition's (virtual strike damage)
    pub damage_override: Option<f32>,
}

impl<'a> WeaponGroup<'a> {
    /// Start a group from its first weapon; ammo-modes are the usable ones
    pub fn new(first: &'a Weapon) -> Self {
        Self {
            members: vec![first],
            ammo_modes: first.usable_ammo_modes(),
            damage_override: None,
        }
    }

    /// Group for a synthetic strike weapon carrying `damage` as its volley
    pub fn strike(weapon: &'a Weapon, ammo_modes: Vec<AmmoModePair>, damage: f32) -> Self {
        Self {
            members: vec![weapon],
            ammo_modes,
            damage_override: Some(damage),
        }
    }

    pub fn add(&mut self, weapon: &'a Weapon) {
        self.members.push(weapon);
    }

    pub fn first(&self) -> &'a Weapon {
        self.members[0]
    }

    pub fn def(&self) -> &'a WeaponDef {
        &self.first().def
    }

    pub fn members(&self) -> &[&'a Weapon] {
        &self.members
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }
}

impl fmt::Display for WeaponGroup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.count(), self.def().id)
    }
}

/// Group weapons by definition id, preserving first-seen order
pub fn condense<'a>(weapons: impl IntoIterator<Item = &'a Weapon>) -> Vec<WeaponGroup<'a>> {
    let mut groups: Vec<WeaponGroup<'a>> = Vec::new();
    for weapon in weapons {
        match groups.iter_mut().find(|g| g.def().id == weapon.def.id) {
            Some(group) => group.add(weapon),
            None => groups.push(WeaponGroup::new(weapon)),
        }
    }
    groups
}

/// An attacker's weapons split by the attack categories they can join
#[derive(Debug, Clone)]
pub struct CandidateWeapons<'a> {
    /// Functional real weapons
    pub ranged: Vec<WeaponGroup<'a>>,
    /// Functional real weapons that may also fire during a melee or leap
    pub melee_support: Vec<WeaponGroup<'a>>,
}

impl<'a> CandidateWeapons<'a> {
    pub fn for_attacker(attacker: &'a Combatant) -> Self {
        let usable = || {
            attacker
                .weapons
                .iter()
                .filter(|w| w.functional && !w.def.is_synthetic())
        };
        Self {
            ranged: condense(usable()),
            melee_support: condense(usable().filter(|w| w.def.can_fire_in_melee)),
        }
    }
}
