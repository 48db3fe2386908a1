//! Weapon sets for melee and leap attacks
//!
//! Both categories reuse the support weapons that can fire in melee and add
//! the synthetic strike weapon to every set. The strike weapon's damage is
//! virtual: it carries the physical attack's value into the score.

use crate::battle::ai::generator::{enumerate, WeaponSetList};
use crate::battle::ai::services::{ManeuverPlanner, MeleeOptimizer};
use crate::battle::battlefield::Combatant;
use crate::combat::weapon_group::WeaponGroup;
use crate::core::types::Position;

/// A unit favors melee when its raw melee damage is at least `multiplier`
/// times its raw ranged damage (each ranged weapon at its best mode)
///
/// Raw melee damage counts only mounted weapons that can fire in melee; the
/// physical strike is not one of them.
pub fn favors_melee(attacker: &Combatant, multiplier: f32) -> bool {
    let mut raw_melee = 0.0;
    let mut raw_ranged = 0.0;
    for weapon in attacker.weapons.iter().filter(|w| !w.def.is_synthetic()) {
        if weapon.def.can_fire_in_melee {
            raw_melee += weapon.stats().map(|s| s.volley_damage()).unwrap_or(0.0);
        } else {
            raw_ranged += weapon
                .def
                .available_ammo_modes()
                .iter()
                .filter_map(|pair| weapon.def.stats_for(pair))
                .map(|s| s.volley_damage())
                .fold(0.0, f32::max);
        }
    }

    let favors = raw_melee >= multiplier * raw_ranged;
    if favors {
        tracing::debug!(
            " Unit favors melee due to rawMelee: {} >= rawRanged: {} x {}",
            raw_melee,
            raw_ranged,
            multiplier
        );
    }
    favors
}

/// Whether the expected melee damage is worth the target's retaliation
///
/// The ratio of damage dealt to damage taken must exceed `ratio_cap`. A
/// target that cannot strike back is always safe.
pub fn damage_outweighs_risk(
    attacker_damage: f32,
    attacker: &Combatant,
    target: &Combatant,
    optimizer: &dyn MeleeOptimizer,
    ratio_cap: f32,
) -> bool {
    if attacker_damage <= 0.0 {
        tracing::debug!("Attacker has no expected damage, melee is too risky.");
        return false;
    }

    let retaliation = optimizer.retaliation_damage(target, attacker);
    if retaliation <= 0.0 {
        tracing::debug!("Target has no expected damage, melee is safe.");
        return true;
    }

    let ratio = attacker_damage / retaliation;
    tracing::debug!(
        " meleeDamageRatio: {} = attacker: {} / target: {} vs. cap: {}",
        ratio,
        attacker_damage,
        retaliation,
        ratio_cap
    );
    ratio > ratio_cap
}

/// Inputs shared by melee and leap set construction
pub struct ManeuverSets<'s> {
    pub optimizer: &'s dyn MeleeOptimizer,
    pub planner: &'s dyn ManeuverPlanner,
    pub melee_favor_multiplier: f32,
    pub melee_damage_ratio_cap: f32,
}

impl ManeuverSets<'_> {
    /// Melee sets: support weapons chosen by the optimizer plus the strike
    pub fn melee_sets<'a>(
        &self,
        attacker: &'a Combatant,
        target: &Combatant,
        attack_position: Position,
        support: &[WeaponGroup<'a>],
    ) -> WeaponSetList<'a> {
        tracing::info!(
            "== Creating melee weaponSets for attacker: {} versus target: {}",
            attacker.name,
            target.name
        );

        let Some(strike) = attacker.melee_weapon.as_ref() else {
            return WeaponSetList::default();
        };
        if !self.optimizer.can_engage(attacker, target) {
            tracing::info!(" - Attacker cannot engage {} in melee", target.name);
            return WeaponSetList::default();
        }
        let Some(plan) = self.optimizer.optimize(attacker, target, attack_position, support) else {
            tracing::debug!(" - No melee state with damage against {}", target.name);
            return WeaponSetList::default();
        };

        let favors = favors_melee(attacker, self.melee_favor_multiplier);
        let outweighs = damage_outweighs_risk(
            plan.total_state_damage,
            attacker,
            target,
            self.optimizer,
            self.melee_damage_ratio_cap,
        );
        if !favors && !outweighs {
            tracing::debug!(" potential melee retaliation too high, skipping melee.");
            return WeaponSetList::default();
        }

        let usable: Vec<WeaponGroup<'a>> = plan
            .usable_groups
            .iter()
            .filter_map(|&index| support.get(index).cloned())
            .collect();
        tracing::debug!("There are {} usable condensed weapons.", usable.len());

        let mut sets = enumerate(usable);
        let modes = strike.def.available_ammo_modes();
        sets.append_to_every_set(WeaponGroup::strike(strike, modes, plan.virtual_damage));
        sets
    }

    /// Leap sets: every support combination plus the leap strike in its
    /// current mode
    pub fn leap_sets<'a>(
        &self,
        attacker: &'a Combatant,
        target: &Combatant,
        support: &[WeaponGroup<'a>],
    ) -> WeaponSetList<'a> {
        let Some(strike) = attacker.leap_weapon.as_ref() else {
            return WeaponSetList::default();
        };
        if !self.planner.is_leap_acceptable(attacker, target) {
            tracing::debug!(" - Attacker cannot leap, or leap is not acceptable.");
            return WeaponSetList::default();
        }

        let mut sets = enumerate(support.to_vec());
        let current = vec![strike.current_ammo_mode().clone()];
        sets.append_to_every_set(WeaponGroup::strike(strike, current, attacker.leap_damage));
        sets
    }
}
