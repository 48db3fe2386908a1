//! Attack orders emitted by the engine and the commit step that applies
//! them to live weapon state

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::battle::battlefield::Battlefield;
use crate::combat::weapons::AmmoModePair;
use crate::core::types::{Position, UnitId, WeaponId};

/// Category of attack a weapon set is evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackCategory {
    Ranged,
    Melee,
    Leap,
}

impl AttackCategory {
    pub fn all() -> [AttackCategory; 3] {
        [Self::Ranged, Self::Melee, Self::Leap]
    }

    /// Melee and leap attacks require moving to a maneuver destination
    pub fn is_maneuver(&self) -> bool {
        !matches!(self, AttackCategory::Ranged)
    }
}

impl fmt::Display for AttackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttackCategory::Ranged => "ranged attack",
            AttackCategory::Melee => "melee attack",
            AttackCategory::Leap => "leap attack",
        };
        write!(f, "{}", label)
    }
}

/// Special handling of an order beyond plain weapon fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum OrderSubtype {
    WeaponFire,
    CalledShot { location: String },
    OffensivePush,
}

/// A weapon to fire and the ammo-mode to fire it in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedWeapon {
    pub weapon: WeaponId,
    pub name: String,
    pub ammo_mode: AmmoModePair,
}

/// The winning attack against one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOrder {
    pub attacker: UnitId,
    pub target: UnitId,
    pub target_name: String,
    pub category: AttackCategory,
    pub weapons: Vec<SelectedWeapon>,
    /// Maneuver destination for melee and leap attacks
    pub attack_from: Option<Position>,
    pub subtype: OrderSubtype,
    pub expected_damage: f32,
    pub heat: f32,
    pub lowest_hit_chance: f32,
    pub rationale: String,
}

impl AttackOrder {
    /// Weapons and modes formatted for logs: `('ML', 'AC5':AC_RAPID/AC_BALL, )`
    pub fn weapon_list_string(&self) -> String {
        let mut out = String::from("(");
        for selected in &self.weapons {
            out.push('\'');
            out.push_str(&selected.name);
            out.push('\'');
            if selected.ammo_mode.to_string() != "-" {
                out.push(':');
                out.push_str(&selected.ammo_mode.to_string());
            }
            out.push_str(", ");
        }
        out.push(')');
        out
    }
}

/// Why no attack was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoAttackReason {
    UnknownAttacker,
    AttackerDestroyed,
    NoEnemies,
    NoViableAttack,
}

impl fmt::Display for NoAttackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NoAttackReason::UnknownAttacker => "attacker not on the battlefield",
            NoAttackReason::AttackerDestroyed => "attacker is destroyed",
            NoAttackReason::NoEnemies => "no enemies to attack",
            NoAttackReason::NoViableAttack => "no attack with expected damage",
        };
        write!(f, "{}", text)
    }
}

/// Result of one attack decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum AttackDecision {
    Attack(AttackOrder),
    NoAttack { reason: NoAttackReason },
}

impl AttackDecision {
    pub fn no_attack(reason: NoAttackReason) -> Self {
        AttackDecision::NoAttack { reason }
    }

    pub fn order(&self) -> Option<&AttackOrder> {
        match self {
            AttackDecision::Attack(order) => Some(order),
            AttackDecision::NoAttack { .. } => None,
        }
    }

    pub fn is_attack(&self) -> bool {
        self.order().is_some()
    }
}

/// Apply the order's ammo-modes to the attacker's live weapons
///
/// Returns the number of weapons switched.
pub fn commit_attack_order(battlefield: &mut Battlefield, order: &AttackOrder) -> usize {
    let Some(attacker) = battlefield.get_mut(order.attacker) else {
        tracing::warn!("Cannot commit order, attacker {:?} is gone", order.attacker);
        return 0;
    };

    let mut applied = 0;
    for selected in &order.weapons {
        let Some(weapon) = attacker.weapon_mut(selected.weapon) else {
            tracing::warn!("Cannot commit ammo-mode, weapon {:?} not found", selected.weapon);
            continue;
        };
        if weapon.apply_ammo_mode(&selected.ammo_mode) {
            applied += 1;
            if selected.ammo_mode.ammo_id.is_empty() {
                tracing::debug!(
                    "--  Applying selected firing mode {} to weapon {}",
                    selected.ammo_mode.mode_id,
                    selected.name
                );
            } else {
                tracing::debug!(
                    "--  Applying selected ammo-mode {} to weapon {}",
                    selected.ammo_mode,
                    selected.name
                );
            }
        } else {
            tracing::warn!(
                "Weapon {} does not support ammo-mode {}",
                selected.name,
                selected.ammo_mode
            );
        }
    }
    applied
}
