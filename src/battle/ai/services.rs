//! Collaborators the attack engine consults but does not own
//!
//! Damage prediction, maneuver planning, melee optimization, firepower
//! estimation and special orders are traits so a host can plug in its own
//! rules. The baseline implementations below are simple closed-form models
//! that let the engine run standalone.

use crate::battle::ai::evaluation::{CandidateCombination, WeaponAssignment};
use crate::battle::ai::orders::{AttackCategory, OrderSubtype};
use crate::battle::battlefield::Combatant;
use crate::combat::weapon_group::WeaponGroup;
use crate::combat::weapons::WeaponStats;
use crate::core::types::Position;

/// Inputs of a damage prediction for one weapon set
#[derive(Debug, Clone, Copy)]
pub struct DamageQuery<'a> {
    pub attacker: &'a Combatant,
    pub category: AttackCategory,
    pub weapons: &'a [WeaponAssignment],
    pub target: &'a Combatant,
    pub attacker_position: Position,
    pub target_position: Position,
    pub target_evasive: bool,
}

impl DamageQuery<'_> {
    pub fn distance(&self) -> f32 {
        self.attacker_position.distance(&self.target_position)
    }
}

/// Expected damage of a weapon set
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamagePrediction {
    pub expected_damage: f32,
    /// Only artillery-capable weapons take part in the attack
    pub is_artillery: bool,
}

pub trait DamagePredictor: Send + Sync {
    /// Single-weapon hit chance (0.0 to 1.0)
    fn hit_chance(
        &self,
        stats: &WeaponStats,
        attacker_position: Position,
        target: &Combatant,
        target_position: Position,
        target_evasive: bool,
    ) -> f32;

    fn expected_damage(&self, query: &DamageQuery<'_>) -> DamagePrediction;

    /// Lowest hit chance of any weapon in the set; 0 for an empty set
    fn lowest_hit_chance(&self, query: &DamageQuery<'_>) -> f32 {
        query
            .weapons
            .iter()
            .map(|w| {
                self.hit_chance(
                    &w.stats,
                    query.attacker_position,
                    query.target,
                    query.target_position,
                    query.target_evasive,
                )
            })
            .reduce(f32::min)
            .unwrap_or(0.0)
    }
}

pub trait ManeuverPlanner: Send + Sync {
    fn has_line_of_sight(&self, attacker: &Combatant, target: &Combatant) -> bool;

    /// Best position to melee `target` from, if any is reachable
    fn best_melee_destination(&self, attacker: &Combatant, target: &Combatant) -> Option<Position>;

    /// Best position to leap onto `target` from, if any is reachable
    fn best_leap_destination(&self, attacker: &Combatant, target: &Combatant) -> Option<Position>;

    fn is_leap_acceptable(&self, attacker: &Combatant, target: &Combatant) -> bool;
}

/// Physical attack states a melee can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeleeState {
    Kick,
    Charge,
}

/// Best physical attack found by a [`MeleeOptimizer`]
#[derive(Debug, Clone, PartialEq)]
pub struct MeleePlan {
    pub state: MeleeState,
    /// Indices of the support groups that may fire alongside the strike
    pub usable_groups: Vec<usize>,
    /// Damage the synthetic melee weapon carries
    pub virtual_damage: f32,
    /// Strike damage plus the best support-weapon damage
    pub total_state_damage: f32,
}

pub trait MeleeOptimizer: Send + Sync {
    /// Whether the attacker can engage the target in melee at all
    fn can_engage(&self, attacker: &Combatant, target: &Combatant) -> bool;

    fn optimize(
        &self,
        attacker: &Combatant,
        target: &Combatant,
        attack_position: Position,
        support: &[WeaponGroup<'_>],
    ) -> Option<MeleePlan>;

    /// Damage `target` would deal back if meleed by `attacker`
    fn retaliation_damage(&self, target: &Combatant, attacker: &Combatant) -> f32;
}

pub trait FirepowerEstimator: Send + Sync {
    /// Target firepower removed by an all-weapons attack from `attack_position`
    fn firepower_reduction(
        &self,
        attacker: &Combatant,
        attack_position: Position,
        target: &Combatant,
    ) -> f32;
}

pub trait SpecialOrderService: Send + Sync {
    fn offensive_push(
        &self,
        attacker: &Combatant,
        candidate: &CandidateCombination,
        target: &Combatant,
    ) -> Option<OrderSubtype>;

    fn called_shot(
        &self,
        attacker: &Combatant,
        candidate: &CandidateCombination,
        target: &Combatant,
    ) -> Option<OrderSubtype>;
}

/// The full set of collaborators used by one engine
pub struct Services {
    pub damage: Box<dyn DamagePredictor>,
    pub maneuver: Box<dyn ManeuverPlanner>,
    pub melee: Box<dyn MeleeOptimizer>,
    pub firepower: Box<dyn FirepowerEstimator>,
    pub special: Box<dyn SpecialOrderService>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            damage: Box::new(BaselineDamagePredictor::default()),
            maneuver: Box::new(BaselineManeuverPlanner::default()),
            melee: Box::new(BaselineMeleeOptimizer::default()),
            firepower: Box::new(BaselineFirepowerEstimator),
            special: Box::new(BaselineSpecialOrders::default()),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

// ============================================================================
// Baseline implementations
// ============================================================================

/// Accuracy falls off linearly with range; evasion and flight reduce it
#[derive(Debug, Clone)]
pub struct BaselineDamagePredictor {
    /// Accuracy lost at maximum range
    pub range_falloff: f32,
    pub evasive_penalty: f32,
    pub flying_penalty: f32,
    /// Structures do not move
    pub structure_bonus: f32,
    pub min_hit_chance: f32,
    pub max_hit_chance: f32,
}

impl Default for BaselineDamagePredictor {
    fn default() -> Self {
        Self {
            range_falloff: 0.25,
            evasive_penalty: 0.15,
            flying_penalty: 0.1,
            structure_bonus: 0.2,
            min_hit_chance: 0.05,
            max_hit_chance: 0.95,
        }
    }
}

impl DamagePredictor for BaselineDamagePredictor {
    fn hit_chance(
        &self,
        stats: &WeaponStats,
        attacker_position: Position,
        target: &Combatant,
        target_position: Position,
        target_evasive: bool,
    ) -> f32 {
        let distance = attacker_position.distance(&target_position);
        let mut chance = stats.accuracy;
        if stats.max_range.is_finite() && stats.max_range > 0.0 {
            chance -= self.range_falloff * (distance / stats.max_range).min(1.0);
        }
        if target_evasive {
            chance -= self.evasive_penalty;
        }
        if target.is_flying() {
            chance -= self.flying_penalty;
        }
        if !target.is_unit() {
            chance += self.structure_bonus;
        }
        chance.clamp(self.min_hit_chance, self.max_hit_chance)
    }

    fn expected_damage(&self, query: &DamageQuery<'_>) -> DamagePrediction {
        let is_artillery = query.weapons.iter().any(|w| w.stats.artillery);
        let distance = query.distance();

        let expected_damage = query
            .weapons
            .iter()
            .filter(|w| !is_artillery || w.stats.artillery)
            .filter(|w| w.kind.is_synthetic() || w.stats.in_range(distance))
            .map(|w| {
                let chance = self.hit_chance(
                    &w.stats,
                    query.attacker_position,
                    query.target,
                    query.target_position,
                    query.target_evasive,
                );
                w.stats.volley_damage() * chance
            })
            .sum();

        DamagePrediction {
            expected_damage,
            is_artillery,
        }
    }
}

/// Straight-line movement; melee ends adjacent to the target
#[derive(Debug, Clone)]
pub struct BaselineManeuverPlanner {
    /// Distance from the target a melee or leap ends at
    pub engagement_distance: f32,
}

impl Default for BaselineManeuverPlanner {
    fn default() -> Self {
        Self {
            engagement_distance: 20.0,
        }
    }
}

impl BaselineManeuverPlanner {
    fn adjacent_position(&self, attacker: &Combatant, target: &Combatant) -> Option<Position> {
        let distance = attacker.position.distance(&target.position);
        if distance > attacker.movement_range + self.engagement_distance {
            return None;
        }
        if distance <= self.engagement_distance {
            return Some(attacker.position);
        }
        let fraction = self.engagement_distance / distance;
        Some(target.position.lerp(&attacker.position, fraction))
    }
}

impl ManeuverPlanner for BaselineManeuverPlanner {
    fn has_line_of_sight(&self, _attacker: &Combatant, target: &Combatant) -> bool {
        !target.concealed
    }

    fn best_melee_destination(&self, attacker: &Combatant, target: &Combatant) -> Option<Position> {
        if attacker.melee_weapon.is_none() || target.is_flying() {
            return None;
        }
        self.adjacent_position(attacker, target)
    }

    fn best_leap_destination(&self, attacker: &Combatant, target: &Combatant) -> Option<Position> {
        if attacker.leap_weapon.is_none() || !attacker.jump_capable {
            return None;
        }
        self.adjacent_position(attacker, target)
    }

    fn is_leap_acceptable(&self, attacker: &Combatant, target: &Combatant) -> bool {
        attacker.jump_capable && attacker.leap_weapon.is_some() && !target.is_flying()
    }
}

/// Chooses between a kick (support weapons may fire) and a charge
/// (harder hit, no support fire)
#[derive(Debug, Clone)]
pub struct BaselineMeleeOptimizer {
    pub charge_multiplier: f32,
}

impl Default for BaselineMeleeOptimizer {
    fn default() -> Self {
        Self {
            charge_multiplier: 1.5,
        }
    }
}

impl MeleeOptimizer for BaselineMeleeOptimizer {
    fn can_engage(&self, attacker: &Combatant, target: &Combatant) -> bool {
        attacker.melee_weapon.is_some()
            && attacker.melee_damage > 0.0
            && !attacker.is_incapacitated()
            && !target.is_flying()
    }

    fn optimize(
        &self,
        attacker: &Combatant,
        _target: &Combatant,
        _attack_position: Position,
        support: &[WeaponGroup<'_>],
    ) -> Option<MeleePlan> {
        // Support weapons count at their best mode that has no minimum range
        let mut support_damage = 0.0;
        let mut usable_groups = Vec::new();
        for (index, group) in support.iter().enumerate() {
            let best = group
                .ammo_modes
                .iter()
                .filter_map(|pair| group.def().stats_for(pair))
                .filter(|stats| stats.min_range <= 0.0)
                .map(|stats| stats.volley_damage())
                .fold(None, |acc: Option<f32>, dmg| Some(acc.map_or(dmg, |a| a.max(dmg))));
            if let Some(damage) = best {
                usable_groups.push(index);
                support_damage += damage * group.count() as f32;
            }
        }

        let kick = MeleePlan {
            state: MeleeState::Kick,
            usable_groups,
            virtual_damage: attacker.melee_damage,
            total_state_damage: attacker.melee_damage + support_damage,
        };
        let charge_damage = attacker.melee_damage * self.charge_multiplier;
        let charge = MeleePlan {
            state: MeleeState::Charge,
            usable_groups: Vec::new(),
            virtual_damage: charge_damage,
            total_state_damage: charge_damage,
        };

        let best = if charge.total_state_damage > kick.total_state_damage {
            charge
        } else {
            kick
        };
        tracing::debug!(
            "Best melee state for {}: {:?} virtual: {} total: {}",
            attacker.name,
            best.state,
            best.virtual_damage,
            best.total_state_damage
        );
        (best.total_state_damage > 0.0).then_some(best)
    }

    fn retaliation_damage(&self, target: &Combatant, _attacker: &Combatant) -> f32 {
        if !target.is_unit() || target.is_incapacitated() {
            return 0.0;
        }
        let weapon_damage: f32 = target
            .weapons
            .iter()
            .filter(|w| w.functional && w.def.can_fire_in_melee)
            .filter_map(|w| w.stats())
            .map(|s| s.volley_damage())
            .sum();
        target.melee_damage + weapon_damage
    }
}

/// Fraction of the target's firepower an all-weapons volley could remove
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineFirepowerEstimator;

impl FirepowerEstimator for BaselineFirepowerEstimator {
    fn firepower_reduction(
        &self,
        attacker: &Combatant,
        attack_position: Position,
        target: &Combatant,
    ) -> f32 {
        let target_firepower: f32 = target
            .weapons
            .iter()
            .filter(|w| w.functional)
            .filter_map(|w| w.stats())
            .map(|s| s.volley_damage())
            .sum();
        if target_firepower <= 0.0 || target.durability <= 0.0 {
            return 0.0;
        }

        let distance = attack_position.distance(&target.position);
        let attack_damage: f32 = attacker
            .weapons
            .iter()
            .filter(|w| w.functional)
            .filter_map(|w| w.stats())
            .filter(|s| s.in_range(distance))
            .map(|s| s.volley_damage())
            .sum();

        target_firepower * (attack_damage / target.durability).min(1.0)
    }
}

/// Special orders cost resolve and need an incapacitated target
#[derive(Debug, Clone)]
pub struct BaselineSpecialOrders {
    pub offensive_push_cost: f32,
    pub called_shot_cost: f32,
}

impl Default for BaselineSpecialOrders {
    fn default() -> Self {
        Self {
            offensive_push_cost: 40.0,
            called_shot_cost: 20.0,
        }
    }
}

impl SpecialOrderService for BaselineSpecialOrders {
    fn offensive_push(
        &self,
        attacker: &Combatant,
        candidate: &CandidateCombination,
        target: &Combatant,
    ) -> Option<OrderSubtype> {
        let ready = target.is_incapacitated()
            && attacker.resolve >= self.offensive_push_cost
            && candidate.expected_damage > 0.0;
        ready.then_some(OrderSubtype::OffensivePush)
    }

    fn called_shot(
        &self,
        attacker: &Combatant,
        candidate: &CandidateCombination,
        target: &Combatant,
    ) -> Option<OrderSubtype> {
        if !target.is_incapacitated()
            || attacker.resolve < self.called_shot_cost
            || candidate.expected_damage <= 0.0
        {
            return None;
        }
        target
            .weakest_location
            .clone()
            .map(|location| OrderSubtype::CalledShot { location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::weapons::WeaponDef;
    use crate::core::types::TeamId;
    use std::sync::Arc;

    fn laser_stats() -> WeaponStats {
        WeaponDef::laser("ML")
            .stats_for(&crate::combat::weapons::AmmoModePair::none())
            .unwrap()
    }

    #[test]
    fn test_hit_chance_falls_with_range_and_evasion() {
        let predictor = BaselineDamagePredictor::default();
        let target = Combatant::unit("t", TeamId(1), Position::default());
        let stats = laser_stats();

        let close = predictor.hit_chance(&stats, Position::new(10.0, 0.0), &target, target.position, false);
        let far = predictor.hit_chance(&stats, Position::new(260.0, 0.0), &target, target.position, false);
        let evasive = predictor.hit_chance(&stats, Position::new(10.0, 0.0), &target, target.position, true);
        assert!(close > far);
        assert!(close > evasive);
        assert!((0.05..=0.95).contains(&far));
    }

    #[test]
    fn test_melee_destination_needs_reach() {
        let planner = BaselineManeuverPlanner::default();
        let attacker = Combatant::unit("a", TeamId(0), Position::default()).with_melee(30.0, 100.0);
        let near = Combatant::unit("n", TeamId(1), Position::new(100.0, 0.0));
        let far = Combatant::unit("f", TeamId(1), Position::new(500.0, 0.0));

        let dest = planner.best_melee_destination(&attacker, &near).unwrap();
        assert!((dest.distance(&near.position) - 20.0).abs() < 1e-3);
        assert!(planner.best_melee_destination(&attacker, &far).is_none());
    }

    #[test]
    fn test_melee_optimizer_prefers_charge_without_support() {
        let optimizer = BaselineMeleeOptimizer::default();
        let attacker = Combatant::unit("a", TeamId(0), Position::default()).with_melee(30.0, 100.0);
        let target = Combatant::unit("t", TeamId(1), Position::new(20.0, 0.0));
        let plan = optimizer
            .optimize(&attacker, &target, Position::default(), &[])
            .unwrap();
        assert_eq!(plan.state, MeleeState::Charge);
        assert_eq!(plan.virtual_damage, 45.0);
    }

    #[test]
    fn test_kick_keeps_support_weapons() {
        let optimizer = BaselineMeleeOptimizer::default();
        let attacker = Combatant::unit("a", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_melee(30.0, 100.0);
        let target = Combatant::unit("t", TeamId(1), Position::new(20.0, 0.0));
        let groups = crate::combat::weapon_group::condense(attacker.weapons.iter());

        let plan = optimizer
            .optimize(&attacker, &target, Position::default(), &groups)
            .unwrap();
        assert_eq!(plan.state, MeleeState::Kick);
        assert_eq!(plan.usable_groups, vec![0]);
        assert_eq!(plan.total_state_damage, 80.0);
    }

    #[test]
    fn test_special_orders_need_incapacitated_target() {
        let service = BaselineSpecialOrders::default();
        let mut attacker = Combatant::unit("a", TeamId(0), Position::default());
        attacker.resolve = 25.0;
        let mut target = Combatant::unit("t", TeamId(1), Position::default());
        target.weakest_location = Some("left_leg".into());
        let candidate = CandidateCombination::empty(AttackCategory::Ranged).with_damage(10.0);

        assert!(service.called_shot(&attacker, &candidate, &target).is_none());
        target.prone = true;
        assert_eq!(
            service.called_shot(&attacker, &candidate, &target),
            Some(OrderSubtype::CalledShot {
                location: "left_leg".into()
            })
        );
        // Not enough resolve for a push
        assert!(service.offensive_push(&attacker, &candidate, &target).is_none());
    }
}
