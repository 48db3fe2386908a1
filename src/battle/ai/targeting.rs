//! Fire control: choose the target and the attack for one unit's turn
//!
//! The designated target of the unit's formation gets a head start; any
//! other enemy must beat it on expected damage and must not do worse on
//! firepower removed.

use crate::battle::ai::backoff::OverheatBackoffSearch;
use crate::battle::ai::behavior::BehaviorVariableName;
use crate::battle::ai::decision_context::DecisionContext;
use crate::battle::ai::evaluation::{AttackEvaluationEngine, CategorySets, Engagement};
use crate::battle::ai::generator::AmmoModeSetGenerator;
use crate::battle::ai::melee::ManeuverSets;
use crate::battle::ai::orders::{
    commit_attack_order, AttackCategory, AttackDecision, AttackOrder, NoAttackReason,
};
use crate::battle::ai::selection::{AttackSelectionPolicy, Selection, SelectionGates};
use crate::battle::ai::services::Services;
use crate::battle::ai::AttackPlanner;
use crate::battle::battlefield::{Battlefield, Combatant};
use crate::combat::weapon_group::CandidateWeapons;
use crate::core::config::EngineConfig;
use crate::core::types::{Position, UnitId};

/// Best attack found against a single target
#[derive(Debug, Clone, Default)]
pub struct TargetAssessment {
    pub order: Option<AttackOrder>,
    pub expected_damage: f32,
}

impl TargetAssessment {
    fn from_order(order: Option<AttackOrder>) -> Self {
        let expected_damage = order.as_ref().map_or(0.0, |o| o.expected_damage);
        Self {
            order,
            expected_damage,
        }
    }
}

/// The attack synthesis engine
pub struct FireControl {
    config: EngineConfig,
    services: Services,
}

impl FireControl {
    /// Engine with the baseline services
    pub fn new(config: EngineConfig) -> Self {
        Self::with_services(config, Services::default())
    }

    pub fn with_services(config: EngineConfig, services: Services) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Decide an attack for `attacker` this turn
    ///
    /// `is_stationary` tells whether the host is evaluating a branch where
    /// the attacker stays put; melee and leap attacks need it. `seed` drives
    /// every random choice so a decision can be replayed.
    pub fn decide(
        &self,
        battlefield: &Battlefield,
        attacker: UnitId,
        is_stationary: bool,
        seed: u64,
    ) -> AttackDecision {
        let Some(unit) = battlefield.get(attacker) else {
            tracing::warn!("Attacker {:?} is not on the battlefield", attacker);
            return AttackDecision::no_attack(NoAttackReason::UnknownAttacker);
        };
        if !unit.is_alive() {
            tracing::debug!("{} is destroyed, no attack", unit.name);
            return AttackDecision::no_attack(NoAttackReason::AttackerDestroyed);
        }

        let context = DecisionContext::new(
            battlefield,
            &self.config,
            &self.services,
            unit,
            is_stationary,
            seed,
        );
        let enemies = context.enemies();
        if enemies.is_empty() {
            tracing::debug!("{} has no enemies to attack", unit.name);
            return AttackDecision::no_attack(NoAttackReason::NoEnemies);
        }

        let mut best_order: Option<AttackOrder> = None;
        let mut best_damage = 0.0;
        let mut best_firepower = 0.0;

        let designated = battlefield
            .designated_target_for(unit)
            .filter(|t| !t.spawn_protected && t.is_hostile_to(unit));
        if let Some(target) = designated {
            let assessment = self.assess_target(&context, target);
            let damage_bonus = context.behavior_float(
                BehaviorVariableName::OpportunityFireExceedsDesignatedTargetByPercentage,
            );
            let takeaway_bonus = context.behavior_float(
                BehaviorVariableName::OpportunityFireExceedsDesignatedTargetFirepowerTakeawayByPercentage,
            );
            best_damage = assessment.expected_damage * (1.0 + damage_bonus / 100.0);
            best_firepower = self.firepower_reduction(unit, target) * (1.0 + takeaway_bonus / 100.0);
            tracing::info!(
                "{} designated target {}: damage to beat {} firepower to match {}",
                unit.name,
                target.name,
                best_damage,
                best_firepower
            );
            best_order = assessment.order;
        }

        for target in enemies {
            if designated.is_some_and(|d| d.id == target.id) || target.spawn_protected {
                continue;
            }
            let assessment = self.assess_target(&context, target);
            let Some(order) = assessment.order else {
                continue;
            };
            let firepower = self.firepower_reduction(unit, target);
            tracing::debug!(
                "Opportunity target {}: damage {} vs {} firepower {} vs {}",
                target.name,
                assessment.expected_damage,
                best_damage,
                firepower,
                best_firepower
            );
            if assessment.expected_damage > best_damage && firepower >= best_firepower {
                best_damage = assessment.expected_damage;
                best_firepower = firepower;
                best_order = Some(order);
            }
        }

        match best_order {
            Some(order) if best_damage > 0.0 => {
                tracing::info!("{} attacks {}: {}", unit.name, order.target_name, order.rationale);
                AttackDecision::Attack(order)
            }
            _ => {
                tracing::info!("{} found no viable attack", unit.name);
                AttackDecision::no_attack(NoAttackReason::NoViableAttack)
            }
        }
    }

    /// Decide, then switch the attacker's weapons to the chosen ammo-modes
    pub fn decide_and_commit(
        &self,
        battlefield: &mut Battlefield,
        attacker: UnitId,
        is_stationary: bool,
        seed: u64,
    ) -> AttackDecision {
        let decision = self.decide(battlefield, attacker, is_stationary, seed);
        if let Some(order) = decision.order() {
            let applied = commit_attack_order(battlefield, order);
            tracing::debug!("Committed {} ammo-modes for {}", applied, order.target_name);
        }
        decision
    }

    /// Best attack against one target
    pub fn assess_target(&self, context: &DecisionContext<'_>, target: &Combatant) -> TargetAssessment {
        let attacker = context.attacker;
        let maneuver = self.services.maneuver.as_ref();
        if !maneuver.has_line_of_sight(attacker, target) {
            tracing::debug!("{} has no line of sight to {}", attacker.name, target.name);
            return TargetAssessment::default();
        }

        let predictor = self.services.damage.as_ref();
        let CandidateWeapons {
            ranged,
            melee_support,
        } = CandidateWeapons::for_attacker(attacker);

        let melee_destination = maneuver.best_melee_destination(attacker, target);
        let leap_destination = maneuver.best_leap_destination(attacker, target);
        let melee_position = melee_destination.unwrap_or(attacker.position);

        let generator = AmmoModeSetGenerator::new(&self.config, predictor);
        let maneuver_sets = ManeuverSets {
            optimizer: self.services.melee.as_ref(),
            planner: maneuver,
            melee_favor_multiplier: self.config.weights.melee_favor_damage_multiplier,
            melee_damage_ratio_cap: context.behavior_float(BehaviorVariableName::MeleeDamageRatioCap),
        };

        // Every category is scored from where the attacker stands; the
        // maneuver destination only feeds the melee optimizer and the order
        let engagement = Engagement::in_place(attacker, target);

        let categories = [
            CategorySets {
                category: AttackCategory::Ranged,
                engagement,
                sets: generator.ranged_sets(ranged, attacker.position, target),
            },
            CategorySets {
                category: AttackCategory::Melee,
                engagement,
                sets: maneuver_sets.melee_sets(attacker, target, melee_position, &melee_support),
            },
            CategorySets {
                category: AttackCategory::Leap,
                engagement,
                sets: maneuver_sets.leap_sets(attacker, target, &melee_support),
            },
        ];

        let engine = AttackEvaluationEngine::new(&self.config, predictor);
        let ranked = engine.evaluate_all(&categories);

        let policy = AttackSelectionPolicy {
            gates: self.selection_gates(context, target, melee_destination, leap_destination),
            attacker,
            target,
            special: self.services.special.as_ref(),
        };

        let overheated = match policy.select(ranked) {
            Selection::Chosen(order) => return TargetAssessment::from_order(Some(order)),
            Selection::Exhausted { overheated } => overheated,
        };

        if !self.config.attempt_reducing_overheat_solutions || overheated.is_empty() {
            tracing::debug!("No valid attack against {}", target.name);
            return TargetAssessment::default();
        }

        let mut backoff = OverheatBackoffSearch::for_target(
            self.config.backoff_attempt_limit,
            context.seed,
            context.target_ordinal(target),
        );
        let order = backoff.run(
            overheated,
            |category, assignments| engine.evaluate_assignments(category, &engagement, assignments),
            |candidate| policy.accept(candidate),
        );
        TargetAssessment::from_order(order)
    }

    fn selection_gates(
        &self,
        context: &DecisionContext<'_>,
        target: &Combatant,
        melee_destination: Option<Position>,
        leap_destination: Option<Position>,
    ) -> SelectionGates {
        let attacker = context.attacker;
        let (current_heat, mut acceptable_heat) = attacker.heat_budget();
        let heat_multiplier = context.behavior_float(BehaviorVariableName::AcceptableHeatLevel);
        if heat_multiplier > 1.0 {
            acceptable_heat *= heat_multiplier;
        }

        SelectionGates {
            current_heat,
            acceptable_heat,
            is_stationary: context.is_stationary,
            target_is_unit: target.is_unit(),
            attacker_has_moved: attacker.has_moved_this_round,
            melee_destination,
            leap_destination,
            target_max_damage_level: target.max_damage_level,
            existing_target_damage_for_leap: context
                .behavior_float(BehaviorVariableName::ExistingTargetDamageForLeapAttack),
            attacker_leg_damage: attacker.leg_damage_level,
            max_leg_damage_for_leap: context.behavior_float(BehaviorVariableName::OwnMaxLegDamageForLeapAttack),
        }
    }

    fn firepower_reduction(&self, attacker: &Combatant, target: &Combatant) -> f32 {
        self.services
            .firepower
            .firepower_reduction(attacker, attacker.position, target)
    }
}

impl AttackPlanner for FireControl {
    fn plan_attack(
        &self,
        battlefield: &Battlefield,
        attacker: UnitId,
        is_stationary: bool,
        seed: u64,
    ) -> AttackDecision {
        self.decide(battlefield, attacker, is_stationary, seed)
    }
}
