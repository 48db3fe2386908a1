//! Attack synthesis for combat AI
//!
//! Architecture: Trait + Data hybrid
//! - AttackPlanner trait defines the interface hosts call each turn
//! - BehaviorRegistry holds TOML-loaded tunables per unit, formation and role
//! - Services are the swappable rules the engine consults (damage, maneuvers)
//! - DecisionContext carries the per-decision state and behavior cache

pub mod backoff;
pub mod behavior;
pub mod decision_context;
pub mod evaluation;
pub mod generator;
pub mod melee;
pub mod orders;
pub mod selection;
pub mod services;
pub mod targeting;

pub use backoff::OverheatBackoffSearch;
pub use behavior::{BehaviorRegistry, BehaviorScope, BehaviorValue, BehaviorVariableName, Mood, UnitRole};
pub use decision_context::DecisionContext;
pub use evaluation::{rank_order, AttackEvaluationEngine, CandidateCombination, Engagement, WeaponAssignment};
pub use generator::{enumerate, AmmoModeSetGenerator, WeaponGroupSelection, WeaponSetList};
pub use melee::ManeuverSets;
pub use orders::{
    commit_attack_order, AttackCategory, AttackDecision, AttackOrder, NoAttackReason, OrderSubtype,
    SelectedWeapon,
};
pub use selection::{AttackSelectionPolicy, Rejection, Selection, SelectionGates};
pub use services::{
    BaselineDamagePredictor, BaselineFirepowerEstimator, BaselineManeuverPlanner, BaselineMeleeOptimizer,
    BaselineSpecialOrders, DamagePrediction, DamagePredictor, DamageQuery, FirepowerEstimator,
    ManeuverPlanner, MeleeOptimizer, MeleePlan, MeleeState, Services, SpecialOrderService,
};
pub use targeting::{FireControl, TargetAssessment};

use crate::battle::battlefield::Battlefield;
use crate::core::types::UnitId;

/// Trait for attack planners
pub trait AttackPlanner {
    /// Choose the attack `attacker` makes this turn, if any
    fn plan_attack(
        &self,
        battlefield: &Battlefield,
        attacker: UnitId,
        is_stationary: bool,
        seed: u64,
    ) -> AttackDecision;
}
