//! Scoring of weapon sets: heat, expected damage, lowest hit chance
//!
//! Stats come from [`WeaponDef::stats_for`](crate::combat::weapons::WeaponDef::stats_for),
//! so independent sets are scored in parallel once a category has enough
//! of them to pay for the threads.

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::battle::ai::generator::{WeaponGroupSelection, WeaponSetList};
use crate::battle::ai::orders::AttackCategory;
use crate::battle::ai::services::{DamagePredictor, DamageQuery};
use crate::battle::battlefield::Combatant;
use crate::combat::weapon_group::WeaponGroup;
use crate::combat::weapons::{AmmoModePair, WeaponKind, WeaponStats};
use crate::core::config::EngineConfig;
use crate::core::types::{Position, WeaponId};

/// One weapon instance fired in one ammo-mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponAssignment {
    pub weapon: WeaponId,
    pub name: String,
    pub kind: WeaponKind,
    pub ammo_mode: AmmoModePair,
    pub stats: WeaponStats,
}

/// A fully scored attack option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCombination {
    pub category: AttackCategory,
    pub assignments: Vec<WeaponAssignment>,
    pub heat: f32,
    pub expected_damage: f32,
    pub lowest_hit_chance: f32,
}

impl CandidateCombination {
    pub fn empty(category: AttackCategory) -> Self {
        Self {
            category,
            assignments: Vec::new(),
            heat: 0.0,
            expected_damage: 0.0,
            lowest_hit_chance: 0.0,
        }
    }

    pub fn with_damage(mut self, expected_damage: f32) -> Self {
        self.expected_damage = expected_damage;
        self
    }

    pub fn weapon_count(&self) -> usize {
        self.assignments.len()
    }

    /// Identity used to drop evaluations with the same outcome
    fn value_key(&self) -> ValueKey {
        (
            self.category,
            OrderedFloat(self.heat),
            OrderedFloat(self.expected_damage),
            OrderedFloat(self.lowest_hit_chance),
        )
    }
}

type ValueKey = (AttackCategory, OrderedFloat<f32>, OrderedFloat<f32>, OrderedFloat<f32>);

impl fmt::Display for CandidateCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weapons: Vec<String> = self
            .assignments
            .iter()
            .map(|a| format!("{}[{}]", a.name, a.ammo_mode))
            .collect();
        write!(
            f,
            "Weapons: {} AttackType: {} Heat: {} ExpectedDamage: {} lowestHitChance: {}",
            weapons.join(", "),
            self.category,
            self.heat,
            self.expected_damage,
            self.lowest_hit_chance
        )
    }
}

/// Ranking order: best first
///
/// Descending by expected damage, then lowest hit chance, then ascending
/// heat, then descending weapon count.
pub fn rank_order(a: &CandidateCombination, b: &CandidateCombination) -> Ordering {
    OrderedFloat(b.expected_damage)
        .cmp(&OrderedFloat(a.expected_damage))
        .then_with(|| OrderedFloat(b.lowest_hit_chance).cmp(&OrderedFloat(a.lowest_hit_chance)))
        .then_with(|| OrderedFloat(a.heat).cmp(&OrderedFloat(b.heat)))
        .then_with(|| b.weapon_count().cmp(&a.weapon_count()))
}

/// Attacker, target and the positions an attack is resolved from
#[derive(Debug, Clone, Copy)]
pub struct Engagement<'a> {
    pub attacker: &'a Combatant,
    pub target: &'a Combatant,
    pub attacker_position: Position,
    pub target_position: Position,
    pub target_evasive: bool,
}

impl<'a> Engagement<'a> {
    /// Both combatants where they currently stand
    pub fn in_place(attacker: &'a Combatant, target: &'a Combatant) -> Self {
        Self {
            attacker,
            target,
            attacker_position: attacker.position,
            target_position: target.position,
            target_evasive: target.is_evasive(),
        }
    }
}

/// Weapon sets of one category, evaluated from one position
#[derive(Debug, Clone)]
pub struct CategorySets<'a> {
    pub category: AttackCategory,
    pub engagement: Engagement<'a>,
    pub sets: WeaponSetList<'a>,
}

/// Scores, deduplicates and ranks candidate weapon sets
pub struct AttackEvaluationEngine<'c> {
    config: &'c EngineConfig,
    predictor: &'c dyn DamagePredictor,
}

impl<'c> AttackEvaluationEngine<'c> {
    pub fn new(config: &'c EngineConfig, predictor: &'c dyn DamagePredictor) -> Self {
        Self { config, predictor }
    }

    /// Evaluate every category and return the survivors ranked best first
    pub fn evaluate_all(&self, categories: &[CategorySets<'_>]) -> Vec<CandidateCombination> {
        let mut seen: AHashSet<ValueKey> = AHashSet::new();
        let mut results = Vec::new();

        for category in categories {
            tracing::debug!(
                "Evaluating {} {} sets",
                category.sets.len(),
                category.category
            );
            for candidate in self.evaluate_category(category) {
                if seen.insert(candidate.value_key()) {
                    tracing::trace!("Adding new attack evaluation: {}", candidate);
                    results.push(candidate);
                } else {
                    tracing::trace!("Skipping duplicate attack evaluation: {}", candidate);
                }
            }
        }

        results.sort_by(rank_order);
        results
    }

    /// Score every set of one category, in set order
    pub fn evaluate_category(&self, category: &CategorySets<'_>) -> Vec<CandidateCombination> {
        let groups = &category.sets.groups;
        let evaluate = |set: &Vec<WeaponGroupSelection>| {
            let assignments = expand(groups, set);
            self.evaluate_assignments(category.category, &category.engagement, assignments)
        };

        if category.sets.len() >= self.config.parallel_threshold {
            category.sets.sets.par_iter().map(evaluate).collect()
        } else {
            category.sets.sets.iter().map(evaluate).collect()
        }
    }

    /// Score an explicit weapon assignment list
    pub fn evaluate_assignments(
        &self,
        category: AttackCategory,
        engagement: &Engagement<'_>,
        mut assignments: Vec<WeaponAssignment>,
    ) -> CandidateCombination {
        let mut heat: f32 = assignments.iter().map(|a| a.stats.heat).sum();
        if category == AttackCategory::Ranged {
            if let Some(state) = &engagement.attacker.heat {
                heat += state.temp - state.heatsink_capacity;
            }
        }

        let query = DamageQuery {
            attacker: engagement.attacker,
            category,
            weapons: &assignments,
            target: engagement.target,
            attacker_position: engagement.attacker_position,
            target_position: engagement.target_position,
            target_evasive: engagement.target_evasive,
        };
        let prediction = self.predictor.expected_damage(&query);
        let lowest_hit_chance = self.predictor.lowest_hit_chance(&query);

        if prediction.is_artillery {
            assignments.retain(|a| a.stats.artillery);
        }

        CandidateCombination {
            category,
            assignments,
            heat,
            expected_damage: prediction.expected_damage,
            lowest_hit_chance,
        }
    }
}

/// Expand group selections into per-weapon assignments
///
/// A weapon already assigned keeps its first ammo-mode; later entries for
/// it are logged and skipped.
pub fn expand(groups: &[WeaponGroup<'_>], set: &[WeaponGroupSelection]) -> Vec<WeaponAssignment> {
    let mut assignments: Vec<WeaponAssignment> = Vec::new();
    for selection in set {
        let Some(group) = groups.get(selection.group) else {
            tracing::error!("Weapon set references missing group #{}", selection.group);
            continue;
        };
        let Some(mut stats) = group.def().stats_for(&selection.ammo_mode) else {
            tracing::warn!("{} has no ammo-mode {}", group, selection.ammo_mode);
            continue;
        };
        if let Some(damage) = group.damage_override {
            stats.damage_per_shot = damage;
        }

        for weapon in group.members() {
            if let Some(existing) = assignments.iter().find(|a| a.weapon == weapon.id) {
                tracing::error!(
                    "Duplicate add for '{}' #{}. Existing ammoModePair {}, duplicate ammoModePair {}",
                    weapon.def.id,
                    weapon.id.0,
                    existing.ammo_mode,
                    selection.ammo_mode
                );
                continue;
            }
            assignments.push(WeaponAssignment {
                weapon: weapon.id,
                name: weapon.name().to_string(),
                kind: weapon.def.kind,
                ammo_mode: selection.ammo_mode.clone(),
                stats,
            });
        }
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::ai::generator::enumerate;
    use crate::battle::ai::services::BaselineDamagePredictor;
    use crate::battle::battlefield::HeatState;
    use crate::combat::weapon_group::condense;
    use crate::combat::weapons::{FiringMode, WeaponDef};
    use crate::core::types::TeamId;
    use std::sync::Arc;

    fn candidate(damage: f32, hit: f32, heat: f32, weapons: usize) -> CandidateCombination {
        let stats = WeaponDef::laser("ML")
            .stats_for(&AmmoModePair::none())
            .unwrap();
        CandidateCombination {
            category: AttackCategory::Ranged,
            assignments: (0..weapons)
                .map(|i| WeaponAssignment {
                    weapon: WeaponId(i as u32),
                    name: "ML".into(),
                    kind: WeaponKind::Standard,
                    ammo_mode: AmmoModePair::none(),
                    stats,
                })
                .collect(),
            heat,
            expected_damage: damage,
            lowest_hit_chance: hit,
        }
    }

    fn create_test_pair() -> (Combatant, Combatant) {
        let attacker = Combatant::unit("Wolverine", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_weapon(Arc::new(WeaponDef::autocannon("AC5")));
        let target = Combatant::unit("Commando", TeamId(1), Position::new(120.0, 0.0));
        (attacker, target)
    }

    #[test]
    fn test_damage_tie_broken_by_hit_chance() {
        let b = candidate(10.0, 0.6, 5.0, 2);
        let c = candidate(10.0, 0.5, 5.0, 2);
        let a = candidate(10.0, 0.55, 5.0, 2);
        let mut ranked = vec![c.clone(), a.clone(), b.clone()];
        ranked.sort_by(rank_order);
        assert_eq!(ranked, vec![b, a, c]);
    }

    #[test]
    fn test_lower_heat_then_more_weapons_rank_higher() {
        let cool = candidate(10.0, 0.5, 3.0, 1);
        let hot = candidate(10.0, 0.5, 8.0, 3);
        assert_eq!(rank_order(&cool, &hot), Ordering::Less);

        let many = candidate(10.0, 0.5, 3.0, 3);
        assert_eq!(rank_order(&many, &cool), Ordering::Less);
    }

    #[test]
    fn test_ranged_heat_includes_temp_and_sinks() {
        let config = EngineConfig::default();
        let predictor = BaselineDamagePredictor::default();
        let engine = AttackEvaluationEngine::new(&config, &predictor);

        let (mut attacker, target) = create_test_pair();
        attacker.heat = Some(HeatState {
            current: 10.0,
            temp: 5.0,
            heatsink_capacity: 12.0,
            acceptable: 50.0,
        });
        let groups = condense(attacker.weapons.iter());
        let set = vec![WeaponGroupSelection {
            group: 0,
            ammo_mode: AmmoModePair::none(),
        }];
        let engagement = Engagement::in_place(&attacker, &target);

        let ranged = engine.evaluate_assignments(AttackCategory::Ranged, &engagement, expand(&groups, &set));
        assert_eq!(ranged.weapon_count(), 2);
        assert_eq!(ranged.heat, 20.0 + 5.0 - 12.0);

        let melee = engine.evaluate_assignments(AttackCategory::Melee, &engagement, expand(&groups, &set));
        assert_eq!(melee.heat, 20.0);
    }

    #[test]
    fn test_duplicate_weapon_keeps_first_mode() {
        let (attacker, _) = create_test_pair();
        let groups = condense(attacker.weapons.iter());
        let set = vec![
            WeaponGroupSelection {
                group: 1,
                ammo_mode: AmmoModePair::new("AC_STD", "AC_BALL"),
            },
            WeaponGroupSelection {
                group: 1,
                ammo_mode: AmmoModePair::new("AC_RAPID", "AC_BALL"),
            },
        ];
        let assignments = expand(&groups, &set);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].ammo_mode.mode_id, "AC_STD");
    }

    #[test]
    fn test_damage_override_replaces_per_shot_damage() {
        let (attacker, _) = create_test_pair();
        let attacker = attacker.with_melee(35.0, 100.0);
        let melee = attacker.melee_weapon.as_ref().unwrap();
        let groups = vec![WeaponGroup::strike(melee, melee.usable_ammo_modes(), 35.0)];
        let set = vec![WeaponGroupSelection {
            group: 0,
            ammo_mode: AmmoModePair::none(),
        }];
        let assignments = expand(&groups, &set);
        assert_eq!(assignments[0].stats.volley_damage(), 35.0);
        assert!(assignments[0].kind.is_synthetic());
    }

    #[test]
    fn test_artillery_attack_keeps_only_artillery_weapons() {
        let config = EngineConfig::default();
        let predictor = BaselineDamagePredictor::default();
        let engine = AttackEvaluationEngine::new(&config, &predictor);

        let attacker = Combatant::unit("Catapult", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_weapon(Arc::new(
                WeaponDef::new("ART", 60.0, 10.0, 900.0).with_mode(FiringMode::base("ART_STD", 1).artillery()),
            ));
        let target = Combatant::unit("Urbie", TeamId(1), Position::new(100.0, 0.0));
        let groups = condense(attacker.weapons.iter());
        let set = vec![
            WeaponGroupSelection {
                group: 0,
                ammo_mode: AmmoModePair::none(),
            },
            WeaponGroupSelection {
                group: 1,
                ammo_mode: AmmoModePair::new("ART_STD", ""),
            },
        ];
        let candidate = engine.evaluate_assignments(
            AttackCategory::Ranged,
            &Engagement::in_place(&attacker, &target),
            expand(&groups, &set),
        );
        assert_eq!(candidate.weapon_count(), 1);
        assert_eq!(candidate.assignments[0].name, "ART");
    }

    #[test]
    fn test_value_duplicates_dropped_and_ranked() {
        let config = EngineConfig::default();
        let predictor = BaselineDamagePredictor::default();
        let engine = AttackEvaluationEngine::new(&config, &predictor);

        let (attacker, target) = create_test_pair();
        let groups = condense(attacker.weapons.iter());
        let sets = enumerate(groups);
        let category = CategorySets {
            category: AttackCategory::Ranged,
            engagement: Engagement::in_place(&attacker, &target),
            sets,
        };

        let ranked = engine.evaluate_all(std::slice::from_ref(&category));
        assert!(!ranked.is_empty());
        assert!(ranked.len() <= category.sets.len());
        for pair in ranked.windows(2) {
            assert_ne!(rank_order(&pair[0], &pair[1]), Ordering::Greater);
        }
        // The all-weapons volley deals the most damage
        assert_eq!(ranked[0].weapon_count(), 3);
    }

    #[test]
    fn test_equal_value_sets_keep_first_per_category() {
        let config = EngineConfig::default();
        let predictor = BaselineDamagePredictor::default();
        let engine = AttackEvaluationEngine::new(&config, &predictor);

        // Two definitions with the same stats never share a group
        let attacker = Combatant::unit("Phoenix Hawk", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::laser("ML_FWD")))
            .with_weapon(Arc::new(WeaponDef::laser("ML_AFT")));
        let target = Combatant::unit("Locust", TeamId(1), Position::new(120.0, 0.0));
        let engagement = Engagement::in_place(&attacker, &target);
        let sets = enumerate(condense(attacker.weapons.iter()));
        assert_eq!(sets.len(), 4);

        let ranged = CategorySets {
            category: AttackCategory::Ranged,
            engagement,
            sets: sets.clone(),
        };
        let melee = CategorySets {
            category: AttackCategory::Melee,
            engagement,
            sets,
        };

        let first_single = engine
            .evaluate_category(&ranged)
            .into_iter()
            .find(|c| c.weapon_count() == 1)
            .unwrap();

        let ranked = engine.evaluate_all(&[ranged, melee]);
        // Empty, one laser and both lasers, once per category
        assert_eq!(ranked.len(), 6);

        let singles: Vec<&CandidateCombination> = ranked.iter().filter(|c| c.weapon_count() == 1).collect();
        assert_eq!(singles.len(), 2);
        assert_ne!(singles[0].category, singles[1].category);
        let ranged_single = singles
            .iter()
            .find(|c| c.category == AttackCategory::Ranged)
            .unwrap();
        assert_eq!(ranged_single.assignments[0].name, first_single.assignments[0].name);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential_config = EngineConfig::default();
        let parallel_config = EngineConfig {
            parallel_threshold: 1,
            ..EngineConfig::default()
        };
        let predictor = BaselineDamagePredictor::default();

        let (attacker, target) = create_test_pair();
        let category = CategorySets {
            category: AttackCategory::Ranged,
            engagement: Engagement::in_place(&attacker, &target),
            sets: enumerate(condense(attacker.weapons.iter())),
        };

        let sequential = AttackEvaluationEngine::new(&sequential_config, &predictor).evaluate_category(&category);
        let parallel = AttackEvaluationEngine::new(&parallel_config, &predictor).evaluate_category(&category);
        assert_eq!(sequential, parallel);
    }
}
