//! Overheat backoff: salvage an attack from heat-rejected combinations
//!
//! Each attempt pops a rejected combination, drops one weapon at random,
//! re-scores what is left and runs it back through the gates. Shrunk
//! combinations that still hold two or more weapons go back in the queue.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

use crate::battle::ai::evaluation::{CandidateCombination, WeaponAssignment};
use crate::battle::ai::orders::AttackCategory;
use crate::battle::ai::selection::Rejection;

/// Bounded randomized search over heat-rejected combinations
#[derive(Debug, Clone)]
pub struct OverheatBackoffSearch {
    limit: usize,
    attempts: usize,
    rng: ChaCha8Rng,
}

impl OverheatBackoffSearch {
    pub fn new(limit: usize, seed: u64) -> Self {
        Self {
            limit,
            attempts: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Search seeded for one target of a decision
    pub fn for_target(limit: usize, seed: u64, target_ordinal: usize) -> Self {
        Self::new(limit, seed ^ (target_ordinal as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Run until a reduced combination is accepted, the queue drains or
    /// the attempt limit is reached
    pub fn run<T, R, A>(
        &mut self,
        overheated: Vec<CandidateCombination>,
        mut reevaluate: R,
        mut accept: A,
    ) -> Option<T>
    where
        R: FnMut(AttackCategory, Vec<WeaponAssignment>) -> CandidateCombination,
        A: FnMut(CandidateCombination) -> Result<T, Rejection>,
    {
        let mut queue: VecDeque<CandidateCombination> = overheated.into();
        tracing::debug!("Attempting to reduce {} overheating solutions", queue.len());

        while self.attempts < self.limit {
            let Some(candidate) = queue.pop_front() else {
                break;
            };
            self.attempts += 1;
            if candidate.assignments.is_empty() {
                continue;
            }

            let mut assignments = candidate.assignments;
            let index = self.rng.gen_range(0..assignments.len());
            let removed = assignments.remove(index);
            tracing::trace!("Backoff attempt {} removed {}[{}]", self.attempts, removed.name, removed.ammo_mode);

            let reduced = reevaluate(candidate.category, assignments);
            let remaining = reduced.weapon_count();
            let requeue = (remaining >= 2).then(|| reduced.clone());

            match accept(reduced) {
                Ok(accepted) => {
                    tracing::debug!("Found a non-overheating solution after {} attempts", self.attempts);
                    return Some(accepted);
                }
                Err(rejection) => tracing::trace!("Reduced solution rejected - {}", rejection),
            }

            if let Some(reduced) = requeue {
                queue.push_back(reduced);
            }
        }

        tracing::debug!("Overheat backoff gave up after {} attempts", self.attempts);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::weapons::{AmmoModePair, WeaponDef, WeaponKind};
    use crate::core::types::WeaponId;

    fn overheating(weapons: usize, heat_each: f32) -> CandidateCombination {
        let stats = WeaponDef::new("PPC", 10.0, heat_each, 540.0)
            .stats_for(&AmmoModePair::none())
            .unwrap();
        CandidateCombination {
            category: AttackCategory::Ranged,
            assignments: (0..weapons)
                .map(|i| WeaponAssignment {
                    weapon: WeaponId(i as u32 + 1),
                    name: format!("PPC{}", i + 1),
                    kind: WeaponKind::Standard,
                    ammo_mode: AmmoModePair::none(),
                    stats,
                })
                .collect(),
            heat: weapons as f32 * heat_each,
            expected_damage: weapons as f32 * 10.0,
            lowest_hit_chance: 0.6,
        }
    }

    fn rescore(category: AttackCategory, assignments: Vec<WeaponAssignment>) -> CandidateCombination {
        CandidateCombination {
            category,
            heat: assignments.iter().map(|a| a.stats.heat).sum(),
            expected_damage: assignments.iter().map(|a| a.stats.volley_damage()).sum(),
            lowest_hit_chance: 0.6,
            assignments,
        }
    }

    fn under(ceiling: f32) -> impl FnMut(CandidateCombination) -> Result<CandidateCombination, Rejection> {
        move |c| {
            if c.heat > ceiling {
                Err(Rejection::Overheat)
            } else {
                Ok(c)
            }
        }
    }

    #[test]
    fn test_reduces_until_heat_fits() {
        let mut search = OverheatBackoffSearch::new(100, 3);
        let found = search
            .run(vec![overheating(4, 15.0)], rescore, under(30.0))
            .unwrap();
        assert_eq!(found.weapon_count(), 2);
        assert_eq!(search.attempts(), 2);
    }

    #[test]
    fn test_attempts_never_exceed_limit() {
        let pool: Vec<_> = (0..20).map(|_| overheating(6, 15.0)).collect();
        let mut search = OverheatBackoffSearch::new(5, 11);
        let found = search.run(pool, rescore, under(0.0));
        assert!(found.is_none());
        assert_eq!(search.attempts(), 5);
    }

    #[test]
    fn test_terminates_when_queue_drains() {
        // A two-weapon set shrinks to one weapon and is not re-queued
        let mut search = OverheatBackoffSearch::new(100, 0);
        let found = search.run(vec![overheating(2, 15.0)], rescore, under(0.0));
        assert!(found.is_none());
        assert_eq!(search.attempts(), 1);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = |seed| {
            let mut search = OverheatBackoffSearch::for_target(100, seed, 2);
            search.run(vec![overheating(5, 15.0)], rescore, under(30.0))
        };
        assert_eq!(run(42), run(42));
    }
}
