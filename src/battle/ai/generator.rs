//! Weapon-set generation: which groups fire, and in which ammo-mode
//!
//! Groups are first filtered against the current target (flying-only modes,
//! simplified selection, minimum range, scarce one-shot ammunition). The
//! survivors are enumerated as the full product where every group is either
//! excluded or included with one of its modes. Combinations that are equal
//! as multisets of (definition, group size, ammo-mode) are kept only once.

use ahash::{AHashMap, AHashSet};

use crate::battle::ai::services::DamagePredictor;
use crate::battle::battlefield::Combatant;
use crate::combat::weapon_group::WeaponGroup;
use crate::combat::weapons::AmmoModePair;
use crate::core::config::EngineConfig;
use crate::core::types::Position;

/// One group of a weapon set fired in one ammo-mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeaponGroupSelection {
    /// Index into [`WeaponSetList::groups`]
    pub group: usize,
    pub ammo_mode: AmmoModePair,
}

/// Weapon sets of one attack category
#[derive(Debug, Clone, Default)]
pub struct WeaponSetList<'a> {
    pub groups: Vec<WeaponGroup<'a>>,
    pub sets: Vec<Vec<WeaponGroupSelection>>,
    /// Combinations visited before deduplication
    pub raw_count: usize,
}

impl<'a> WeaponSetList<'a> {
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Add `group` to every set, once per ammo-mode it offers
    pub fn append_to_every_set(&mut self, group: WeaponGroup<'a>) {
        let index = self.groups.len();
        for set in &mut self.sets {
            for pair in &group.ammo_modes {
                set.push(WeaponGroupSelection {
                    group: index,
                    ammo_mode: pair.clone(),
                });
            }
        }
        self.groups.push(group);
    }
}

/// Every include/exclude combination of `groups`, deduplicated
///
/// Each group's choices are its ammo-modes in order followed by exclusion.
/// Combinations are visited with the last group varying fastest, so the
/// all-excluded combination comes last.
pub fn enumerate(groups: Vec<WeaponGroup<'_>>) -> WeaponSetList<'_> {
    // Intern (definition, size, ammo-mode) so set keys are small integers
    let pair_ids: Vec<Vec<usize>> = {
        let mut interned: AHashMap<(&str, usize, &AmmoModePair), usize> = AHashMap::new();
        groups
            .iter()
            .map(|group| {
                group
                    .ammo_modes
                    .iter()
                    .map(|pair| {
                        let next = interned.len();
                        *interned
                            .entry((group.def().id.as_str(), group.count(), pair))
                            .or_insert(next)
                    })
                    .collect()
            })
            .collect()
    };

    let radices: Vec<usize> = groups.iter().map(|g| g.ammo_modes.len() + 1).collect();
    let mut digits = vec![0usize; groups.len()];
    let mut seen: AHashSet<Vec<usize>> = AHashSet::new();
    let mut sets = Vec::new();
    let mut raw_count = 0;

    'combinations: loop {
        raw_count += 1;

        let mut key: Vec<usize> = Vec::with_capacity(digits.len());
        let mut selections = Vec::with_capacity(digits.len());
        for (index, &digit) in digits.iter().enumerate() {
            if digit < groups[index].ammo_modes.len() {
                key.push(pair_ids[index][digit]);
                selections.push(WeaponGroupSelection {
                    group: index,
                    ammo_mode: groups[index].ammo_modes[digit].clone(),
                });
            }
        }
        key.sort_unstable();
        if seen.insert(key) {
            sets.push(selections);
        }

        let mut position = digits.len();
        loop {
            if position == 0 {
                break 'combinations;
            }
            position -= 1;
            digits[position] += 1;
            if digits[position] < radices[position] {
                break;
            }
            digits[position] = 0;
        }
    }

    tracing::trace!(
        "Enumerated {} weapon sets ({} before dedup) from {} groups",
        sets.len(),
        raw_count,
        groups.len()
    );

    WeaponSetList {
        groups,
        sets,
        raw_count,
    }
}

/// Filters groups against a target and enumerates the survivors
pub struct AmmoModeSetGenerator<'c> {
    config: &'c EngineConfig,
    predictor: &'c dyn DamagePredictor,
}

impl<'c> AmmoModeSetGenerator<'c> {
    pub fn new(config: &'c EngineConfig, predictor: &'c dyn DamagePredictor) -> Self {
        Self { config, predictor }
    }

    /// Ranged weapon sets against `target` from `attack_position`
    pub fn ranged_sets<'a>(
        &self,
        groups: Vec<WeaponGroup<'a>>,
        attack_position: Position,
        target: &Combatant,
    ) -> WeaponSetList<'a> {
        enumerate(self.filter_groups(groups, attack_position, target))
    }

    /// Drop the ammo-modes that cannot or should not fire, then the groups
    /// left without any
    pub fn filter_groups<'a>(
        &self,
        groups: Vec<WeaponGroup<'a>>,
        attack_position: Position,
        target: &Combatant,
    ) -> Vec<WeaponGroup<'a>> {
        let mode_count: usize = groups.iter().map(|g| g.ammo_modes.len()).sum();
        let simplified = mode_count > self.config.simplified_ammo_mode_threshold;
        if simplified {
            tracing::debug!(
                "Found {} ammo modes, which is over threshold {}. Enabling simplified selection.",
                mode_count,
                self.config.simplified_ammo_mode_threshold
            );
        }

        let mut kept = Vec::with_capacity(groups.len());
        for mut group in groups {
            let simplified_modes = if simplified && group.def().modes.len() > 1 {
                match simplified_mode_ids(&group) {
                    Some(ids) => Some(ids),
                    None => {
                        tracing::error!(
                            "Simplified ammo/mode selection => skipping {}, unable to find base mode",
                            group.def().id
                        );
                        continue;
                    }
                }
            } else {
                None
            };

            let valid: Vec<AmmoModePair> = group
                .ammo_modes
                .iter()
                .filter(|pair| {
                    self.is_ammo_mode_usable(&group, pair, simplified_modes.as_deref(), attack_position, target)
                })
                .cloned()
                .collect();

            if valid.is_empty() {
                tracing::debug!(" Skipping weapon {} in ranged set due to no valid ammoModes", group);
                continue;
            }
            group.ammo_modes = valid;
            kept.push(group);
        }
        kept
    }

    fn is_ammo_mode_usable(
        &self,
        group: &WeaponGroup<'_>,
        pair: &AmmoModePair,
        simplified_modes: Option<&[String]>,
        attack_position: Position,
        target: &Combatant,
    ) -> bool {
        if !target.is_flying() && self.config.is_flying_only_mode(&pair.mode_id) {
            return false;
        }

        if let Some(ids) = simplified_modes {
            if !ids.iter().any(|id| *id == pair.mode_id) {
                return false;
            }
        }

        let Some(stats) = group.def().stats_for(pair) else {
            return false;
        };

        let distance = attack_position.distance(&target.position);
        if distance < stats.min_range {
            tracing::debug!(
                " Skipping ammoMode {} for {} in ranged set as distance: {} < minRange: {}",
                pair,
                group,
                distance,
                stats.min_range
            );
            return false;
        }

        // Last volley of ammunition that cannot be replenished
        let last_volley =
            stats.uses_internal_ammo && group.first().remaining_ammo(&pair.ammo_id) == Some(stats.shots_when_fired);
        if last_volley {
            let to_hit = self.predictor.hit_chance(
                &stats,
                attack_position,
                target,
                target.position,
                target.is_evasive(),
            );
            if to_hit < self.config.weights.one_shot_minimum_to_hit {
                tracing::debug!(
                    " Skipping ammoMode {} for {} as toHit: {} is below one_shot_minimum_to_hit: {}",
                    pair,
                    group,
                    to_hit,
                    self.config.weights.one_shot_minimum_to_hit
                );
                return false;
            }
        }

        true
    }
}

/// Base mode plus the mode firing the most shots, if different
fn simplified_mode_ids(group: &WeaponGroup<'_>) -> Option<Vec<String>> {
    let def = group.def();
    let mut ids = Vec::new();
    let base = def.base_mode();
    if let Some(base) = base {
        tracing::debug!("Simplified ammo/mode operation => Found base mode '{}'.", base.id);
        ids.push(base.id.clone());
    }
    if let Some(max) = def.max_shots_mode() {
        if base.map_or(true, |b| b.id != max.id) {
            tracing::debug!("Simplified ammo/mode operation => Found maximum shots mode '{}'.", max.id);
            ids.push(max.id.clone());
        }
    }
    (!ids.is_empty()).then_some(ids)
}
