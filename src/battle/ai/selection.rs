//! Walking ranked candidates through the feasibility gates
//!
//! The first candidate passing every gate with positive expected damage
//! becomes the order. Candidates rejected only for heat are kept for the
//! overheat backoff search.

use std::fmt;

use crate::battle::ai::evaluation::CandidateCombination;
use crate::battle::ai::orders::{AttackCategory, AttackOrder, OrderSubtype, SelectedWeapon};
use crate::battle::ai::services::SpecialOrderService;
use crate::battle::battlefield::Combatant;
use crate::core::types::Position;

/// Why a candidate was not chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoWeapons,
    Overheat,
    TargetNotUnit,
    AlreadyMoved,
    NoDestination,
    NotStationary,
    TargetNotDamagedEnough,
    LegsTooDamaged,
    NoDamage,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::NoWeapons => "no weapons!",
            Rejection::Overheat => "would cause overheat.",
            Rejection::TargetNotUnit => "target is a structure, it cannot be meleed or leapt onto!",
            Rejection::AlreadyMoved => "attacker has already moved!",
            Rejection::NoDestination => "cannot build path to target!",
            Rejection::NotStationary => "attacker did not choose a stationary branch, should not attack",
            Rejection::TargetNotDamagedEnough => "target is not damaged enough for a leap attack",
            Rejection::LegsTooDamaged => "own legs are too damaged for a leap attack",
            Rejection::NoDamage => "no expected damage",
        };
        write!(f, "{}", text)
    }
}

/// Facts about the attacker, target and branch that the gates test
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionGates {
    pub current_heat: f32,
    pub acceptable_heat: f32,
    pub is_stationary: bool,
    pub target_is_unit: bool,
    pub attacker_has_moved: bool,
    pub melee_destination: Option<Position>,
    pub leap_destination: Option<Position>,
    /// Damage level of the target's most damaged hittable location
    pub target_max_damage_level: f32,
    pub existing_target_damage_for_leap: f32,
    pub attacker_leg_damage: f32,
    pub max_leg_damage_for_leap: f32,
}

impl SelectionGates {
    pub fn check(&self, candidate: &CandidateCombination) -> Result<(), Rejection> {
        if candidate.assignments.is_empty() {
            return Err(Rejection::NoWeapons);
        }

        let overheats = candidate.heat + self.current_heat > self.acceptable_heat;
        tracing::debug!(
            "heat generated: {}  current: {}  acceptable: {}  willOverheat: {}",
            candidate.heat,
            self.current_heat,
            self.acceptable_heat,
            overheats
        );
        if overheats {
            return Err(Rejection::Overheat);
        }

        match candidate.category {
            AttackCategory::Ranged => {}
            AttackCategory::Melee => {
                self.check_maneuver(self.melee_destination)?;
                if !self.is_stationary {
                    return Err(Rejection::NotStationary);
                }
            }
            AttackCategory::Leap => {
                self.check_maneuver(self.leap_destination)?;
                if self.target_max_damage_level < self.existing_target_damage_for_leap {
                    return Err(Rejection::TargetNotDamagedEnough);
                }
                if self.attacker_leg_damage > self.max_leg_damage_for_leap {
                    return Err(Rejection::LegsTooDamaged);
                }
                if !self.is_stationary {
                    return Err(Rejection::NotStationary);
                }
            }
        }

        if candidate.expected_damage > 0.0 {
            Ok(())
        } else {
            Err(Rejection::NoDamage)
        }
    }

    fn check_maneuver(&self, destination: Option<Position>) -> Result<(), Rejection> {
        if !self.target_is_unit {
            return Err(Rejection::TargetNotUnit);
        }
        if self.attacker_has_moved {
            return Err(Rejection::AlreadyMoved);
        }
        if destination.is_none() {
            return Err(Rejection::NoDestination);
        }
        Ok(())
    }
}

/// Outcome of walking a ranked list
#[derive(Debug, Clone)]
pub enum Selection {
    Chosen(AttackOrder),
    Exhausted { overheated: Vec<CandidateCombination> },
}

/// Picks the first acceptable candidate against one target
pub struct AttackSelectionPolicy<'a> {
    pub gates: SelectionGates,
    pub attacker: &'a Combatant,
    pub target: &'a Combatant,
    pub special: &'a dyn SpecialOrderService,
}

impl<'a> AttackSelectionPolicy<'a> {
    pub fn select(&self, ranked: Vec<CandidateCombination>) -> Selection {
        tracing::debug!("Attempting to find first valid attack evaluation out of {}.", ranked.len());
        let mut overheated = Vec::new();

        for (n, candidate) in ranked.into_iter().enumerate() {
            tracing::trace!(" ==== Evaluating attack solution #{} vs target: {}: {}", n, self.target.name, candidate);
            match self.gates.check(&candidate) {
                Ok(()) => return Selection::Chosen(self.build_order(candidate)),
                Err(Rejection::Overheat) => {
                    tracing::debug!("SOLUTION REJECTED - {}", Rejection::Overheat);
                    overheated.push(candidate);
                }
                Err(rejection) => tracing::debug!("SOLUTION REJECTED - {}", rejection),
            }
        }

        Selection::Exhausted { overheated }
    }

    /// Gate a single candidate
    pub fn accept(&self, candidate: CandidateCombination) -> Result<AttackOrder, Rejection> {
        self.gates.check(&candidate)?;
        Ok(self.build_order(candidate))
    }

    fn build_order(&self, candidate: CandidateCombination) -> AttackOrder {
        let attack_from = match candidate.category {
            AttackCategory::Ranged => None,
            AttackCategory::Melee => self.gates.melee_destination,
            AttackCategory::Leap => self.gates.leap_destination,
        };

        let (subtype, rationale) = self.upgrade(&candidate);

        // Strike weapons are virtual; they are never fired
        let weapons: Vec<SelectedWeapon> = candidate
            .assignments
            .iter()
            .filter(|a| !a.kind.is_synthetic())
            .map(|a| SelectedWeapon {
                weapon: a.weapon,
                name: a.name.clone(),
                ammo_mode: a.ammo_mode.clone(),
            })
            .collect();

        let order = AttackOrder {
            attacker: self.attacker.id,
            target: self.target.id,
            target_name: self.target.name.clone(),
            category: candidate.category,
            weapons,
            attack_from,
            subtype,
            expected_damage: candidate.expected_damage,
            heat: candidate.heat,
            lowest_hit_chance: candidate.lowest_hit_chance,
            rationale,
        };
        tracing::debug!(
            "Chosen attack has weapons: {}. Returning attack order {}",
            order.weapon_list_string(),
            order.rationale
        );
        order
    }

    /// Offensive push first, then called shot, for ranged attacks only
    fn upgrade(&self, candidate: &CandidateCombination) -> (OrderSubtype, String) {
        let name = &self.target.name;
        if candidate.category == AttackCategory::Ranged {
            if let Some(subtype) = self.special.offensive_push(self.attacker, candidate, self.target) {
                tracing::debug!("-- Converting to an offensive push order");
                return (subtype, format!("using offensive push against: {}", name));
            }
            if let Some(subtype) = self.special.called_shot(self.attacker, candidate, self.target) {
                tracing::debug!("-- Converting to called shot order");
                return (subtype, format!("using called shot against: {}", name));
            }
        }
        (
            OrderSubtype::WeaponFire,
            format!("using attack type: {} against: {}", candidate.category, name),
        )
    }
}
