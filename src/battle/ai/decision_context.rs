//! Per-decision state for one attacker
//!
//! Created at the start of a decision and dropped at its end. Behavior
//! variable lookups are cached here rather than in any shared state.

use ahash::AHashMap;
use std::cell::RefCell;

use crate::battle::ai::behavior::{BehaviorValue, BehaviorVariableName};
use crate::battle::ai::services::Services;
use crate::battle::battlefield::{Battlefield, Combatant, Formation};
use crate::core::config::EngineConfig;

/// Everything one attack decision reads
pub struct DecisionContext<'a> {
    pub battlefield: &'a Battlefield,
    pub config: &'a EngineConfig,
    pub services: &'a Services,
    pub attacker: &'a Combatant,
    /// The host evaluated a branch where the attacker stays in place
    pub is_stationary: bool,
    /// Seed for every random choice made during this decision
    pub seed: u64,
    behavior_cache: RefCell<AHashMap<BehaviorVariableName, BehaviorValue>>,
}

impl<'a> DecisionContext<'a> {
    pub fn new(
        battlefield: &'a Battlefield,
        config: &'a EngineConfig,
        services: &'a Services,
        attacker: &'a Combatant,
        is_stationary: bool,
        seed: u64,
    ) -> Self {
        Self {
            battlefield,
            config,
            services,
            attacker,
            is_stationary,
            seed,
            behavior_cache: RefCell::new(AHashMap::new()),
        }
    }

    pub fn formation(&self) -> Option<&'a Formation> {
        self.battlefield.formation_of(self.attacker)
    }

    /// Resolve a behavior variable for the attacker, cached for the decision
    pub fn behavior(&self, name: BehaviorVariableName) -> BehaviorValue {
        if let Some(value) = self.behavior_cache.borrow().get(&name) {
            return *value;
        }
        let value = self
            .battlefield
            .behavior
            .resolve(name, self.attacker, self.formation());
        self.behavior_cache.borrow_mut().insert(name, value);
        value
    }

    pub fn behavior_float(&self, name: BehaviorVariableName) -> f32 {
        self.behavior(name).as_float()
    }

    /// Living hostile combatants
    pub fn enemies(&self) -> Vec<&'a Combatant> {
        self.battlefield.enemies_of(self.attacker)
    }

    /// Position of `target` among the enemies, used to derive per-target seeds
    pub fn target_ordinal(&self, target: &Combatant) -> usize {
        self.enemies()
            .iter()
            .position(|e| e.id == target.id)
            .unwrap_or(usize::MAX)
    }

    pub fn cached_behavior_count(&self) -> usize {
        self.behavior_cache.borrow().len()
    }
}
