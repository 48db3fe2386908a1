//! Behavior variables: named tunables scoped by unit, personality, formation,
//! team and role, with mood-specific overrides
//!
//! Scopes are loaded from TOML. A lookup walks the scopes from the most
//! specific to the global one and falls back to a built-in default.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::battle::battlefield::{Combatant, Formation};
use crate::core::error::Result;
use crate::core::types::TeamId;

/// Names of the behavior variables the attack engine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorVariableName {
    /// Multiplier on the acceptable heat ceiling (applied only when > 1)
    AcceptableHeatLevel,
    /// Minimum damage level of the target's most damaged hittable location
    /// before a leap attack is considered
    ExistingTargetDamageForLeapAttack,
    /// Maximum own leg damage level at which a leap attack is still allowed
    OwnMaxLegDamageForLeapAttack,
    /// Percent bonus applied to the designated target's expected damage
    OpportunityFireExceedsDesignatedTargetByPercentage,
    /// Percent bonus applied to the designated target's firepower reduction
    OpportunityFireExceedsDesignatedTargetFirepowerTakeawayByPercentage,
    /// Melee is only worth the retaliation when damage dealt / damage taken
    /// exceeds this ratio
    MeleeDamageRatioCap,
}

impl BehaviorVariableName {
    pub fn all() -> [BehaviorVariableName; 6] {
        [
            Self::AcceptableHeatLevel,
            Self::ExistingTargetDamageForLeapAttack,
            Self::OwnMaxLegDamageForLeapAttack,
            Self::OpportunityFireExceedsDesignatedTargetByPercentage,
            Self::OpportunityFireExceedsDesignatedTargetFirepowerTakeawayByPercentage,
            Self::MeleeDamageRatioCap,
        ]
    }
}

/// Value of a behavior variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BehaviorValue {
    Bool(bool),
    Float(f32),
}

impl Default for BehaviorValue {
    fn default() -> Self {
        BehaviorValue::Float(0.0)
    }
}

impl BehaviorValue {
    pub fn as_float(&self) -> f32 {
        match self {
            BehaviorValue::Float(v) => *v,
            BehaviorValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            BehaviorValue::Bool(b) => *b,
            BehaviorValue::Float(v) => *v != 0.0,
        }
    }
}

/// Current mood of a unit's behavior tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neutral,
    Aggressive,
    Defensive,
}

/// Tactical role of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitRole {
    #[default]
    Undefined,
    Brawler,
    Sniper,
    Scout,
    Flanker,
    Support,
}

/// A set of variable values plus per-mood overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorScope {
    pub values: HashMap<BehaviorVariableName, BehaviorValue>,
    pub moods: HashMap<Mood, HashMap<BehaviorVariableName, BehaviorValue>>,
}

impl BehaviorScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: BehaviorVariableName, value: BehaviorValue) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn with_mood(mut self, mood: Mood, name: BehaviorVariableName, value: BehaviorValue) -> Self {
        self.moods.entry(mood).or_default().insert(name, value);
        self
    }

    pub fn get(&self, name: BehaviorVariableName) -> Option<BehaviorValue> {
        self.values.get(&name).copied()
    }

    /// Mood override first, then the mood-independent value
    pub fn get_with_mood(&self, name: BehaviorVariableName, mood: Mood) -> Option<BehaviorValue> {
        self.moods
            .get(&mood)
            .and_then(|vars| vars.get(&name))
            .copied()
            .or_else(|| self.get(name))
    }

    /// Values the engine falls back to when no scope sets a variable
    pub fn global_defaults() -> Self {
        use BehaviorVariableName::*;
        Self::new()
            .with(AcceptableHeatLevel, BehaviorValue::Float(1.0))
            .with(ExistingTargetDamageForLeapAttack, BehaviorValue::Float(0.0))
            .with(OwnMaxLegDamageForLeapAttack, BehaviorValue::Float(0.5))
            .with(
                OpportunityFireExceedsDesignatedTargetByPercentage,
                BehaviorValue::Float(25.0),
            )
            .with(
                OpportunityFireExceedsDesignatedTargetFirepowerTakeawayByPercentage,
                BehaviorValue::Float(10.0),
            )
            .with(MeleeDamageRatioCap, BehaviorValue::Float(1.0))
    }
}

/// All shared behavior scopes of a battle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorRegistry {
    pub personalities: HashMap<String, BehaviorScope>,
    pub roles: HashMap<UnitRole, BehaviorScope>,
    /// Consulted for units that can move after shooting
    pub reckless: BehaviorScope,
    pub global: BehaviorScope,
    #[serde(skip)]
    pub teams: AHashMap<TeamId, BehaviorScope>,
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self {
            personalities: HashMap::new(),
            roles: HashMap::new(),
            reckless: BehaviorScope::default(),
            global: BehaviorScope::global_defaults(),
            teams: AHashMap::new(),
        }
    }
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from TOML; unset global values keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut registry: BehaviorRegistry = toml::from_str(content)?;
        for (name, value) in BehaviorScope::global_defaults().values {
            registry.global.values.entry(name).or_insert(value);
        }
        Ok(registry)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Resolve a variable for `unit`, walking from the most specific scope
    pub fn resolve(
        &self,
        name: BehaviorVariableName,
        unit: &Combatant,
        formation: Option<&Formation>,
    ) -> BehaviorValue {
        let mood = unit.mood;

        if let Some(value) = unit.behavior.get(name) {
            return value;
        }

        if let Some(value) = unit
            .personality
            .as_ref()
            .and_then(|p| self.personalities.get(p))
            .and_then(|scope| scope.get_with_mood(name, mood))
        {
            return value;
        }

        if let Some(value) = formation.and_then(|f| f.behavior.get(name)) {
            return value;
        }

        if let Some(value) = self.teams.get(&unit.team).and_then(|s| s.get(name)) {
            return value;
        }

        if let Some(value) = self
            .roles
            .get(&unit.role)
            .and_then(|scope| scope.get_with_mood(name, mood))
        {
            return value;
        }

        if unit.can_move_after_shooting {
            if let Some(value) = self.reckless.get_with_mood(name, mood) {
                return value;
            }
        }

        self.global
            .get_with_mood(name, mood)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;
    use BehaviorVariableName::*;

    fn unit() -> Combatant {
        Combatant::unit("Hunchback", TeamId(1), Position::default())
    }

    #[test]
    fn test_global_default_when_no_scope_sets_value() {
        let registry = BehaviorRegistry::default();
        let value = registry.resolve(MeleeDamageRatioCap, &unit(), None);
        assert_eq!(value.as_float(), 1.0);
    }

    #[test]
    fn test_unit_override_beats_everything() {
        let mut registry = BehaviorRegistry::default();
        registry.personalities.insert(
            "brawler".into(),
            BehaviorScope::new().with(AcceptableHeatLevel, BehaviorValue::Float(1.5)),
        );
        let mut u = unit();
        u.personality = Some("brawler".into());
        assert_eq!(registry.resolve(AcceptableHeatLevel, &u, None).as_float(), 1.5);

        u.behavior = BehaviorScope::new().with(AcceptableHeatLevel, BehaviorValue::Float(2.0));
        assert_eq!(registry.resolve(AcceptableHeatLevel, &u, None).as_float(), 2.0);
    }

    #[test]
    fn test_mood_override_in_personality() {
        let mut registry = BehaviorRegistry::default();
        registry.personalities.insert(
            "cautious".into(),
            BehaviorScope::new()
                .with(OwnMaxLegDamageForLeapAttack, BehaviorValue::Float(0.3))
                .with_mood(
                    Mood::Aggressive,
                    OwnMaxLegDamageForLeapAttack,
                    BehaviorValue::Float(0.8),
                ),
        );
        let mut u = unit();
        u.personality = Some("cautious".into());
        assert_eq!(registry.resolve(OwnMaxLegDamageForLeapAttack, &u, None).as_float(), 0.3);

        u.mood = Mood::Aggressive;
        assert_eq!(registry.resolve(OwnMaxLegDamageForLeapAttack, &u, None).as_float(), 0.8);
    }

    #[test]
    fn test_formation_then_role_then_reckless() {
        let mut registry = BehaviorRegistry::default();
        registry.roles.insert(
            UnitRole::Sniper,
            BehaviorScope::new().with(MeleeDamageRatioCap, BehaviorValue::Float(3.0)),
        );
        registry.reckless = BehaviorScope::new().with(AcceptableHeatLevel, BehaviorValue::Float(1.3));

        let mut u = unit();
        u.role = UnitRole::Sniper;
        assert_eq!(registry.resolve(MeleeDamageRatioCap, &u, None).as_float(), 3.0);

        let formation = Formation::new(TeamId(1))
            .with_behavior(BehaviorScope::new().with(MeleeDamageRatioCap, BehaviorValue::Float(0.7)));
        assert_eq!(
            registry.resolve(MeleeDamageRatioCap, &u, Some(&formation)).as_float(),
            0.7
        );

        assert_eq!(registry.resolve(AcceptableHeatLevel, &u, None).as_float(), 1.0);
        u.can_move_after_shooting = true;
        assert_eq!(registry.resolve(AcceptableHeatLevel, &u, None).as_float(), 1.3);
    }

    #[test]
    fn test_registry_from_toml() {
        let registry = BehaviorRegistry::from_toml_str(
            r#"
            [personalities.aggressive.values]
            acceptable_heat_level = 1.4

            [personalities.aggressive.moods.defensive]
            acceptable_heat_level = 0.9

            [global.values]
            melee_damage_ratio_cap = 0.5
            "#,
        )
        .unwrap();

        let mut u = unit();
        u.personality = Some("aggressive".into());
        assert_eq!(registry.resolve(AcceptableHeatLevel, &u, None).as_float(), 1.4);
        u.mood = Mood::Defensive;
        assert_eq!(registry.resolve(AcceptableHeatLevel, &u, None).as_float(), 0.9);
        assert_eq!(registry.resolve(MeleeDamageRatioCap, &u, None).as_float(), 0.5);
        // Unset globals keep their defaults
        assert_eq!(
            registry
                .resolve(OpportunityFireExceedsDesignatedTargetByPercentage, &u, None)
                .as_float(),
            25.0
        );
    }

    #[test]
    fn test_value_conversions() {
        assert!(BehaviorValue::Float(0.5).as_bool());
        assert!(!BehaviorValue::Bool(false).as_bool());
        assert_eq!(BehaviorValue::Bool(true).as_float(), 1.0);
        assert_eq!(BehaviorValue::default().as_float(), 0.0);
    }
}
