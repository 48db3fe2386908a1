//! Engine configuration with documented constants
//!
//! All tunables the attack engine reads are collected here. The config is
//! loaded once and is immutable for the duration of a decision.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{FireControlError, Result};

/// Decision weights applied while building and filtering weapon sets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionWeights {
    /// Minimum single-shot hit chance required to spend the last volley of
    /// non-replenishable (internal) ammunition
    ///
    /// At 0.4, a weapon down to its final volley only fires when it has
    /// at least a 40% chance to land it.
    pub one_shot_minimum_to_hit: f32,

    /// Multiplier deciding whether a unit "favors melee"
    ///
    /// A unit favors melee when its raw melee damage is at least this many
    /// times its raw (best-mode) ranged damage. Melee-favoring units are
    /// offered melee options without the retaliation check.
    pub melee_favor_damage_multiplier: f32,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            one_shot_minimum_to_hit: 0.4,
            melee_favor_damage_multiplier: 2.0,
        }
    }
}

/// Configuration for the attack synthesis engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === COMBINATION SPACE ===
    /// Total ammo-mode count (summed over all weapon groups of a category)
    /// above which simplified selection kicks in
    ///
    /// Simplified selection keeps at most two modes per weapon group: the
    /// base mode and the mode firing the most shots. This caps the
    /// otherwise exponential combination count.
    pub simplified_ammo_mode_threshold: usize,

    /// Firing mode ids that may only be used against flying targets
    pub flying_only_modes: Vec<String>,

    // === OVERHEAT BACKOFF ===
    /// Whether to salvage an attack from heat-rejected combinations by
    /// trimming weapons when no combination fits the heat ceiling
    pub attempt_reducing_overheat_solutions: bool,

    /// Maximum number of weapon removals the backoff search may attempt
    pub backoff_attempt_limit: usize,

    // === PARALLELIZATION ===
    /// Minimum combination count in a category before scoring in parallel
    ///
    /// Below this threshold thread overhead exceeds the benefit.
    pub parallel_threshold: usize,

    pub weights: DecisionWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simplified_ammo_mode_threshold: 40,
            flying_only_modes: Vec::new(),
            attempt_reducing_overheat_solutions: false,
            backoff_attempt_limit: 100,
            parallel_threshold: 256,
            weights: DecisionWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.simplified_ammo_mode_threshold == 0 {
            return Err(FireControlError::InvalidConfig(
                "simplified_ammo_mode_threshold must be positive".into(),
            ));
        }

        let to_hit = self.weights.one_shot_minimum_to_hit;
        if !(0.0..=1.0).contains(&to_hit) {
            return Err(FireControlError::InvalidConfig(format!(
                "one_shot_minimum_to_hit ({}) must be within [0, 1]",
                to_hit
            )));
        }

        if self.weights.melee_favor_damage_multiplier < 0.0 {
            return Err(FireControlError::InvalidConfig(format!(
                "melee_favor_damage_multiplier ({}) must not be negative",
                self.weights.melee_favor_damage_multiplier
            )));
        }

        Ok(())
    }

    pub fn is_flying_only_mode(&self, mode_id: &str) -> bool {
        self.flying_only_modes.iter().any(|m| m == mode_id)
    }

    /// Emit the active configuration to the log
    pub fn log_summary(&self) {
        tracing::info!("=== ENGINE CONFIG BEGIN ===");
        tracing::info!(
            " simplified_ammo_mode_threshold: {}",
            self.simplified_ammo_mode_threshold
        );
        tracing::info!(
            " attempt_reducing_overheat_solutions: {} (limit {})",
            self.attempt_reducing_overheat_solutions,
            self.backoff_attempt_limit
        );
        tracing::info!(" flying_only_modes: {}", self.flying_only_modes.join(", "));
        tracing::info!(" parallel_threshold: {}", self.parallel_threshold);
        tracing::info!(
            " one_shot_minimum_to_hit: {}  melee_favor_damage_multiplier: {}",
            self.weights.one_shot_minimum_to_hit,
            self.weights.melee_favor_damage_multiplier
        );
        tracing::info!("=== ENGINE CONFIG END ===");
    }
}
