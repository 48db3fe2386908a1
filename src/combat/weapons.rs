//! Weapon definitions, firing modes and ammunition
//!
//! A weapon definition is static data. A firing mode and an ammunition type
//! together form an [`AmmoModePair`]; the stats a weapon has under a pair are
//! derived by a pure function ([`WeaponDef::stats_for`]) so candidate attacks
//! can be scored without touching live weapon state.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::core::types::WeaponId;

/// Mode id of a weapon's base firing mode when it declares none explicitly
pub const BASE_MODE: &str = "B";

/// Mode id used by weapons without any firing modes
pub const NONE_MODE: &str = "N";

/// A (firing mode, ammunition) choice for one weapon
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AmmoModePair {
    pub mode_id: String,
    /// Empty when the weapon consumes no ammunition
    #[serde(default)]
    pub ammo_id: String,
}

impl AmmoModePair {
    pub fn new(mode_id: impl Into<String>, ammo_id: impl Into<String>) -> Self {
        Self {
            mode_id: mode_id.into(),
            ammo_id: ammo_id.into(),
        }
    }

    /// Base mode with the given ammunition
    pub fn base(ammo_id: impl Into<String>) -> Self {
        Self::new(BASE_MODE, ammo_id)
    }

    /// No mode, no ammunition
    pub fn none() -> Self {
        Self::new(NONE_MODE, "")
    }

    /// True when the mode id is one of the sentinels rather than a named mode
    pub fn is_sentinel_mode(&self) -> bool {
        self.mode_id == BASE_MODE || self.mode_id == NONE_MODE
    }
}

impl fmt::Display for AmmoModePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_sentinel_mode(), self.ammo_id.is_empty()) {
            (false, false) => write!(f, "{}/{}", self.mode_id, self.ammo_id),
            (false, true) => write!(f, "{}", self.mode_id),
            (true, false) => write!(f, "{}", self.ammo_id),
            (true, true) => write!(f, "-"),
        }
    }
}

/// What kind of firing unit a weapon definition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// A real weapon that is fired
    #[default]
    Standard,
    /// Stand-in for the physical melee strike; its damage is virtual
    MeleeStrike,
    /// Stand-in for the leap (death-from-above) strike; its damage is virtual
    LeapStrike,
}

impl WeaponKind {
    pub fn is_synthetic(&self) -> bool {
        *self != WeaponKind::Standard
    }
}

/// A firing mode; numeric fields are deltas on top of the weapon definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiringMode {
    pub id: String,
    #[serde(default)]
    pub is_base: bool,
    #[serde(default = "default_shots")]
    pub shots_when_fired: u32,
    #[serde(default)]
    pub damage_per_shot: f32,
    #[serde(default)]
    pub heat: f32,
    /// Replaces the weapon's minimum range when set
    #[serde(default)]
    pub min_range: Option<f32>,
    #[serde(default)]
    pub accuracy: f32,
    #[serde(default)]
    pub artillery: bool,
}

fn default_shots() -> u32 {
    1
}

impl FiringMode {
    pub fn new(id: impl Into<String>, shots_when_fired: u32) -> Self {
        Self {
            id: id.into(),
            is_base: false,
            shots_when_fired,
            damage_per_shot: 0.0,
            heat: 0.0,
            min_range: None,
            accuracy: 0.0,
            artillery: false,
        }
    }

    pub fn base(id: impl Into<String>, shots_when_fired: u32) -> Self {
        Self {
            is_base: true,
            ..Self::new(id, shots_when_fired)
        }
    }

    pub fn with_heat(mut self, heat: f32) -> Self {
        self.heat = heat;
        self
    }

    pub fn with_damage(mut self, damage_per_shot: f32) -> Self {
        self.damage_per_shot = damage_per_shot;
        self
    }

    pub fn with_min_range(mut self, min_range: f32) -> Self {
        self.min_range = Some(min_range);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn artillery(mut self) -> Self {
        self.artillery = true;
        self
    }
}

/// An ammunition type; numeric fields are deltas on top of the definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmoDef {
    pub id: String,
    /// Internal ammunition cannot be replenished during a battle
    #[serde(default)]
    pub internal: bool,
    /// Rounds carried at battle start
    pub capacity: u32,
    #[serde(default)]
    pub damage_per_shot: f32,
    #[serde(default)]
    pub heat: f32,
}

impl AmmoDef {
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            internal: false,
            capacity,
            damage_per_shot: 0.0,
            heat: 0.0,
        }
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn with_damage(mut self, damage_per_shot: f32) -> Self {
        self.damage_per_shot = damage_per_shot;
        self
    }
}

/// Static weapon definition shared by every instance of the weapon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: WeaponKind,
    pub damage_per_shot: f32,
    #[serde(default = "default_shots")]
    pub shots_when_fired: u32,
    /// Heat per volley
    #[serde(default)]
    pub heat: f32,
    #[serde(default)]
    pub min_range: f32,
    pub max_range: f32,
    /// Base hit chance before range and evasion (0.0 to 1.0)
    #[serde(default = "default_accuracy")]
    pub accuracy: f32,
    #[serde(default)]
    pub can_fire_in_melee: bool,
    #[serde(default)]
    pub artillery: bool,
    #[serde(default)]
    pub modes: Vec<FiringMode>,
    #[serde(default)]
    pub ammo: Vec<AmmoDef>,
}

fn default_accuracy() -> f32 {
    0.75
}

/// Stats of a weapon under one ammo-mode pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage_per_shot: f32,
    pub shots_when_fired: u32,
    pub heat: f32,
    pub min_range: f32,
    pub max_range: f32,
    pub accuracy: f32,
    pub artillery: bool,
    pub uses_internal_ammo: bool,
}

impl WeaponStats {
    /// Raw damage of one volley, before hit chance
    pub fn volley_damage(&self) -> f32 {
        self.damage_per_shot * self.shots_when_fired as f32
    }

    /// Whether a target at `distance` is inside the firing envelope
    pub fn in_range(&self, distance: f32) -> bool {
        distance >= self.min_range && distance <= self.max_range
    }
}

impl WeaponDef {
    pub fn new(id: impl Into<String>, damage_per_shot: f32, heat: f32, max_range: f32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: WeaponKind::Standard,
            damage_per_shot,
            shots_when_fired: 1,
            heat,
            min_range: 0.0,
            max_range,
            accuracy: default_accuracy(),
            can_fire_in_melee: false,
            artillery: false,
            modes: Vec::new(),
            ammo: Vec::new(),
        }
    }

    /// Synthetic stand-in for a physical strike (melee or leap)
    pub fn strike(id: impl Into<String>, kind: WeaponKind) -> Self {
        Self {
            kind,
            can_fire_in_melee: true,
            accuracy: 0.9,
            ..Self::new(id, 0.0, 0.0, f32::MAX)
        }
    }

    pub fn with_min_range(mut self, min_range: f32) -> Self {
        self.min_range = min_range;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_mode(mut self, mode: FiringMode) -> Self {
        self.modes.push(mode);
        self
    }

    pub fn with_ammo(mut self, ammo: AmmoDef) -> Self {
        self.ammo.push(ammo);
        self
    }

    pub fn melee_capable(mut self) -> Self {
        self.can_fire_in_melee = true;
        self
    }

    pub fn artillery(mut self) -> Self {
        self.artillery = true;
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.kind.is_synthetic()
    }

    /// The explicit base mode, if the weapon declares modes
    pub fn base_mode(&self) -> Option<&FiringMode> {
        self.modes.iter().find(|m| m.is_base)
    }

    /// The mode firing the most shots; the first one wins ties
    pub fn max_shots_mode(&self) -> Option<&FiringMode> {
        let mut best: Option<&FiringMode> = None;
        for mode in &self.modes {
            if best.map_or(true, |b| mode.shots_when_fired > b.shots_when_fired) {
                best = Some(mode);
            }
        }
        best
    }

    fn mode_ids(&self) -> Vec<&str> {
        if self.modes.is_empty() {
            vec![NONE_MODE]
        } else {
            self.modes.iter().map(|m| m.id.as_str()).collect()
        }
    }

    fn ammo_ids(&self) -> Vec<&str> {
        if self.ammo.is_empty() {
            vec![""]
        } else {
            self.ammo.iter().map(|a| a.id.as_str()).collect()
        }
    }

    /// Every (mode, ammo) combination the definition supports
    pub fn available_ammo_modes(&self) -> Vec<AmmoModePair> {
        let ammo_ids = self.ammo_ids();
        self.mode_ids()
            .into_iter()
            .flat_map(|mode| {
                ammo_ids
                    .iter()
                    .map(move |ammo| AmmoModePair::new(mode, *ammo))
            })
            .collect()
    }

    /// Pair a freshly mounted weapon starts in: base mode, first ammunition
    pub fn default_ammo_mode(&self) -> AmmoModePair {
        let mode = self
            .base_mode()
            .or_else(|| self.modes.first())
            .map(|m| m.id.as_str())
            .unwrap_or(NONE_MODE);
        let ammo = self.ammo.first().map(|a| a.id.as_str()).unwrap_or("");
        AmmoModePair::new(mode, ammo)
    }

    /// Derived stats under `pair`; `None` when the pair is not supported
    pub fn stats_for(&self, pair: &AmmoModePair) -> Option<WeaponStats> {
        let mode = if self.modes.is_empty() {
            if pair.mode_id != NONE_MODE && pair.mode_id != BASE_MODE {
                return None;
            }
            None
        } else {
            Some(self.modes.iter().find(|m| m.id == pair.mode_id)?)
        };

        let ammo = if self.ammo.is_empty() {
            if !pair.ammo_id.is_empty() {
                return None;
            }
            None
        } else {
            Some(self.ammo.iter().find(|a| a.id == pair.ammo_id)?)
        };

        let mut stats = WeaponStats {
            damage_per_shot: self.damage_per_shot,
            shots_when_fired: self.shots_when_fired,
            heat: self.heat,
            min_range: self.min_range,
            max_range: self.max_range,
            accuracy: self.accuracy,
            artillery: self.artillery,
            uses_internal_ammo: false,
        };

        if let Some(mode) = mode {
            stats.damage_per_shot += mode.damage_per_shot;
            stats.shots_when_fired = mode.shots_when_fired;
            stats.heat += mode.heat;
            if let Some(min_range) = mode.min_range {
                stats.min_range = min_range;
            }
            stats.accuracy += mode.accuracy;
            stats.artillery |= mode.artillery;
        }

        if let Some(ammo) = ammo {
            stats.damage_per_shot += ammo.damage_per_shot;
            stats.heat += ammo.heat;
            stats.uses_internal_ammo = ammo.internal;
        }

        Some(stats)
    }

    /// Common weapon: energy weapon, no ammunition, single mode
    pub fn laser(id: impl Into<String>) -> Self {
        Self::new(id, 25.0, 10.0, 270.0).melee_capable()
    }

    /// Common weapon: autocannon with a rapid-fire mode
    pub fn autocannon(id: impl Into<String>) -> Self {
        Self::new(id, 20.0, 6.0, 450.0)
            .with_mode(FiringMode::base("AC_STD", 1))
            .with_mode(FiringMode::new("AC_RAPID", 2).with_heat(6.0).with_accuracy(-0.1))
            .with_ammo(AmmoDef::new("AC_BALL", 20))
    }

    /// Common weapon: missile rack with a minimum range
    pub fn missile_rack(id: impl Into<String>) -> Self {
        Self::new(id, 4.0, 8.0, 630.0)
            .with_min_range(180.0)
            .with_mode(FiringMode::base("LRM_STD", 10))
            .with_ammo(AmmoDef::new("LRM_AMMO", 120))
    }
}

/// A mounted weapon instance with its live ammo-mode and ammunition state
#[derive(Debug, Clone)]
pub struct Weapon {
    pub id: WeaponId,
    pub def: Arc<WeaponDef>,
    current: AmmoModePair,
    ammo_remaining: AHashMap<String, u32>,
    /// Destroyed or disabled weapons cannot fire
    pub functional: bool,
}

impl Weapon {
    pub fn new(id: WeaponId, def: Arc<WeaponDef>) -> Self {
        let current = def.default_ammo_mode();
        let ammo_remaining = def
            .ammo
            .iter()
            .map(|a| (a.id.clone(), a.capacity))
            .collect();
        Self {
            id,
            def,
            current,
            ammo_remaining,
            functional: true,
        }
    }

    pub fn name(&self) -> &str {
        if self.def.name.is_empty() {
            &self.def.id
        } else {
            &self.def.name
        }
    }

    pub fn current_ammo_mode(&self) -> &AmmoModePair {
        &self.current
    }

    /// Switch the live weapon to `pair`; returns false for unsupported pairs
    pub fn apply_ammo_mode(&mut self, pair: &AmmoModePair) -> bool {
        if self.def.stats_for(pair).is_none() {
            return false;
        }
        self.current = pair.clone();
        true
    }

    /// Rounds left for an ammunition id; `None` for weapons without ammunition
    pub fn remaining_ammo(&self, ammo_id: &str) -> Option<u32> {
        if ammo_id.is_empty() {
            return None;
        }
        Some(self.ammo_remaining.get(ammo_id).copied().unwrap_or(0))
    }

    pub fn set_remaining_ammo(&mut self, ammo_id: &str, rounds: u32) {
        self.ammo_remaining.insert(ammo_id.to_string(), rounds);
    }

    /// Ammo-mode pairs the weapon can fire right now
    pub fn usable_ammo_modes(&self) -> Vec<AmmoModePair> {
        self.def
            .available_ammo_modes()
            .into_iter()
            .filter(|pair| self.remaining_ammo(&pair.ammo_id) != Some(0))
            .collect()
    }

    pub fn stats(&self) -> Option<WeaponStats> {
        self.def.stats_for(&self.current)
    }
}
