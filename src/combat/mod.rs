//! Weapons, ammo-modes and weapon grouping

pub mod weapon_group;
pub mod weapons;

pub use weapon_group::{condense, CandidateWeapons, WeaponGroup};
pub use weapons::{AmmoDef, AmmoModePair, FiringMode, Weapon, WeaponDef, WeaponKind, WeaponStats};
