//! Battle state and the fire-control AI that acts on it
//!
//! The battlefield is a read-only snapshot during a decision. Only
//! committing an order writes back, and only to weapon ammo-modes.

pub mod ai;
pub mod battlefield;
pub mod scenario;

pub use ai::{AttackDecision, AttackOrder, AttackPlanner, FireControl};
pub use battlefield::{Battlefield, Combatant, CombatantKind, Formation, HeatState};
pub use scenario::{load_scenario, parse_scenario, Scenario};
