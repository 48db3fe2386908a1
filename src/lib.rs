//! Fire Control - attack-option synthesis and selection for combat AI

pub mod battle;
pub mod combat;
pub mod core;

pub use battle::ai::{AttackDecision, AttackOrder, AttackPlanner, FireControl, Services};
pub use battle::{Battlefield, Combatant, Formation};
pub use crate::core::{EngineConfig, FireControlError, Result};
