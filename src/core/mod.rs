pub mod config;
pub mod error;
pub mod types;

pub use config::{DecisionWeights, EngineConfig};
pub use error::{FireControlError, Result};
pub use types::{FormationId, Position, TeamId, UnitId, WeaponId};
