use thiserror::Error;

#[derive(Error, Debug)]
pub enum FireControlError {
    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Unknown weapon definition: {0}")]
    UnknownWeaponDef(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FireControlError>;
