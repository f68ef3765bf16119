use thiserror::Error;

use crate::core::types::AgentId;
use crate::entity::HealthState;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Agent not found: {0:?}")]
    UnknownAgent(AgentId),

    #[error("Agents cannot be created as {0}")]
    InvalidInitialHealth(HealthState),

    #[error("Position ({x}, {y}) lies outside the world")]
    OutsideWorld { x: f64, y: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
