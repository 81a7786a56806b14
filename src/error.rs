//! Engine errors
//!
//! Only contract violations are errors. Degenerate geometry found while
//! solving (parallel lines, zero speed) is a normal "no event" result.

use thiserror::Error;

use crate::sim::BodyHandle;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown body: {0}")]
    UnknownBody(BodyHandle),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
