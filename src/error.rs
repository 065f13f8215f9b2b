//! Error types for the impulse engine

use thiserror::Error;

/// Errors reportable by the engine and its event readers.
///
/// The engine favors silent correction over failure: numeric inputs are
/// clamped, never rejected. The only runtime condition it reports is a
/// stopped engine, which callers treat as "state frozen at the last
/// snapshot" rather than a fault.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not running")]
    NotRunning,

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse interaction event: {0}")]
    ParseError(String),
}
