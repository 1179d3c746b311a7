//! Engine error types

use crate::storage::StorageError;

/// Errors surfaced by the scheduling engine
///
/// Absence of a record is never an error: lookups return `Ok(None)` and
/// reviews start from the default state.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The caller supplied a quality or response time that could not be parsed
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),
    /// Scheduler configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The backing store failed; passed through unmodified
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub fn is_invalid_observation(&self) -> bool {
        matches!(self, EngineError::InvalidObservation(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;
