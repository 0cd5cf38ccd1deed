//! Error types for TallySync core.

use crate::kind::EntityKind;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while validating or coercing entity data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A payload failed the schema of its entity kind.
    #[error("invalid {kind} payload: field `{field}` {reason}")]
    Validation {
        /// Entity kind whose schema rejected the payload.
        kind: EntityKind,
        /// Offending field (`payload` when the payload itself is malformed).
        field: String,
        /// Human readable rule that was violated.
        reason: String,
    },

    /// A single value could not be coerced to its field type.
    #[error("{0}")]
    InvalidValue(String),

    /// An entity kind identifier is not one of the supported kinds.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// A device identifier is empty or too long.
    #[error("invalid device id: {0}")]
    InvalidDeviceId(String),
}

impl CoreError {
    /// Creates an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Returns true if this error was raised by schema validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation { .. } | CoreError::InvalidValue(_))
    }
}
