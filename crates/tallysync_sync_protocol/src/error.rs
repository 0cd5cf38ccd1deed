//! Error types for the sync protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding a request envelope.
///
/// Any of these rejects the whole request before a single operation is
/// processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The body is not valid JSON.
    #[error("malformed json: {0}")]
    MalformedJson(String),

    /// The push body is not a list of operations.
    #[error("push body must be a list of operations")]
    NotAList,

    /// The batch holds more operations than allowed.
    #[error("batch of {len} operations exceeds the limit of {max}")]
    BatchTooLarge {
        /// Submitted operation count.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// One operation envelope is malformed.
    #[error("operation {index}: {reason}")]
    InvalidOperation {
        /// Position of the operation in the batch.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// The pull watermark is not a timestamp with offset.
    #[error("invalid since: {0}")]
    InvalidSince(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedJson(err.to_string())
    }
}

impl ProtocolError {
    pub(crate) fn operation(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            index,
            reason: reason.into(),
        }
    }
}
