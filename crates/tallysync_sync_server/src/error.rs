//! Error types for the sync server.

use tallysync_core::CoreError;
use tallysync_storage::StorageError;
use tallysync_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that fail a whole request.
///
/// Per-operation failures never surface here; they become `ERROR` entries
/// in the push response.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request envelope is malformed.
    #[error("invalid request: {0}")]
    Protocol(#[from] ProtocolError),

    /// Domain data could not be interpreted.
    #[error("invalid data: {0}")]
    Core(#[from] CoreError),

    /// The store failed outside of per-operation processing.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::Protocol(_) | ServerError::Core(_))
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Storage(_) | ServerError::InvalidConfig(_) | ServerError::Internal(_)
        )
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        let envelope = ServerError::from(ProtocolError::NotAList);
        assert!(envelope.is_client_error());
        assert!(!envelope.is_server_error());

        let store = ServerError::from(StorageError::Unavailable("down".into()));
        assert!(store.is_server_error());
        assert!(!store.is_client_error());
    }

    #[test]
    fn error_display() {
        let err = ServerError::from(ProtocolError::BatchTooLarge { len: 600, max: 500 });
        let msg = err.to_string();
        assert!(msg.contains("600"));
        assert!(msg.contains("500"));
    }
}
