//! Error types for storage operations.

use tallysync_core::{EntityKind, TenantId};
use thiserror::Error;
use uuid::Uuid;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite engine reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored field map could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A ledger entry with this key already exists.
    #[error("operation {op_id} already recorded for tenant {tenant}")]
    DuplicateOp {
        /// Tenant of the entry.
        tenant: TenantId,
        /// Operation id of the entry.
        op_id: Uuid,
    },

    /// A row with this key already exists.
    #[error("{kind} row {id} already exists")]
    DuplicateEntity {
        /// Kind of the row.
        kind: EntityKind,
        /// Row id.
        id: Uuid,
    },

    /// An update targeted a row that does not exist.
    #[error("{kind} row {id} not found")]
    NotFound {
        /// Kind of the row.
        kind: EntityKind,
        /// Row id.
        id: Uuid,
    },

    /// Stored data could not be decoded.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The store refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_key() {
        let err = StorageError::NotFound {
            kind: EntityKind::Sales,
            id: Uuid::nil(),
        };
        assert_eq!(
            err.to_string(),
            "sales row 00000000-0000-0000-0000-000000000000 not found"
        );
    }
}
