//! Store traits.

use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use tallysync_core::{EntityKind, EntityRecord, OperationRecord, TenantId};
use uuid::Uuid;

/// Writes and reads available inside one transaction.
///
/// Every method is scoped by tenant: a row or ledger entry of another tenant
/// is never visible, even when ids collide.
pub trait StoreTx {
    /// Looks up a row by id.
    ///
    /// Tombstoned rows are returned only when `include_deleted` is set.
    fn find_entity(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        id: Uuid,
        include_deleted: bool,
    ) -> StorageResult<Option<EntityRecord>>;

    /// Inserts a new row owned by `record.owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` if the row already exists.
    fn insert_entity(&mut self, kind: EntityKind, record: &EntityRecord) -> StorageResult<()>;

    /// Replaces an existing row.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row does not exist.
    fn update_entity(&mut self, kind: EntityKind, record: &EntityRecord) -> StorageResult<()>;

    /// Looks up a ledger entry.
    fn find_op(&self, tenant: TenantId, op_id: Uuid) -> StorageResult<Option<OperationRecord>>;

    /// Appends a ledger entry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOp` if the `(tenant, op_id)` key is taken.
    fn insert_op(&mut self, entry: &OperationRecord) -> StorageResult<()>;
}

/// Live and tombstoned row counts of one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Rows without a tombstone.
    pub live: u64,
    /// Tombstoned rows.
    pub deleted: u64,
}

/// A transactional entity and ledger store.
///
/// Implementations must be `Send + Sync`; the server shares one store
/// between concurrent requests.
pub trait SyncStore: Send + Sync {
    /// Runs `f` in a transaction.
    ///
    /// The writes made by `f` are committed together when it returns `Ok`
    /// and discarded when it returns `Err`.
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn StoreTx) -> StorageResult<()>,
    ) -> StorageResult<()>;

    /// Returns the rows of one kind changed strictly after `since`.
    ///
    /// A row has changed when its `updated_at` or `deleted_at` is later than
    /// `since`. Rows are ordered by `updated_at`, then id.
    fn changed_since(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<EntityRecord>>;

    /// Returns the ledger of a tenant in processing order.
    fn ledger(&self, tenant: TenantId) -> StorageResult<Vec<OperationRecord>>;

    /// Counts the rows of one kind.
    fn counts(&self, tenant: TenantId, kind: EntityKind) -> StorageResult<EntityCounts>;
}

/// Runs `f` in a transaction on `store` and returns its value.
pub fn transact<S, T, F>(store: &S, mut f: F) -> StorageResult<T>
where
    S: SyncStore + ?Sized,
    F: FnMut(&mut dyn StoreTx) -> StorageResult<T>,
{
    let mut out = None;
    store.transaction(&mut |tx| {
        out = Some(f(tx)?);
        Ok(())
    })?;
    out.ok_or_else(|| crate::StorageError::Unavailable("transaction produced no value".into()))
}

/// Sorts rows into pull order.
pub(crate) fn sort_for_pull(rows: &mut [EntityRecord]) {
    rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
}
