//! Idempotency ledger.
//!
//! One entry is written per final `OK` or `CONFLICT` outcome, inside the
//! transaction that produced it. Entries are never updated or removed. An
//! `ERROR` outcome is never recorded, so the client may retry it.

use chrono::{DateTime, Utc};
use tallysync_core::{OpStatus, OperationRecord, TenantId};
use tallysync_storage::{StorageResult, StoreTx, SyncStore};
use tallysync_sync_protocol::PushOperation;
use uuid::Uuid;

/// Ledger access over a store.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdempotencyLedger;

impl IdempotencyLedger {
    /// Returns the recorded outcome of an operation, if any.
    pub fn lookup(
        tx: &dyn StoreTx,
        tenant: TenantId,
        op_id: Uuid,
    ) -> StorageResult<Option<OperationRecord>> {
        tx.find_op(tenant, op_id)
    }

    /// Records the final outcome of an operation.
    pub fn record(
        tx: &mut dyn StoreTx,
        tenant: TenantId,
        op: &PushOperation,
        status: OpStatus,
        processed_at: DateTime<Utc>,
    ) -> StorageResult<OperationRecord> {
        let entry = OperationRecord {
            op_id: op.op_id,
            tenant,
            entity: op.entity,
            entity_id: op.entity_id,
            op_type: op.op_type,
            client_updated_at: op.client_updated_at,
            device_id: op.device_id.as_str().to_string(),
            status,
            processed_at,
        };
        tx.insert_op(&entry)?;
        Ok(entry)
    }

    /// Lists the entries of a tenant in processing order.
    pub fn list(store: &dyn SyncStore, tenant: TenantId) -> StorageResult<Vec<OperationRecord>> {
        store.ledger(tenant)
    }
}
