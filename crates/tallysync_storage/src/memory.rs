//! In-memory store for tests.

use crate::error::{StorageError, StorageResult};
use crate::store::{sort_for_pull, EntityCounts, StoreTx, SyncStore};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use tallysync_core::{EntityKind, EntityRecord, OperationRecord, TenantId};
use uuid::Uuid;

type EntityKey = (TenantId, EntityKind, Uuid);
type OpKey = (TenantId, Uuid);

#[derive(Debug, Default)]
struct Tables {
    entities: HashMap<EntityKey, EntityRecord>,
    ops: HashMap<OpKey, (u64, OperationRecord)>,
    next_seq: u64,
}

/// A store that keeps everything in memory.
///
/// Transactions are serialized by a write lock. Writes are staged and
/// applied to the tables only when the transaction commits.
///
/// # Example
///
/// ```rust
/// use tallysync_storage::{MemoryStore, SyncStore};
/// use tallysync_core::{EntityKind, TenantId};
///
/// let store = MemoryStore::new();
/// let counts = store.counts(TenantId::generate(), EntityKind::Sales).unwrap();
/// assert_eq!(counts.live, 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: Mutex<HashSet<EntityKind>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write of `kind` fail with `Unavailable`.
    ///
    /// Useful for exercising store failure paths.
    pub fn fail_writes(&self, kind: EntityKind) {
        self.failing.lock().insert(kind);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    /// Returns the number of stored rows across all tenants and kinds.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.tables.read().entities.len()
    }
}

struct MemoryTx<'a> {
    tables: &'a Tables,
    failing: &'a HashSet<EntityKind>,
    entities: HashMap<EntityKey, EntityRecord>,
    ops: Vec<OperationRecord>,
}

impl MemoryTx<'_> {
    fn entity(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.entities
            .get(key)
            .or_else(|| self.tables.entities.get(key))
    }

    fn check_writable(&self, kind: EntityKind) -> StorageResult<()> {
        if self.failing.contains(&kind) {
            return Err(StorageError::Unavailable(format!("writes to {kind} are failing")));
        }
        Ok(())
    }
}

impl StoreTx for MemoryTx<'_> {
    fn find_entity(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        id: Uuid,
        include_deleted: bool,
    ) -> StorageResult<Option<EntityRecord>> {
        Ok(self
            .entity(&(tenant, kind, id))
            .filter(|record| include_deleted || !record.is_deleted())
            .cloned())
    }

    fn insert_entity(&mut self, kind: EntityKind, record: &EntityRecord) -> StorageResult<()> {
        self.check_writable(kind)?;
        let key = (record.owner_id, kind, record.id);
        if self.entity(&key).is_some() {
            return Err(StorageError::DuplicateEntity {
                kind,
                id: record.id,
            });
        }
        self.entities.insert(key, record.clone());
        Ok(())
    }

    fn update_entity(&mut self, kind: EntityKind, record: &EntityRecord) -> StorageResult<()> {
        self.check_writable(kind)?;
        let key = (record.owner_id, kind, record.id);
        if self.entity(&key).is_none() {
            return Err(StorageError::NotFound {
                kind,
                id: record.id,
            });
        }
        self.entities.insert(key, record.clone());
        Ok(())
    }

    fn find_op(&self, tenant: TenantId, op_id: Uuid) -> StorageResult<Option<OperationRecord>> {
        let staged = self
            .ops
            .iter()
            .find(|entry| entry.tenant == tenant && entry.op_id == op_id);
        Ok(staged
            .or_else(|| self.tables.ops.get(&(tenant, op_id)).map(|(_, entry)| entry))
            .cloned())
    }

    fn insert_op(&mut self, entry: &OperationRecord) -> StorageResult<()> {
        if self.find_op(entry.tenant, entry.op_id)?.is_some() {
            return Err(StorageError::DuplicateOp {
                tenant: entry.tenant,
                op_id: entry.op_id,
            });
        }
        self.ops.push(entry.clone());
        Ok(())
    }
}

impl SyncStore for MemoryStore {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn StoreTx) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write();
        let failing = self.failing.lock().clone();
        let (entities, ops) = {
            let mut tx = MemoryTx {
                tables: &tables,
                failing: &failing,
                entities: HashMap::new(),
                ops: Vec::new(),
            };
            f(&mut tx)?;
            (tx.entities, tx.ops)
        };

        tables.entities.extend(entities);
        for entry in ops {
            let seq = tables.next_seq;
            tables.next_seq += 1;
            tables.ops.insert((entry.tenant, entry.op_id), (seq, entry));
        }
        Ok(())
    }

    fn changed_since(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<EntityRecord>> {
        let tables = self.tables.read();
        let mut rows: Vec<EntityRecord> = tables
            .entities
            .iter()
            .filter(|((t, k, _), record)| *t == tenant && *k == kind && record.changed_after(since))
            .map(|(_, record)| record.clone())
            .collect();
        sort_for_pull(&mut rows);
        Ok(rows)
    }

    fn ledger(&self, tenant: TenantId) -> StorageResult<Vec<OperationRecord>> {
        let tables = self.tables.read();
        let mut entries: Vec<&(u64, OperationRecord)> = tables
            .ops
            .values()
            .filter(|(_, entry)| entry.tenant == tenant)
            .collect();
        entries.sort_by(|a, b| {
            a.1.processed_at
                .cmp(&b.1.processed_at)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(entries.into_iter().map(|(_, entry)| entry.clone()).collect())
    }

    fn counts(&self, tenant: TenantId, kind: EntityKind) -> StorageResult<EntityCounts> {
        let tables = self.tables.read();
        let mut counts = EntityCounts::default();
        for ((t, k, _), record) in &tables.entities {
            if *t != tenant || *k != kind {
                continue;
            }
            if record.is_deleted() {
                counts.deleted += 1;
            } else {
                counts.live += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::transact;
    use chrono::{Duration, TimeZone};
    use serde_json::{json, Map};
    use tallysync_core::{OpStatus, OpType};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(tenant: TenantId, id: Uuid, updated_at: DateTime<Utc>) -> EntityRecord {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Acme"));
        EntityRecord {
            id,
            owner_id: tenant,
            fields,
            created_at: updated_at,
            updated_at,
            deleted_at: None,
            version: 1,
            updated_by: "actor".into(),
            device_id: Some("dev".into()),
        }
    }

    fn entry(tenant: TenantId, op_id: Uuid, processed_at: DateTime<Utc>) -> OperationRecord {
        OperationRecord {
            op_id,
            tenant,
            entity: EntityKind::Customers,
            entity_id: Uuid::new_v4(),
            op_type: OpType::Upsert,
            client_updated_at: processed_at,
            device_id: "dev".into(),
            status: OpStatus::Ok,
            processed_at,
        }
    }

    #[test]
    fn memory_failed_transaction_leaves_no_trace() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let id = Uuid::new_v4();

        let result = store.transaction(&mut |tx| {
            tx.insert_entity(EntityKind::Customers, &record(tenant, id, t0()))?;
            Err(StorageError::Unavailable("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn memory_staged_writes_visible_inside_transaction() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let id = Uuid::new_v4();
        let op_id = Uuid::new_v4();

        transact(&store, |tx| {
            tx.insert_entity(EntityKind::Customers, &record(tenant, id, t0()))?;
            assert!(tx.find_entity(tenant, EntityKind::Customers, id, false)?.is_some());
            tx.insert_op(&entry(tenant, op_id, t0()))?;
            assert!(tx.find_op(tenant, op_id)?.is_some());
            Ok(())
        })
        .unwrap();
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn memory_duplicate_keys_rejected() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let id = Uuid::new_v4();
        let op_id = Uuid::new_v4();

        transact(&store, |tx| {
            tx.insert_entity(EntityKind::Sales, &record(tenant, id, t0()))?;
            tx.insert_op(&entry(tenant, op_id, t0()))
        })
        .unwrap();

        let dup_row = transact(&store, |tx| {
            tx.insert_entity(EntityKind::Sales, &record(tenant, id, t0()))
        });
        assert!(matches!(dup_row, Err(StorageError::DuplicateEntity { .. })));

        let dup_op = transact(&store, |tx| tx.insert_op(&entry(tenant, op_id, t0())));
        assert!(matches!(dup_op, Err(StorageError::DuplicateOp { .. })));
    }

    #[test]
    fn memory_update_requires_existing_row() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let result = transact(&store, |tx| {
            tx.update_entity(EntityKind::Quotes, &record(tenant, Uuid::new_v4(), t0()))
        });
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn memory_injected_failures() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        store.fail_writes(EntityKind::Products);

        let failed = transact(&store, |tx| {
            tx.insert_entity(EntityKind::Products, &record(tenant, Uuid::new_v4(), t0()))
        });
        assert!(matches!(failed, Err(StorageError::Unavailable(_))));

        store.heal();
        transact(&store, |tx| {
            tx.insert_entity(EntityKind::Products, &record(tenant, Uuid::new_v4(), t0()))
        })
        .unwrap();
    }

    #[test]
    fn memory_changed_since_orders_and_filters() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let late = record(tenant, Uuid::new_v4(), t0() + Duration::seconds(2));
        let early = record(tenant, Uuid::new_v4(), t0() + Duration::seconds(1));
        let mut deleted = record(tenant, Uuid::new_v4(), t0() - Duration::seconds(10));
        deleted.deleted_at = Some(t0() + Duration::seconds(3));

        transact(&store, |tx| {
            tx.insert_entity(EntityKind::Customers, &late)?;
            tx.insert_entity(EntityKind::Customers, &early)?;
            tx.insert_entity(EntityKind::Customers, &deleted)
        })
        .unwrap();

        let rows = store
            .changed_since(tenant, EntityKind::Customers, t0())
            .unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![deleted.id, early.id, late.id]);

        let rows = store
            .changed_since(tenant, EntityKind::Customers, t0() + Duration::seconds(3))
            .unwrap();
        assert!(rows.is_empty());

        let counts = store.counts(tenant, EntityKind::Customers).unwrap();
        assert_eq!(counts, EntityCounts { live: 2, deleted: 1 });
    }

    #[test]
    fn memory_ledger_in_processing_order() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        transact(&store, |tx| tx.insert_op(&entry(tenant, second, t0() + Duration::seconds(1))))
            .unwrap();
        transact(&store, |tx| tx.insert_op(&entry(tenant, first, t0()))).unwrap();
        transact(&store, |tx| {
            tx.insert_op(&entry(TenantId::generate(), Uuid::new_v4(), t0()))
        })
        .unwrap();

        let ledger = store.ledger(tenant).unwrap();
        let ids: Vec<Uuid> = ledger.iter().map(|e| e.op_id).collect();
        assert_eq!(ids, vec![first, second]);
    }
}
