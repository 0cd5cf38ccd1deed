//! Entity dispatch table.
//!
//! Maps every [`EntityKind`] to an [`EntityHandler`] that validates payloads
//! and applies create-or-update and soft-delete to the rows of that kind.
//! Adding a kind is one [`DispatchTable::register`] call.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tallysync_core::{
    schema_for, CoreResult, EntityKind, EntityRecord, KindSchema, TenantId, ValidatedPayload,
};
use tallysync_storage::{StorageResult, StoreTx};
use uuid::Uuid;

/// Who is writing, from which device, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMeta {
    /// Tenant that owns the row.
    pub tenant: TenantId,
    /// Identity recorded as last writer.
    pub actor: String,
    /// Device recorded as last writer.
    pub device_id: String,
    /// Server time of the write.
    pub now: DateTime<Utc>,
}

/// Result of a create-or-update.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    /// The row as stored.
    pub record: EntityRecord,
    /// True when the row did not exist before.
    pub created: bool,
}

/// Validation and mutation logic for one entity kind.
pub trait EntityHandler: Send + Sync {
    /// Kind handled.
    fn kind(&self) -> EntityKind;

    /// Validates and coerces an upsert payload.
    fn validate(&self, payload: Option<&Value>) -> CoreResult<ValidatedPayload>;

    /// Looks up a row, tombstoned rows included.
    fn find(&self, tx: &dyn StoreTx, tenant: TenantId, id: Uuid)
        -> StorageResult<Option<EntityRecord>>;

    /// Creates the row or overwrites it, clearing any tombstone.
    fn upsert(
        &self,
        tx: &mut dyn StoreTx,
        meta: &WriteMeta,
        id: Uuid,
        payload: &ValidatedPayload,
    ) -> StorageResult<Upserted>;

    /// Tombstones the row; `None` when it does not exist.
    fn soft_delete(
        &self,
        tx: &mut dyn StoreTx,
        meta: &WriteMeta,
        id: Uuid,
    ) -> StorageResult<Option<EntityRecord>>;
}

/// Handler driven by the kind's payload schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaHandler {
    schema: &'static KindSchema,
}

impl SchemaHandler {
    /// Creates the handler of a kind from its registered schema.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            schema: schema_for(kind),
        }
    }

    /// Creates a handler for a custom schema.
    pub fn with_schema(schema: &'static KindSchema) -> Self {
        Self { schema }
    }
}

impl EntityHandler for SchemaHandler {
    fn kind(&self) -> EntityKind {
        self.schema.kind
    }

    fn validate(&self, payload: Option<&Value>) -> CoreResult<ValidatedPayload> {
        self.schema.validate(payload)
    }

    fn find(
        &self,
        tx: &dyn StoreTx,
        tenant: TenantId,
        id: Uuid,
    ) -> StorageResult<Option<EntityRecord>> {
        tx.find_entity(tenant, self.schema.kind, id, true)
    }

    fn upsert(
        &self,
        tx: &mut dyn StoreTx,
        meta: &WriteMeta,
        id: Uuid,
        payload: &ValidatedPayload,
    ) -> StorageResult<Upserted> {
        let kind = self.schema.kind;
        let updated_at = payload.updated_at.unwrap_or(meta.now);

        match self.find(tx, meta.tenant, id)? {
            None => {
                let record = EntityRecord {
                    id,
                    owner_id: meta.tenant,
                    fields: payload.fields_for_insert(self.schema, meta.now),
                    created_at: payload.created_at.unwrap_or(meta.now),
                    updated_at,
                    deleted_at: None,
                    version: 1,
                    updated_by: meta.actor.clone(),
                    device_id: Some(meta.device_id.clone()),
                };
                tx.insert_entity(kind, &record)?;
                Ok(Upserted {
                    record,
                    created: true,
                })
            }
            Some(existing) => {
                let record = EntityRecord {
                    fields: payload.fields_for_update(self.schema, &existing.fields, meta.now),
                    updated_at,
                    deleted_at: None,
                    version: existing.version + 1,
                    updated_by: meta.actor.clone(),
                    device_id: Some(meta.device_id.clone()),
                    ..existing
                };
                tx.update_entity(kind, &record)?;
                Ok(Upserted {
                    record,
                    created: false,
                })
            }
        }
    }

    fn soft_delete(
        &self,
        tx: &mut dyn StoreTx,
        meta: &WriteMeta,
        id: Uuid,
    ) -> StorageResult<Option<EntityRecord>> {
        let Some(existing) = self.find(tx, meta.tenant, id)? else {
            return Ok(None);
        };
        let record = EntityRecord {
            updated_at: meta.now,
            deleted_at: Some(meta.now),
            version: existing.version + 1,
            updated_by: meta.actor.clone(),
            device_id: Some(meta.device_id.clone()),
            ..existing
        };
        tx.update_entity(self.schema.kind, &record)?;
        Ok(Some(record))
    }
}

/// Handlers keyed by kind.
pub struct DispatchTable {
    handlers: BTreeMap<EntityKind, Box<dyn EntityHandler>>,
}

impl DispatchTable {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Creates a table with a schema handler for every kind.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for kind in EntityKind::ALL {
            table.register(SchemaHandler::new(kind));
        }
        table
    }

    /// Registers a handler, replacing any previous handler of its kind.
    pub fn register(&mut self, handler: impl EntityHandler + 'static) -> &mut Self {
        self.handlers.insert(handler.kind(), Box::new(handler));
        self
    }

    /// Returns the handler of a kind.
    pub fn get(&self, kind: EntityKind) -> Option<&dyn EntityHandler> {
        self.handlers.get(&kind).map(Box::as_ref)
    }

    /// Returns the registered kinds in order.
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Returns the number of registered kinds.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use tallysync_storage::{transact, MemoryStore};

    fn meta(tenant: TenantId, now: DateTime<Utc>) -> WriteMeta {
        WriteMeta {
            tenant,
            actor: "user-1".into(),
            device_id: "pos-1".into(),
            now,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn standard_table_covers_every_kind() {
        let table = DispatchTable::standard();
        assert_eq!(table.len(), 17);
        for kind in EntityKind::ALL {
            assert_eq!(table.get(kind).map(|h| h.kind()), Some(kind));
        }
        assert!(DispatchTable::empty().get(EntityKind::Sales).is_none());
    }

    #[test]
    fn create_then_update_then_resurrect() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let handler = SchemaHandler::new(EntityKind::Products);
        let id = Uuid::new_v4();

        let created = transact(&store, |tx| {
            let payload = handler
                .validate(Some(&json!({"name": "Cable", "price": 10, "stock": 4})))
                .unwrap();
            handler.upsert(tx, &meta(tenant, t0()), id, &payload)
        })
        .unwrap();
        assert!(created.created);
        assert_eq!(created.record.version, 1);
        assert_eq!(created.record.field("stock"), Some(&json!("4.00")));
        assert_eq!(created.record.created_at, t0());

        let later = t0() + Duration::minutes(1);
        let deleted = transact(&store, |tx| {
            handler.soft_delete(tx, &meta(tenant, later), id)
        })
        .unwrap()
        .unwrap();
        assert_eq!(deleted.deleted_at, Some(later));
        assert_eq!(deleted.version, 2);

        let latest = t0() + Duration::minutes(2);
        let updated = transact(&store, |tx| {
            let payload = handler
                .validate(Some(&json!({"name": "Cable 2m", "price": "11"})))
                .unwrap();
            handler.upsert(tx, &meta(tenant, latest), id, &payload)
        })
        .unwrap();
        assert!(!updated.created);
        assert_eq!(updated.record.deleted_at, None);
        assert_eq!(updated.record.version, 3);
        assert_eq!(updated.record.created_at, t0());
        assert_eq!(updated.record.updated_at, latest);
        // stock is kept when absent from an update
        assert_eq!(updated.record.field("stock"), Some(&json!("4.00")));
        assert_eq!(updated.record.field("price"), Some(&json!("11.00")));
    }

    #[test]
    fn absent_nullable_field_is_cleared_on_update() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let handler = SchemaHandler::new(EntityKind::Customers);
        let id = Uuid::new_v4();
        for (payload, now) in [
            (json!({"name": "Acme", "phone": "555"}), t0()),
            (json!({"name": "Acme"}), t0() + Duration::seconds(1)),
        ] {
            transact(&store, |tx| {
                let payload = handler.validate(Some(&payload)).unwrap();
                handler.upsert(tx, &meta(tenant, now), id, &payload)
            })
            .unwrap();
        }
        let row = transact(&store, |tx| handler.find(tx, tenant, id))
            .unwrap()
            .unwrap();
        assert_eq!(row.field("phone"), Some(&Value::Null));
    }

    #[test]
    fn payload_instants_override_server_time() {
        let store = MemoryStore::new();
        let tenant = TenantId::generate();
        let handler = SchemaHandler::new(EntityKind::Technicians);
        let id = Uuid::new_v4();
        let record = transact(&store, |tx| {
            let payload = handler
                .validate(Some(&json!({
                    "name": "Ana",
                    "specialty": "CCTV",
                    "status": "active",
                    "createdAt": "2024-12-01T00:00:00Z",
                    "updatedAt": "2024-12-02T00:00:00Z"
                })))
                .unwrap();
            handler.upsert(tx, &meta(tenant, t0()), id, &payload)
        })
        .unwrap()
        .record;
        assert_eq!(record.created_at, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(record.updated_at, Utc.with_ymd_and_hms(2024, 12, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn delete_of_missing_row_is_noop() {
        let store = MemoryStore::new();
        let handler = SchemaHandler::new(EntityKind::Sales);
        let result = transact(&store, |tx| {
            handler.soft_delete(tx, &meta(TenantId::generate(), t0()), Uuid::new_v4())
        })
        .unwrap();
        assert!(result.is_none());
        assert_eq!(store.entity_count(), 0);
    }
}
