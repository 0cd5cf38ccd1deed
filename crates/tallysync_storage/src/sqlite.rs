//! SQLite-backed store.

use crate::error::{StorageError, StorageResult};
use crate::migrations;
use crate::store::{EntityCounts, StoreTx, SyncStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tallysync_core::{time, EntityKind, EntityRecord, OpStatus, OpType, OperationRecord, TenantId};
use uuid::Uuid;

const ENTITY_COLUMNS: &str =
    "id, tenant, fields, created_at, updated_at, deleted_at, version, updated_by, device_id";

const OP_COLUMNS: &str = "op_id, tenant, entity, entity_id, op_type, client_updated_at, \
                          device_id, status, processed_at";

/// A store backed by one SQLite database.
///
/// All kinds share one `entities` table keyed by `(tenant, kind, id)`; the
/// kind fields are kept as a JSON object. Instants are stored as epoch
/// milliseconds.
///
/// The connection is guarded by a mutex, so statements from concurrent
/// requests run one at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> StorageResult<i64> {
        migrations::get_version(&self.conn.lock())
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

struct RawEntity {
    id: String,
    tenant: String,
    fields: String,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
    version: i64,
    updated_by: String,
    device_id: Option<String>,
}

impl RawEntity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant: row.get(1)?,
            fields: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            deleted_at: row.get(5)?,
            version: row.get(6)?,
            updated_by: row.get(7)?,
            device_id: row.get(8)?,
        })
    }

    fn decode(self) -> StorageResult<EntityRecord> {
        let fields: Map<String, Value> = serde_json::from_str(&self.fields)?;
        Ok(EntityRecord {
            id: parse_uuid(&self.id)?,
            owner_id: TenantId::new(parse_uuid(&self.tenant)?),
            fields,
            created_at: instant(self.created_at)?,
            updated_at: instant(self.updated_at)?,
            deleted_at: self.deleted_at.map(instant).transpose()?,
            version: u64::try_from(self.version)
                .map_err(|_| StorageError::corrupted(format!("negative version {}", self.version)))?,
            updated_by: self.updated_by,
            device_id: self.device_id,
        })
    }
}

struct RawOp {
    op_id: String,
    tenant: String,
    entity: String,
    entity_id: String,
    op_type: String,
    client_updated_at: i64,
    device_id: String,
    status: String,
    processed_at: i64,
}

impl RawOp {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            op_id: row.get(0)?,
            tenant: row.get(1)?,
            entity: row.get(2)?,
            entity_id: row.get(3)?,
            op_type: row.get(4)?,
            client_updated_at: row.get(5)?,
            device_id: row.get(6)?,
            status: row.get(7)?,
            processed_at: row.get(8)?,
        })
    }

    fn decode(self) -> StorageResult<OperationRecord> {
        Ok(OperationRecord {
            op_id: parse_uuid(&self.op_id)?,
            tenant: TenantId::new(parse_uuid(&self.tenant)?),
            entity: EntityKind::from_str(&self.entity)
                .map_err(|e| StorageError::corrupted(e.to_string()))?,
            entity_id: parse_uuid(&self.entity_id)?,
            op_type: OpType::from_str_opt(&self.op_type)
                .ok_or_else(|| StorageError::corrupted(format!("unknown op type {}", self.op_type)))?,
            client_updated_at: instant(self.client_updated_at)?,
            device_id: self.device_id,
            status: OpStatus::from_str_opt(&self.status)
                .ok_or_else(|| StorageError::corrupted(format!("unknown status {}", self.status)))?,
            processed_at: instant(self.processed_at)?,
        })
    }
}

fn parse_uuid(raw: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| StorageError::corrupted(format!("invalid uuid {raw}")))
}

fn instant(millis: i64) -> StorageResult<DateTime<Utc>> {
    time::from_millis(millis).map_err(|e| StorageError::corrupted(e.to_string()))
}

fn version_column(record: &EntityRecord) -> StorageResult<i64> {
    i64::try_from(record.version)
        .map_err(|_| StorageError::corrupted(format!("version {} out of range", record.version)))
}

fn count(value: i64) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| StorageError::corrupted(format!("negative count {value}")))
}

struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl StoreTx for SqliteTx<'_> {
    fn find_entity(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        id: Uuid,
        include_deleted: bool,
    ) -> StorageResult<Option<EntityRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities WHERE tenant = ?1 AND kind = ?2 AND id = ?3"
                ),
                params![tenant.to_string(), kind.as_str(), id.to_string()],
                RawEntity::from_row,
            )
            .optional()?;
        Ok(raw
            .map(RawEntity::decode)
            .transpose()?
            .filter(|record| include_deleted || !record.is_deleted()))
    }

    fn insert_entity(&mut self, kind: EntityKind, record: &EntityRecord) -> StorageResult<()> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO entities (kind, {ENTITY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                kind.as_str(),
                record.id.to_string(),
                record.owner_id.to_string(),
                serde_json::to_string(&record.fields)?,
                record.created_at.timestamp_millis(),
                record.updated_at.timestamp_millis(),
                record.deleted_at.map(|t| t.timestamp_millis()),
                version_column(record)?,
                record.updated_by,
                record.device_id,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateEntity {
                    kind,
                    id: record.id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_entity(&mut self, kind: EntityKind, record: &EntityRecord) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE entities SET fields = ?4, created_at = ?5, updated_at = ?6, deleted_at = ?7, \
             version = ?8, updated_by = ?9, device_id = ?10 \
             WHERE tenant = ?1 AND kind = ?2 AND id = ?3",
            params![
                record.owner_id.to_string(),
                kind.as_str(),
                record.id.to_string(),
                serde_json::to_string(&record.fields)?,
                record.created_at.timestamp_millis(),
                record.updated_at.timestamp_millis(),
                record.deleted_at.map(|t| t.timestamp_millis()),
                version_column(record)?,
                record.updated_by,
                record.device_id,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                kind,
                id: record.id,
            });
        }
        Ok(())
    }

    fn find_op(&self, tenant: TenantId, op_id: Uuid) -> StorageResult<Option<OperationRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {OP_COLUMNS} FROM sync_ops WHERE tenant = ?1 AND op_id = ?2"),
                params![tenant.to_string(), op_id.to_string()],
                RawOp::from_row,
            )
            .optional()?
            .map(RawOp::decode)
            .transpose()
    }

    fn insert_op(&mut self, entry: &OperationRecord) -> StorageResult<()> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO sync_ops ({OP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                entry.op_id.to_string(),
                entry.tenant.to_string(),
                entry.entity.as_str(),
                entry.entity_id.to_string(),
                entry.op_type.as_str(),
                entry.client_updated_at.timestamp_millis(),
                entry.device_id,
                entry.status.as_str(),
                entry.processed_at.timestamp_millis(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateOp {
                    tenant: entry.tenant,
                    op_id: entry.op_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl SyncStore for SqliteStore {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn StoreTx) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut store_tx = SqliteTx { conn: &tx };
            f(&mut store_tx)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn changed_since(
        &self,
        tenant: TenantId,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<EntityRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE tenant = ?1 AND kind = ?2 \
               AND (updated_at > ?3 OR (deleted_at IS NOT NULL AND deleted_at > ?3)) \
             ORDER BY updated_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(
            params![tenant.to_string(), kind.as_str(), since.timestamp_millis()],
            RawEntity::from_row,
        )?;
        let records: StorageResult<Vec<_>> = rows.map(|raw| raw?.decode()).collect();
        records
    }

    fn ledger(&self, tenant: TenantId) -> StorageResult<Vec<OperationRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {OP_COLUMNS} FROM sync_ops WHERE tenant = ?1 ORDER BY processed_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![tenant.to_string()], RawOp::from_row)?;
        let entries: StorageResult<Vec<_>> = rows.map(|raw| raw?.decode()).collect();
        entries
    }

    fn counts(&self, tenant: TenantId, kind: EntityKind) -> StorageResult<EntityCounts> {
        let conn = self.conn.lock();
        let (live, deleted): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN deleted_at IS NULL THEN 1 ELSE 0 END), 0), \
                    COALESCE(SUM(CASE WHEN deleted_at IS NULL THEN 0 ELSE 1 END), 0) \
             FROM entities WHERE tenant = ?1 AND kind = ?2",
            params![tenant.to_string(), kind.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(EntityCounts {
            live: count(live)?,
            deleted: count(deleted)?,
        })
    }
}
