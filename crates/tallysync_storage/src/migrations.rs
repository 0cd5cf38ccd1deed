//! Database migrations.

use crate::error::StorageResult;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version.
pub const CURRENT_VERSION: i64 = 2;

/// Runs all pending migrations.
pub(crate) fn run(conn: &mut Connection) -> StorageResult<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate(conn, 1, V1)?;
    }
    if version < 2 {
        migrate(conn, 2, V2)?;
    }

    Ok(())
}

/// Returns the applied schema version, 0 for a fresh database.
pub(crate) fn get_version(conn: &Connection) -> StorageResult<i64> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(0);
    }

    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

fn migrate(conn: &mut Connection, version: i64, sql: &str) -> StorageResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;
    tracing::info!(version, "migrated database");
    Ok(())
}

/// Version 1: entity rows.
const V1: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS entities (
    tenant TEXT NOT NULL,
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    fields TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER,
    version INTEGER NOT NULL,
    updated_by TEXT NOT NULL,
    device_id TEXT,
    PRIMARY KEY (tenant, kind, id)
);
CREATE INDEX IF NOT EXISTS idx_entities_updated ON entities(tenant, kind, updated_at);
CREATE INDEX IF NOT EXISTS idx_entities_deleted ON entities(tenant, kind, deleted_at);
";

/// Version 2: idempotency ledger.
const V2: &str = "
CREATE TABLE IF NOT EXISTS sync_ops (
    tenant TEXT NOT NULL,
    op_id TEXT NOT NULL,
    entity TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    op_type TEXT NOT NULL,
    client_updated_at INTEGER NOT NULL,
    device_id TEXT NOT NULL,
    status TEXT NOT NULL,
    processed_at INTEGER NOT NULL,
    PRIMARY KEY (tenant, op_id)
);
CREATE INDEX IF NOT EXISTS idx_sync_ops_processed ON sync_ops(tenant, processed_at);
";
