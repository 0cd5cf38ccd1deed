//! Test fixtures and server helpers.
//!
//! Every fixture builds its own store, clock and audit sink, so tests never
//! share state.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tallysync_core::{DeviceId, EntityKind, EntityRecord, OpType, TenantId};
use tallysync_storage::{MemoryStore, SqliteStore, SyncStore};
use tallysync_sync_protocol::{PullRequest, PullResponse, PushOperation, PushRequest, PushResponse};
use tallysync_sync_server::{ManualClock, MemoryAuditSink, ServerConfig, SyncContext, SyncServer};
use tempfile::TempDir;
use uuid::Uuid;

/// Instant every test clock starts at.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .expect("valid fixed instant")
}

/// Parses an RFC 3339 instant, panicking on bad input.
pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("fixture timestamp must be RFC 3339")
        .with_timezone(&Utc)
}

/// An isolated sync server for one test.
pub struct TestServer {
    /// The server under test.
    pub server: SyncServer,
    /// Clock driving every server-assigned instant.
    pub clock: Arc<ManualClock>,
    /// Audit events emitted by the server.
    pub audit: Arc<MemoryAuditSink>,
    /// In-memory store, when the server uses one.
    pub memory: Option<Arc<MemoryStore>>,
    label: &'static str,
    _temp_dir: Option<TempDir>,
}

impl TestServer {
    /// Creates a server over a fresh [`MemoryStore`].
    pub fn memory() -> Self {
        Self::memory_with_config(ServerConfig::default())
    }

    /// Creates a memory-backed server with a custom configuration.
    pub fn memory_with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut fixture = Self::build(store.clone(), config, "memory", None);
        fixture.memory = Some(store);
        fixture
    }

    /// Creates a server over a SQLite file in a temporary directory.
    pub fn sqlite() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SqliteStore::open(temp_dir.path().join("tallysync.db"))
            .expect("Failed to open SQLite store");
        Self::build(Arc::new(store), ServerConfig::default(), "sqlite", Some(temp_dir))
    }

    /// Returns one server per store implementation.
    pub fn all() -> Vec<Self> {
        vec![Self::memory(), Self::sqlite()]
    }

    fn build(
        store: Arc<dyn SyncStore>,
        config: ServerConfig,
        label: &'static str,
        temp_dir: Option<TempDir>,
    ) -> Self {
        let clock = Arc::new(
            ManualClock::new(epoch() + Duration::days(1)).with_tick(Duration::milliseconds(1)),
        );
        let audit = Arc::new(MemoryAuditSink::new());
        let server = SyncServer::new(store, config)
            .with_clock(clock.clone())
            .with_audit_sink(audit.clone());
        Self {
            server,
            clock,
            audit,
            memory: None,
            label,
            _temp_dir: temp_dir,
        }
    }

    /// Name of the backing store, for assertion messages.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns a context for a fresh tenant.
    pub fn context(&self) -> SyncContext {
        SyncContext::new(TenantId::generate(), "test-user")
    }

    /// Pushes operations, panicking if the envelope is rejected.
    pub async fn push_ops(&self, ctx: &SyncContext, ops: Vec<PushOperation>) -> PushResponse {
        self.server
            .push(ctx, PushRequest::new(ops))
            .await
            .expect("push envelope rejected")
    }

    /// Pulls changes after `since` (everything when `None`).
    pub async fn pull_since(&self, ctx: &SyncContext, since: Option<DateTime<Utc>>) -> PullResponse {
        self.server
            .pull(ctx, PullRequest { since })
            .await
            .expect("pull failed")
    }

    /// Returns the current stored row, tombstones included.
    pub async fn row(&self, ctx: &SyncContext, kind: EntityKind, id: Uuid) -> Option<EntityRecord> {
        self.pull_since(ctx, None)
            .await
            .rows(kind)
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }
}

impl std::ops::Deref for TestServer {
    type Target = SyncServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

/// Builder for [`PushOperation`] values.
#[derive(Debug, Clone)]
pub struct OpBuilder {
    op: PushOperation,
}

impl OpBuilder {
    fn new(kind: EntityKind, entity_id: Uuid, op_type: OpType) -> Self {
        Self {
            op: PushOperation {
                op_id: Uuid::new_v4(),
                entity: kind,
                entity_id,
                op_type,
                payload: None,
                client_updated_at: epoch(),
                device_id: DeviceId::parse("device-1", 200).expect("valid device id"),
                base_version: None,
            },
        }
    }

    /// Starts an upsert.
    pub fn upsert(kind: EntityKind, entity_id: Uuid) -> Self {
        Self::new(kind, entity_id, OpType::Upsert)
    }

    /// Starts a delete.
    pub fn delete(kind: EntityKind, entity_id: Uuid) -> Self {
        Self::new(kind, entity_id, OpType::Delete)
    }

    /// Sets the payload.
    pub fn payload(mut self, payload: Value) -> Self {
        self.op.payload = Some(payload);
        self
    }

    /// Uses the valid sample payload of the operation's kind.
    pub fn sample(self) -> Self {
        let kind = self.op.entity;
        self.payload(sample_payload(kind))
    }

    /// Sets the operation id.
    pub fn op_id(mut self, op_id: Uuid) -> Self {
        self.op.op_id = op_id;
        self
    }

    /// Sets the claimed time from an RFC 3339 string.
    pub fn at(self, raw: &str) -> Self {
        self.at_time(at(raw))
    }

    /// Sets the claimed time.
    pub fn at_time(mut self, instant: DateTime<Utc>) -> Self {
        self.op.client_updated_at = instant;
        self
    }

    /// Sets the device id.
    pub fn device(mut self, device: &str) -> Self {
        self.op.device_id = DeviceId::parse(device, 200).expect("valid device id");
        self
    }

    /// Sets the base version.
    pub fn base_version(mut self, version: u64) -> Self {
        self.op.base_version = Some(version);
        self
    }

    /// Finishes the operation.
    pub fn build(self) -> PushOperation {
        self.op
    }
}

/// Parent id used by sample child payloads.
pub const SAMPLE_PARENT_ID: &str = "7d0e8a1c-2b4f-4c6d-8e9f-0a1b2c3d4e5f";

/// Returns a minimal valid payload for a kind.
pub fn sample_payload(kind: EntityKind) -> Value {
    let parent = SAMPLE_PARENT_ID;
    match kind {
        EntityKind::Customers => json!({"name": "Acme"}),
        EntityKind::Products => json!({"name": "Cable", "price": "12.50"}),
        EntityKind::Sales => json!({"total": "100.00"}),
        EntityKind::SaleItems => json!({
            "saleId": parent, "name": "Cable", "qty": "1", "price": "12.50", "cost": "8.00"
        }),
        EntityKind::Quotes => json!({
            "total": "50", "currency": "DOP", "status": "draft",
            "itbisActive": true, "itbisRate": 0.18, "discountGlobal": "0"
        }),
        EntityKind::QuoteItems => json!({
            "quoteId": parent, "name": "Cable", "price": "1", "qty": "1", "discount": "0"
        }),
        EntityKind::Operations => json!({
            "code": "OP-1", "serviceType": "install", "priority": "normal", "status": "open"
        }),
        EntityKind::Technicians => json!({"name": "Ana", "specialty": "CCTV", "status": "active"}),
        EntityKind::OperationMaterials => json!({"operationId": parent, "name": "Cable"}),
        EntityKind::OperationEvidences => json!({
            "operationId": parent, "type": "photo", "filePath": "/evidence/1.jpg"
        }),
        EntityKind::OperationNotes => json!({"operationId": parent, "note": "done"}),
        EntityKind::OperationStatuses => json!({"operationId": parent, "toStatus": "closed"}),
        EntityKind::Employees => json!({"name": "Luis", "role": "technician"}),
        EntityKind::EmployeeLogins => json!({
            "employeeId": parent, "time": "2025-01-01T08:00:00Z", "success": true
        }),
        EntityKind::PayrollAdjustments => json!({
            "employeeId": parent, "periodStart": "2025-01-01", "periodEnd": "2025-01-15",
            "type": "bonus", "amount": "500"
        }),
        EntityKind::PayrollPayments => json!({
            "employeeId": parent, "periodStart": "2025-01-01", "periodEnd": "2025-01-15",
            "paidAt": "2025-01-16T10:00:00Z", "baseSalary": "1000", "commission": "0",
            "adjustments": "0", "net": "1000", "status": "paid"
        }),
        EntityKind::Punches => json!({"type": "in", "time": "2025-01-01T08:00:00Z"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallysync_core::schema_for;

    #[test]
    fn sample_payloads_are_valid() {
        for kind in EntityKind::ALL {
            let payload = sample_payload(kind);
            assert!(
                schema_for(kind).validate(Some(&payload)).is_ok(),
                "{kind} sample rejected"
            );
        }
    }

    #[test]
    fn builder_defaults() {
        let id = Uuid::new_v4();
        let op = OpBuilder::delete(EntityKind::Sales, id)
            .at("2025-02-01T00:00:00Z")
            .device("pos-9")
            .build();
        assert_eq!(op.entity_id, id);
        assert_eq!(op.op_type, OpType::Delete);
        assert_eq!(op.payload, None);
        assert_eq!(op.device_id.as_str(), "pos-9");
        assert_eq!(op.client_updated_at, at("2025-02-01T00:00:00Z"));
    }

    #[test]
    fn fixtures_are_isolated() {
        let a = TestServer::memory();
        let b = TestServer::sqlite();
        assert_eq!(a.label(), "memory");
        assert_eq!(b.label(), "sqlite");
        assert!(a.memory.is_some());
        assert!(b.memory.is_none());
    }
}
