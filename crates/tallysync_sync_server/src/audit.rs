//! Audit notifications.
//!
//! Applied mutations are reported to an [`AuditSink`] after their
//! transaction commits. Sinks are fire-and-forget: they cannot fail the
//! operation that triggered them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tallysync_core::{time, EntityKind, TenantId};
use uuid::Uuid;

/// Kind of audited mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Administrative create.
    Create,
    /// Administrative update.
    Update,
    /// Administrative delete.
    Delete,
    /// Create or update applied by a sync push.
    SyncUpsert,
    /// Tombstone applied by a sync push.
    SyncDelete,
}

impl AuditAction {
    /// Returns the wire identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::SyncUpsert => "SYNC_UPSERT",
            AuditAction::SyncDelete => "SYNC_DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Tenant the row belongs to.
    pub tenant: TenantId,
    /// Kind of the row.
    pub entity: EntityKind,
    /// Row id.
    pub entity_id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// Identity that caused the mutation.
    pub actor_id: String,
    /// Device that submitted the mutation.
    pub device_id: Option<String>,
    /// When the mutation was applied.
    #[serde(with = "time::millis")]
    pub at: DateTime<Utc>,
}

/// Receiver of audit events.
pub trait AuditSink: Send + Sync {
    /// Records an event.
    fn notify(&self, event: AuditEvent);
}

/// Emits audit events as `tracing` events on target `tallysync::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn notify(&self, event: AuditEvent) {
        tracing::info!(
            target: "tallysync::audit",
            tenant = %event.tenant,
            entity = %event.entity,
            entity_id = %event.entity_id,
            action = %event.action,
            actor = %event.actor_id,
            device = event.device_id.as_deref().unwrap_or("-"),
            "audit"
        );
    }
}

/// Keeps audit events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn notify(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn notify(&self, _event: AuditEvent) {}
}
