//! Push handler.
//!
//! Applies a batch strictly in order, one operation at a time. Each
//! operation runs in its own store transaction covering the ledger lookup,
//! the conflict check, the mutation and the ledger write:
//!
//! ```text
//! RECEIVED -> REPLAY_CHECK -> hit:  OK (current live row)
//!                          -> miss: CONFLICT_CHECK -> server newer: CONFLICT (ledgered)
//!                                   -> VALIDATE -> invalid: ERROR
//!                                   -> APPLY -> LEDGER_WRITE -> commit -> AUDIT -> OK
//! ```
//!
//! The write instant is read from the clock once the transaction holds the
//! store, so every committed row is stamped later than any pull `serverTime`
//! read before the commit became visible.
//!
//! A store failure anywhere rolls the transaction back and yields `ERROR`
//! with a generic message; nothing is ledgered, so the client may retry.

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::conflict::{ClaimedChange, ConflictResolver, Resolution};
use crate::context::SyncContext;
use crate::dispatch::{DispatchTable, EntityHandler, WriteMeta};
use crate::ledger::IdempotencyLedger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tallysync_core::{EntityRecord, OpStatus, OpType};
use tallysync_storage::{transact, StoreTx, StorageResult, SyncStore};
use tallysync_sync_protocol::{PushOperation, PushResult};
use tracing::{debug, error, info, warn};

/// Message of `ERROR` results caused by the store.
pub const STORE_ERROR_MESSAGE: &str = "internal error while applying operation";

enum Outcome {
    Replayed(Option<EntityRecord>),
    Invalid(String),
    Conflict(Option<EntityRecord>),
    Applied {
        record: Option<EntityRecord>,
        action: Option<AuditAction>,
        device_id: String,
        at: DateTime<Utc>,
    },
}

/// Applies push batches.
pub struct PushHandler {
    store: Arc<dyn SyncStore>,
    dispatch: Arc<DispatchTable>,
    resolver: Arc<dyn ConflictResolver>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: ServerConfig,
}

impl PushHandler {
    /// Creates a push handler.
    pub fn new(
        store: Arc<dyn SyncStore>,
        dispatch: Arc<DispatchTable>,
        resolver: Arc<dyn ConflictResolver>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            dispatch,
            resolver,
            audit,
            clock,
            config,
        }
    }

    /// Applies a batch and returns one result per operation, in order.
    ///
    /// Never fails as a whole: every failure is reported in its own entry.
    pub fn apply_batch(&self, ctx: &SyncContext, operations: &[PushOperation]) -> Vec<PushResult> {
        let span = tracing::info_span!("sync_push", tenant = %ctx.tenant, ops = operations.len());
        let _guard = span.enter();

        let mut results = Vec::with_capacity(operations.len());
        for op in operations {
            results.push(self.apply_one(ctx, op));
        }

        let failed = results.iter().filter(|r| r.status == OpStatus::Error).count();
        let conflicts = results
            .iter()
            .filter(|r| r.status == OpStatus::Conflict)
            .count();
        info!(
            applied = results.len() - failed - conflicts,
            conflicts, failed, "push batch processed"
        );
        results
    }

    /// Applies a single operation.
    pub fn apply_one(&self, ctx: &SyncContext, op: &PushOperation) -> PushResult {
        let Some(handler) = self.dispatch.get(op.entity) else {
            warn!(entity = %op.entity, op_id = %op.op_id, "no handler registered");
            return PushResult::error(op.op_id, format!("unsupported entity: {}", op.entity));
        };

        let outcome = transact(self.store.as_ref(), |tx| self.run(tx, handler, ctx, op));

        match outcome {
            Ok(Outcome::Replayed(current)) => {
                debug!(op_id = %op.op_id, "replayed ledgered operation");
                PushResult::ok(op.op_id, current)
            }
            Ok(Outcome::Invalid(message)) => {
                debug!(op_id = %op.op_id, entity = %op.entity, %message, "rejected payload");
                PushResult::error(op.op_id, message)
            }
            Ok(Outcome::Conflict(current)) => {
                warn!(
                    op_id = %op.op_id,
                    entity = %op.entity,
                    entity_id = %op.entity_id,
                    "server has newer data"
                );
                PushResult::conflict(op.op_id, current, &self.config.conflict_message)
            }
            Ok(Outcome::Applied {
                record,
                action,
                device_id,
                at,
            }) => {
                if let (Some(action), Some(row)) = (action, record.as_ref()) {
                    self.audit.notify(AuditEvent {
                        tenant: ctx.tenant,
                        entity: op.entity,
                        entity_id: row.id,
                        action,
                        actor_id: ctx.actor.clone(),
                        device_id: Some(device_id),
                        at,
                    });
                }
                debug!(op_id = %op.op_id, entity = %op.entity, entity_id = %op.entity_id, "applied");
                PushResult::ok(op.op_id, record)
            }
            Err(err) => {
                error!(
                    op_id = %op.op_id,
                    entity = %op.entity,
                    entity_id = %op.entity_id,
                    error = %err,
                    "store failure while applying operation"
                );
                PushResult::error(op.op_id, STORE_ERROR_MESSAGE)
            }
        }
    }

    fn run(
        &self,
        tx: &mut dyn StoreTx,
        handler: &dyn EntityHandler,
        ctx: &SyncContext,
        op: &PushOperation,
    ) -> StorageResult<Outcome> {
        let meta = WriteMeta {
            tenant: ctx.tenant,
            actor: ctx.actor.clone(),
            device_id: op.device_id.as_str().to_string(),
            now: self.clock.now(),
        };

        if let Some(entry) = IdempotencyLedger::lookup(tx, meta.tenant, op.op_id)? {
            let current = tx.find_entity(meta.tenant, entry.entity, entry.entity_id, false)?;
            return Ok(Outcome::Replayed(current));
        }

        let current = handler.find(tx, meta.tenant, op.entity_id)?;
        let claim = ClaimedChange {
            client_updated_at: op.client_updated_at,
            base_version: op.base_version,
        };
        if self.resolver.resolve(current.as_ref(), &claim) == Resolution::ServerWins {
            IdempotencyLedger::record(tx, meta.tenant, op, OpStatus::Conflict, meta.now)?;
            return Ok(Outcome::Conflict(current));
        }

        let payload = match op.op_type {
            OpType::Upsert => match handler.validate(op.payload.as_ref()) {
                Ok(payload) => Some(payload),
                Err(err) => return Ok(Outcome::Invalid(err.to_string())),
            },
            OpType::Delete => None,
        };

        let outcome = match payload {
            Some(payload) => {
                let upserted = handler.upsert(tx, &meta, op.entity_id, &payload)?;
                Outcome::Applied {
                    record: Some(upserted.record),
                    action: Some(AuditAction::SyncUpsert),
                    device_id: meta.device_id.clone(),
                    at: meta.now,
                }
            }
            None => {
                let deleted = handler.soft_delete(tx, &meta, op.entity_id)?;
                let action = deleted.as_ref().map(|_| AuditAction::SyncDelete);
                Outcome::Applied {
                    record: deleted,
                    action,
                    device_id: meta.device_id.clone(),
                    at: meta.now,
                }
            }
        };

        IdempotencyLedger::record(tx, meta.tenant, op, OpStatus::Ok, meta.now)?;
        Ok(outcome)
    }
}

impl std::fmt::Debug for PushHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushHandler")
            .field("dispatch", &self.dispatch)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
