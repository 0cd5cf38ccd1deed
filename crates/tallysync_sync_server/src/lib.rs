//! # TallySync Sync Server
//!
//! The synchronization engine: idempotent, conflict-aware push and pull for
//! occasionally-connected devices of many tenants.
//!
//! This crate provides:
//! - [`PushHandler`]: applies a batch strictly in order, one transaction per
//!   operation, and always answers with one result per operation
//! - [`PullHandler`]: per-kind deltas after a watermark, queried in parallel
//! - [`IdempotencyLedger`]: exact replay detection keyed by `(tenant, opId)`
//! - [`ConflictResolver`]: last-writer-wins on client timestamps, with an
//!   opt-in version check
//! - [`DispatchTable`]: validation, create-or-update and soft-delete per kind
//! - [`SyncServer`]: the facade wiring a store, clock and audit sink together
//!
//! # Protocol
//!
//! 1. A device pushes its offline mutations as an ordered batch
//! 2. Replays of ledgered operations answer `OK` with the current live row untouched
//! 3. Mutations older than the stored row are answered with `CONFLICT` and
//!    the server row, for client-side merge
//! 4. The device pulls every row changed since its last `serverTime`,
//!    tombstones included

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod audit;
mod clock;
mod config;
mod conflict;
mod context;
mod dispatch;
mod error;
mod ledger;
mod pull;
mod push;
mod server;

pub use audit::{AuditAction, AuditEvent, AuditSink, MemoryAuditSink, NoopAuditSink, TracingAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ServerConfig, DEFAULT_CONFLICT_MESSAGE, ENV_MAX_PUSH_BATCH, ENV_PULL_CONCURRENCY};
pub use conflict::{ClaimedChange, ConflictResolver, LastWriteWins, Resolution, VersionChecked};
pub use context::SyncContext;
pub use dispatch::{DispatchTable, EntityHandler, SchemaHandler, Upserted, WriteMeta};
pub use error::{ServerError, ServerResult};
pub use ledger::IdempotencyLedger;
pub use pull::PullHandler;
pub use push::{PushHandler, STORE_ERROR_MESSAGE};
pub use server::SyncServer;
