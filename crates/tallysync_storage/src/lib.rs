//! # TallySync Storage
//!
//! The transactional relational store used by the sync engine.
//!
//! Every read and write is scoped by tenant. Writes happen inside
//! [`SyncStore::transaction`]: when the closure returns an error, nothing it
//! wrote becomes visible.
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For tests and ephemeral servers
//! - [`SqliteStore`] - Persistent storage in a single SQLite file
//!
//! ## Example
//!
//! ```rust
//! use tallysync_storage::{transact, MemoryStore, SyncStore};
//! use tallysync_core::{EntityKind, TenantId};
//! use uuid::Uuid;
//!
//! let store = MemoryStore::new();
//! let tenant = TenantId::generate();
//! let found = transact(&store, |tx| {
//!     tx.find_entity(tenant, EntityKind::Customers, Uuid::new_v4(), true)
//! })
//! .unwrap();
//! assert!(found.is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod migrations;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use migrations::CURRENT_VERSION as SCHEMA_VERSION;
pub use sqlite::SqliteStore;
pub use store::{transact, EntityCounts, StoreTx, SyncStore};
