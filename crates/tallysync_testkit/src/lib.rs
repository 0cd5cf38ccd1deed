//! # TallySync Testkit
//!
//! Test utilities for TallySync.
//!
//! This crate provides:
//! - [`TestServer`]: an isolated server per test with a manual clock and a
//!   recording audit sink, over a memory or SQLite store
//! - [`OpBuilder`]: terse construction of push operations
//! - Sample payloads for every entity kind
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tallysync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_customer() {
//!     let server = TestServer::memory();
//!     let ctx = server.context();
//!     let op = OpBuilder::upsert(EntityKind::Customers, Uuid::new_v4())
//!         .payload(json!({"name": "Acme"}))
//!         .build();
//!     let response = server.push_ops(&ctx, vec![op]).await;
//!     assert_eq!(response.statuses(), vec![OpStatus::Ok]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use serde_json::json;
    pub use tallysync_core::{EntityKind, OpStatus, OpType, TenantId};
    pub use tallysync_sync_protocol::{PullRequest, PushRequest};
    pub use tallysync_sync_server::SyncContext;
    pub use uuid::Uuid;
}

pub use fixtures::*;
pub use generators::*;
