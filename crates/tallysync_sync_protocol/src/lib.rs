//! # TallySync Sync Protocol
//!
//! Wire messages exchanged by sync clients and the server.
//!
//! This crate provides:
//! - [`PushOperation`] and [`PushRequest`], with envelope validation
//! - [`PushResult`] and [`PushResponse`], aligned with the request
//! - [`PullRequest`] and [`PullResponse`]
//!
//! Messages are JSON. This is a pure protocol crate with no I/O operations.
//!
//! ## Example
//!
//! ```rust
//! use tallysync_sync_protocol::{EnvelopeLimits, PushRequest};
//!
//! let body = r#"[{
//!     "opId": "6f1c2a52-5c1e-4f7e-9a39-0d6f5a8e2b11",
//!     "entity": "customers",
//!     "entityId": "0b6e4f36-3f0b-4a8e-b4a4-9d5d1c7e8f20",
//!     "type": "UPSERT",
//!     "payload": {"name": "Acme"},
//!     "clientUpdatedAt": "2025-01-01T00:00:00Z",
//!     "deviceId": "pos-1"
//! }]"#;
//! let request = PushRequest::from_json(body, &EnvelopeLimits::default()).unwrap();
//! assert_eq!(request.operations.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;
mod operation;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{PullRequest, PullResponse, PushResponse, PushResult};
pub use operation::{EnvelopeLimits, PushOperation, PushRequest};
