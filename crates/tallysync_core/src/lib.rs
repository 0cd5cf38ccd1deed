//! # TallySync Core
//!
//! Entity registry and record types shared by every TallySync crate.
//!
//! This crate provides:
//! - [`EntityKind`], the closed set of synchronizable entity kinds
//! - Typed field coercion ([`Money`], boolean-ish values, timestamps)
//! - Per-kind payload schemas ([`KindSchema`], [`schema_for`])
//! - [`EntityRecord`] (a row of any kind) and [`OperationRecord`]
//!   (an idempotency ledger entry)
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Example
//!
//! ```rust
//! use tallysync_core::{schema_for, EntityKind};
//! use serde_json::json;
//!
//! let schema = schema_for(EntityKind::Products);
//! let payload = schema
//!     .validate(Some(&json!({"name": "Cable", "price": "12.5"})))
//!     .unwrap();
//! assert_eq!(payload.get("price"), Some(&json!("12.50")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod coerce;
mod error;
mod kind;
mod money;
mod record;
mod registry;
mod schema;
pub mod time;
mod types;

pub use coerce::{coerce_bool, coerce_rate, coerce_timestamp};
pub use error::{CoreError, CoreResult};
pub use kind::EntityKind;
pub use money::Money;
pub use record::{EntityRecord, OperationRecord};
pub use registry::schema_for;
pub use schema::{Absent, CreateDefault, FieldSpec, FieldType, KindSchema, Presence, ValidatedPayload};
pub use types::{DeviceId, OpStatus, OpType, TenantId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
