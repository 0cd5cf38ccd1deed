//! Identifier and status types.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of the tenant (owner account) that scopes all data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Wraps an existing UUID.
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a random tenant id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a client installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device id, enforcing `1..=max_len` characters.
    pub fn parse(raw: impl Into<String>, max_len: usize) -> CoreResult<Self> {
        let raw = raw.into();
        let len = raw.chars().count();
        if len == 0 {
            return Err(CoreError::InvalidDeviceId("must not be empty".into()));
        }
        if len > max_len {
            return Err(CoreError::InvalidDeviceId(format!(
                "must be at most {max_len} characters"
            )));
        }
        Ok(Self(raw))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type of a client-submitted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpType {
    /// Create or update the entity.
    Upsert,
    /// Soft-delete the entity.
    Delete,
}

impl OpType {
    /// Returns the wire identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OpType::Upsert => "UPSERT",
            OpType::Delete => "DELETE",
        }
    }

    /// Parses a wire identifier.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "UPSERT" => Some(OpType::Upsert),
            "DELETE" => Some(OpType::Delete),
            _ => None,
        }
    }
}

/// Outcome of processing one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpStatus {
    /// Applied (or replayed).
    Ok,
    /// Rejected because the server row is strictly newer.
    Conflict,
    /// Failed; never ledgered, safe to retry.
    Error,
}

impl OpStatus {
    /// Returns the wire identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OpStatus::Ok => "OK",
            OpStatus::Conflict => "CONFLICT",
            OpStatus::Error => "ERROR",
        }
    }

    /// Parses a wire identifier.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(OpStatus::Ok),
            "CONFLICT" => Some(OpStatus::Conflict),
            "ERROR" => Some(OpStatus::Error),
            _ => None,
        }
    }
}
