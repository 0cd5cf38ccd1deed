//! Push operations and envelope validation.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tallysync_core::{time, DeviceId, EntityKind, OpType};
use uuid::Uuid;

/// Default maximum number of operations in one push.
pub const DEFAULT_MAX_BATCH: usize = 500;

/// Default maximum `deviceId` length in characters.
pub const DEFAULT_MAX_DEVICE_ID_LEN: usize = 200;

/// Limits enforced while decoding a push envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeLimits {
    /// Maximum number of operations.
    pub max_batch: usize,
    /// Maximum `deviceId` length.
    pub max_device_id_len: usize,
}

impl Default for EnvelopeLimits {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
            max_device_id_len: DEFAULT_MAX_DEVICE_ID_LEN,
        }
    }
}

/// One client-submitted mutation.
///
/// The envelope is validated on decode; the payload is only checked
/// against its kind schema when the operation is processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOperation {
    /// Client-chosen id, unique per tenant.
    pub op_id: Uuid,
    /// Targeted kind.
    pub entity: EntityKind,
    /// Targeted row id.
    pub entity_id: Uuid,
    /// Upsert or delete.
    #[serde(rename = "type")]
    pub op_type: OpType,
    /// Kind fields for an upsert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// When the client made the change.
    #[serde(with = "time::millis")]
    pub client_updated_at: DateTime<Utc>,
    /// Submitting device.
    pub device_id: DeviceId,
    /// Row version the client last saw, when it tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperation {
    op_id: String,
    entity: String,
    entity_id: String,
    #[serde(rename = "type")]
    op_type: String,
    #[serde(default)]
    payload: Option<Value>,
    client_updated_at: String,
    device_id: String,
    #[serde(default)]
    base_version: Option<u64>,
}

fn strict_uuid(raw: &str, field: &str) -> Result<Uuid, String> {
    if raw.len() != 36 {
        return Err(format!("`{field}` must be a UUID"));
    }
    Uuid::parse_str(raw).map_err(|_| format!("`{field}` must be a UUID"))
}

impl PushOperation {
    /// Decodes and validates one operation envelope.
    pub fn from_value(value: Value, limits: &EnvelopeLimits) -> Result<Self, String> {
        if !value.is_object() {
            return Err("must be an object".into());
        }
        let raw: RawOperation = serde_json::from_value(value).map_err(|e| e.to_string())?;

        let entity = raw
            .entity
            .parse::<EntityKind>()
            .map_err(|e| e.to_string())?;
        let op_type = OpType::from_str_opt(&raw.op_type)
            .ok_or_else(|| format!("`type` must be UPSERT or DELETE, got `{}`", raw.op_type))?;
        let client_updated_at = time::parse_with_offset(&raw.client_updated_at)
            .map_err(|_| "`clientUpdatedAt` must be a timestamp with offset".to_string())?;
        let device_id = DeviceId::parse(raw.device_id, limits.max_device_id_len)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            op_id: strict_uuid(&raw.op_id, "opId")?,
            entity,
            entity_id: strict_uuid(&raw.entity_id, "entityId")?,
            op_type,
            payload: raw.payload,
            client_updated_at,
            device_id,
            base_version: raw.base_version,
        })
    }
}

/// An ordered batch of operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRequest {
    /// Operations in submission order.
    pub operations: Vec<PushOperation>,
}

impl PushRequest {
    /// Wraps already-validated operations.
    pub fn new(operations: Vec<PushOperation>) -> Self {
        Self { operations }
    }

    /// Decodes a JSON body.
    ///
    /// # Errors
    ///
    /// Any malformed operation rejects the whole request.
    pub fn from_json(body: &str, limits: &EnvelopeLimits) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value, limits)
    }

    /// Decodes an already-parsed JSON body.
    pub fn from_value(value: Value, limits: &EnvelopeLimits) -> ProtocolResult<Self> {
        let Value::Array(items) = value else {
            return Err(ProtocolError::NotAList);
        };
        if items.len() > limits.max_batch {
            return Err(ProtocolError::BatchTooLarge {
                len: items.len(),
                max: limits.max_batch,
            });
        }

        let operations = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                PushOperation::from_value(item, limits)
                    .map_err(|reason| ProtocolError::operation(index, reason))
            })
            .collect::<ProtocolResult<Vec<_>>>()?;
        Ok(Self { operations })
    }

    /// Checks an in-process request against the limits.
    pub fn check(&self, limits: &EnvelopeLimits) -> ProtocolResult<()> {
        if self.operations.len() > limits.max_batch {
            return Err(ProtocolError::BatchTooLarge {
                len: self.operations.len(),
                max: limits.max_batch,
            });
        }
        for (index, op) in self.operations.iter().enumerate() {
            DeviceId::parse(op.device_id.as_str(), limits.max_device_id_len)
                .map_err(|e| ProtocolError::operation(index, e.to_string()))?;
        }
        Ok(())
    }
}
