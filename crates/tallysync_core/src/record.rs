//! Entity rows and ledger entries.

use crate::kind::EntityKind;
use crate::time;
use crate::types::{OpStatus, OpType, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One stored row of any entity kind.
///
/// Serializes to the row snapshot sent to clients: the metadata columns
/// alongside the kind's own fields, all camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Row id, possibly chosen by the client.
    pub id: Uuid,
    /// Tenant that owns the row.
    pub owner_id: TenantId,
    /// Kind-specific fields in canonical form.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Creation instant.
    #[serde(with = "time::millis")]
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    #[serde(with = "time::millis")]
    pub updated_at: DateTime<Utc>,
    /// Tombstone instant; `Some` marks the row as deleted.
    #[serde(with = "time::option_millis")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Incremented on every write.
    pub version: u64,
    /// Identity of the last writer.
    pub updated_by: String,
    /// Device of the last writer.
    pub device_id: Option<String>,
}

impl EntityRecord {
    /// Returns the latest of the modification and deletion instants.
    pub fn effective_changed_at(&self) -> DateTime<Utc> {
        match self.deleted_at {
            Some(deleted_at) if deleted_at > self.updated_at => deleted_at,
            _ => self.updated_at,
        }
    }

    /// Returns true if the row is tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the row changed strictly after `since`.
    pub fn changed_after(&self, since: DateTime<Utc>) -> bool {
        self.updated_at > since || self.deleted_at.is_some_and(|deleted_at| deleted_at > since)
    }

    /// Returns a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Idempotency ledger entry. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Client-chosen operation id, unique per tenant.
    pub op_id: Uuid,
    /// Tenant the operation was submitted for.
    pub tenant: TenantId,
    /// Kind of the targeted entity.
    pub entity: EntityKind,
    /// Targeted entity id.
    pub entity_id: Uuid,
    /// Operation type.
    #[serde(rename = "type")]
    pub op_type: OpType,
    /// Timestamp the client claims for the mutation.
    #[serde(with = "time::millis")]
    pub client_updated_at: DateTime<Utc>,
    /// Submitting device.
    pub device_id: String,
    /// Final outcome.
    pub status: OpStatus,
    /// When the server recorded the outcome.
    #[serde(with = "time::millis")]
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn row() -> EntityRecord {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Acme"));
        EntityRecord {
            id: Uuid::nil(),
            owner_id: TenantId::new(Uuid::nil()),
            fields,
            created_at: t,
            updated_at: t,
            deleted_at: None,
            version: 1,
            updated_by: "user-1".into(),
            device_id: Some("dev-1".into()),
        }
    }

    #[test]
    fn effective_change_includes_tombstone() {
        let mut record = row();
        assert_eq!(record.effective_changed_at(), record.updated_at);
        let later = record.updated_at + Duration::seconds(5);
        record.deleted_at = Some(later);
        assert_eq!(record.effective_changed_at(), later);
        assert!(record.is_deleted());

        record.deleted_at = Some(record.updated_at - Duration::seconds(5));
        assert_eq!(record.effective_changed_at(), record.updated_at);
    }

    #[test]
    fn changed_after_watermark() {
        let mut record = row();
        let before = record.updated_at - Duration::milliseconds(1);
        assert!(record.changed_after(before));
        assert!(!record.changed_after(record.updated_at));

        record.deleted_at = Some(record.updated_at + Duration::seconds(1));
        assert!(record.changed_after(record.updated_at));
    }

    #[test]
    fn snapshot_shape() {
        let value = serde_json::to_value(row()).unwrap();
        assert_eq!(value["name"], json!("Acme"));
        assert_eq!(value["ownerId"], json!("00000000-0000-0000-0000-000000000000"));
        assert_eq!(value["createdAt"], json!("2025-01-01T00:00:00.000Z"));
        assert_eq!(value["deletedAt"], Value::Null);
        assert_eq!(value["version"], json!(1));
        assert_eq!(value["deviceId"], json!("dev-1"));

        let back: EntityRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, row());
    }

    #[test]
    fn ledger_entry_uses_wire_names() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entry = OperationRecord {
            op_id: Uuid::nil(),
            tenant: TenantId::new(Uuid::nil()),
            entity: EntityKind::SaleItems,
            entity_id: Uuid::nil(),
            op_type: OpType::Upsert,
            client_updated_at: t,
            device_id: "dev".into(),
            status: OpStatus::Conflict,
            processed_at: t,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["entity"], json!("sale_items"));
        assert_eq!(value["type"], json!("UPSERT"));
        assert_eq!(value["status"], json!("CONFLICT"));
    }
}
