//! Push results and pull messages.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tallysync_core::{time, EntityKind, EntityRecord, OpStatus};
use uuid::Uuid;

/// Outcome of one pushed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    /// Operation id, echoed from the request.
    pub op_id: Uuid,
    /// Outcome.
    pub status: OpStatus,
    /// Current row after the operation.
    ///
    /// `Some(None)` serializes as `null` (a delete of a missing row);
    /// `None` omits the field.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub server_entity: Option<Option<EntityRecord>>,
    /// Human readable detail for conflicts and errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<EntityRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<EntityRecord>::deserialize(deserializer).map(Some)
}

impl PushResult {
    /// An applied (or replayed) operation.
    pub fn ok(op_id: Uuid, entity: Option<EntityRecord>) -> Self {
        Self {
            op_id,
            status: OpStatus::Ok,
            server_entity: Some(entity),
            message: None,
        }
    }

    /// An operation rejected because the server row is newer.
    pub fn conflict(op_id: Uuid, entity: Option<EntityRecord>, message: impl Into<String>) -> Self {
        Self {
            op_id,
            status: OpStatus::Conflict,
            server_entity: Some(entity),
            message: Some(message.into()),
        }
    }

    /// A failed operation.
    pub fn error(op_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            op_id,
            status: OpStatus::Error,
            server_entity: None,
            message: Some(message.into()),
        }
    }

    /// Returns the row snapshot, if one is attached.
    pub fn entity(&self) -> Option<&EntityRecord> {
        self.server_entity.as_ref().and_then(Option::as_ref)
    }
}

/// Results of a push, aligned by position with the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    /// One entry per submitted operation.
    pub results: Vec<PushResult>,
}

impl PushResponse {
    /// Returns the statuses in order.
    pub fn statuses(&self) -> Vec<OpStatus> {
        self.results.iter().map(|r| r.status).collect()
    }
}

/// A request for rows changed after a watermark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullRequest {
    /// Watermark; `None` pulls everything.
    pub since: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Pulls everything.
    pub fn full() -> Self {
        Self { since: None }
    }

    /// Pulls rows changed after `since`.
    pub fn since(since: DateTime<Utc>) -> Self {
        Self { since: Some(since) }
    }

    /// Decodes the `since` query parameter; absent or empty means "everything".
    pub fn from_query(since: Option<&str>) -> ProtocolResult<Self> {
        match since.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => Ok(Self::full()),
            Some(raw) => time::parse_with_offset(raw)
                .map(Self::since)
                .map_err(|_| ProtocolError::InvalidSince(raw.to_string())),
        }
    }

    /// Returns the watermark, defaulting to the earliest instant.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.since.unwrap_or_else(time::earliest)
    }
}

/// Rows changed after a watermark, for every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Server time taken before the queries ran; the client's next watermark.
    #[serde(with = "time::millis")]
    pub server_time: DateTime<Utc>,
    /// Changed rows per kind, ordered by `updatedAt`, keyed on the wire by
    /// collection name.
    #[serde(with = "collections")]
    pub changes: BTreeMap<EntityKind, Vec<EntityRecord>>,
}

impl PullResponse {
    /// Creates a response with an empty list for every kind.
    pub fn new(server_time: DateTime<Utc>) -> Self {
        Self {
            server_time,
            changes: EntityKind::ALL.iter().map(|kind| (*kind, Vec::new())).collect(),
        }
    }

    /// Returns the changed rows of one kind.
    pub fn rows(&self, kind: EntityKind) -> &[EntityRecord] {
        self.changes.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the number of rows across all kinds.
    pub fn total(&self) -> usize {
        self.changes.values().map(Vec::len).sum()
    }
}

/// Keys a per-kind map by collection name.
mod collections {
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;
    use tallysync_core::{EntityKind, EntityRecord};

    pub fn serialize<S: Serializer>(
        changes: &BTreeMap<EntityKind, Vec<EntityRecord>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(changes.len()))?;
        for (kind, rows) in changes {
            map.serialize_entry(kind.collection_name(), rows)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<EntityKind, Vec<EntityRecord>>, D::Error> {
        BTreeMap::<String, Vec<EntityRecord>>::deserialize(deserializer)?
            .into_iter()
            .map(|(name, rows)| {
                EntityKind::from_collection_name(&name)
                    .map(|kind| (kind, rows))
                    .ok_or_else(|| D::Error::custom(format!("unknown collection: {name}")))
            })
            .collect()
    }
}
