//! Conflict resolution.

use chrono::{DateTime, Utc};
use tallysync_core::EntityRecord;

/// What the client claims about an incoming mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimedChange {
    /// When the client says it made the change.
    pub client_updated_at: DateTime<Utc>,
    /// Row version the client last saw, if it sent one.
    pub base_version: Option<u64>,
}

/// Outcome of a conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The mutation may be applied.
    Apply,
    /// The stored row wins; the mutation is rejected.
    ServerWins,
}

/// Decides whether an incoming mutation may overwrite the stored row.
pub trait ConflictResolver: Send + Sync {
    /// Compares the stored row (tombstoned rows included) with the claim.
    fn resolve(&self, current: Option<&EntityRecord>, claim: &ClaimedChange) -> Resolution;
}

/// Last-writer-wins on client timestamps.
///
/// The stored row wins only when its effective change time is strictly
/// later than the claimed time; a tie goes to the client. Versions are
/// ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastWriteWins;

impl ConflictResolver for LastWriteWins {
    fn resolve(&self, current: Option<&EntityRecord>, claim: &ClaimedChange) -> Resolution {
        match current {
            Some(row) if row.effective_changed_at() > claim.client_updated_at => {
                Resolution::ServerWins
            }
            _ => Resolution::Apply,
        }
    }
}

/// Optimistic version check layered over another resolver.
///
/// When the client sends a `baseVersion` and a row exists, the mutation is
/// rejected unless the stored version still equals it. Operations without a
/// `baseVersion` fall through to the inner resolver only.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionChecked<R> {
    inner: R,
}

impl<R: ConflictResolver> VersionChecked<R> {
    /// Wraps a resolver.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: ConflictResolver> ConflictResolver for VersionChecked<R> {
    fn resolve(&self, current: Option<&EntityRecord>, claim: &ClaimedChange) -> Resolution {
        if let (Some(row), Some(base)) = (current, claim.base_version) {
            if row.version != base {
                return Resolution::ServerWins;
            }
        }
        self.inner.resolve(current, claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::Map;
    use tallysync_core::TenantId;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn row(updated_at: DateTime<Utc>, deleted_at: Option<DateTime<Utc>>) -> EntityRecord {
        EntityRecord {
            id: Uuid::nil(),
            owner_id: TenantId::new(Uuid::nil()),
            fields: Map::new(),
            created_at: updated_at,
            updated_at,
            deleted_at,
            version: 3,
            updated_by: "u".into(),
            device_id: None,
        }
    }

    fn claim(at: DateTime<Utc>) -> ClaimedChange {
        ClaimedChange {
            client_updated_at: at,
            base_version: None,
        }
    }

    #[test]
    fn missing_row_always_applies() {
        assert_eq!(LastWriteWins.resolve(None, &claim(t0())), Resolution::Apply);
    }

    #[test]
    fn strict_dominance_and_ties() {
        let current = row(t0(), None);
        let older = claim(t0() - Duration::milliseconds(1));
        assert_eq!(LastWriteWins.resolve(Some(&current), &older), Resolution::ServerWins);
        assert_eq!(LastWriteWins.resolve(Some(&current), &claim(t0())), Resolution::Apply);
        let newer = claim(t0() + Duration::seconds(1));
        assert_eq!(LastWriteWins.resolve(Some(&current), &newer), Resolution::Apply);
    }

    #[test]
    fn tombstone_counts_as_a_change() {
        let current = row(t0(), Some(t0() + Duration::seconds(10)));
        let between = claim(t0() + Duration::seconds(5));
        assert_eq!(LastWriteWins.resolve(Some(&current), &between), Resolution::ServerWins);
    }

    #[test]
    fn version_check_is_opt_in() {
        let resolver = VersionChecked::new(LastWriteWins);
        let current = row(t0(), None);
        let newer = t0() + Duration::seconds(1);

        assert_eq!(resolver.resolve(Some(&current), &claim(newer)), Resolution::Apply);

        let stale = ClaimedChange {
            client_updated_at: newer,
            base_version: Some(2),
        };
        assert_eq!(resolver.resolve(Some(&current), &stale), Resolution::ServerWins);

        let fresh = ClaimedChange {
            client_updated_at: newer,
            base_version: Some(3),
        };
        assert_eq!(resolver.resolve(Some(&current), &fresh), Resolution::Apply);
        assert_eq!(resolver.resolve(None, &stale), Resolution::Apply);
    }

    proptest! {
        #[test]
        fn later_claims_never_lose(offset_ms in -10_000i64..10_000, later_ms in 0i64..10_000) {
            let current = row(t0(), None);
            let at = t0() + Duration::milliseconds(offset_ms);
            if LastWriteWins.resolve(Some(&current), &claim(at)) == Resolution::Apply {
                let later = claim(at + Duration::milliseconds(later_ms));
                prop_assert_eq!(LastWriteWins.resolve(Some(&current), &later), Resolution::Apply);
            }
        }
    }
}
