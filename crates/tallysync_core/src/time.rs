//! Timestamp parsing, formatting and serde helpers.
//!
//! All instants are stored in UTC at millisecond precision and serialized
//! as RFC 3339 with three fractional digits (`2025-01-01T00:00:00.000Z`).

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Returns the earliest representable instant, used as the default pull watermark.
pub fn earliest() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

/// Drops sub-millisecond precision.
pub fn truncate_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(3)
}

/// Formats an instant as RFC 3339 UTC with milliseconds.
pub fn format(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp that carries an explicit offset.
pub fn parse_with_offset(raw: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| truncate_millis(dt.with_timezone(&Utc)))
        .map_err(|_| CoreError::invalid_value(format!("invalid timestamp `{raw}`")))
}

/// Parses a payload timestamp.
///
/// Accepts RFC 3339 with offset, a naive date-time (taken as UTC) or a bare
/// date (UTC midnight).
pub fn parse_lenient(raw: &str) -> CoreResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(truncate_millis(dt.with_timezone(&Utc)));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(truncate_millis(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(CoreError::invalid_value(format!("invalid date `{raw}`")))
}

/// Converts epoch milliseconds back to an instant.
pub fn from_millis(millis: i64) -> CoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| CoreError::invalid_value(format!("timestamp out of range: {millis}")))
}

/// Serde adapter for `DateTime<Utc>` fields.
pub mod millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as RFC 3339 with milliseconds.
    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(instant))
    }

    /// Deserializes an RFC 3339 string with offset.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_with_offset(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` fields.
pub mod option_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as RFC 3339 with milliseconds, or `null`.
    pub fn serialize<S: Serializer>(
        instant: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match instant {
            Some(instant) => serializer.serialize_str(&super::format(instant)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional RFC 3339 string with offset.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|raw| super::parse_with_offset(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_always_has_millis() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format(&t), "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn offset_is_normalized_to_utc() {
        let t = parse_with_offset("2025-01-01T02:00:00+02:00").unwrap();
        assert_eq!(format(&t), "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn offset_is_required_for_strict_parse() {
        assert!(parse_with_offset("2025-01-01T00:00:00").is_err());
        assert!(parse_with_offset("yesterday").is_err());
    }

    #[test]
    fn lenient_accepts_dates_and_naive_times() {
        assert_eq!(
            parse_lenient("2024-03-05").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_lenient("2024-03-05T10:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap()
        );
        assert!(parse_lenient("2024-13-45").is_err());
    }

    #[test]
    fn sub_millisecond_precision_dropped() {
        let t = parse_with_offset("2025-01-01T00:00:00.123456Z").unwrap();
        assert_eq!(format(&t), "2025-01-01T00:00:00.123Z");
    }

    #[test]
    fn millis_roundtrip() {
        let t = parse_with_offset("2025-06-30T12:00:00.250Z").unwrap();
        assert_eq!(from_millis(t.timestamp_millis()).unwrap(), t);
        assert_eq!(from_millis(earliest().timestamp_millis()).unwrap(), earliest());
    }
}
