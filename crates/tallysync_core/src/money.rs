//! Fixed-point money values.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A non-negative amount with exactly two decimal places.
///
/// Stored as integer hundredths so that arithmetic never rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Money(u128);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// Creates a value from hundredths (`1250` is `12.50`).
    pub const fn from_cents(cents: u128) -> Self {
        Self(cents)
    }

    /// Returns the amount in hundredths.
    pub const fn cents(&self) -> u128 {
        self.0
    }

    /// Coerces a JSON number or string.
    ///
    /// Numbers use their shortest decimal rendering, so `12.5` is accepted
    /// while `0.1 + 0.2` is not.
    pub fn from_json(value: &Value) -> CoreResult<Self> {
        match value {
            Value::Number(number) => number.to_string().parse(),
            Value::String(raw) => raw.trim().parse(),
            _ => Err(CoreError::invalid_value("expected a money amount")),
        }
    }
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(raw: &str) -> CoreResult<Self> {
        let invalid = || CoreError::invalid_value("invalid money format");
        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if raw.contains('.') && !(1..=2).contains(&fraction.len()) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u128 = whole.parse().map_err(|_| invalid())?;
        let fraction: u128 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u128>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction))
            .map(Money)
            .ok_or_else(|| CoreError::invalid_value("money amount out of range"))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Money::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!("12".parse::<Money>().unwrap().cents(), 1200);
        assert_eq!("12.5".parse::<Money>().unwrap().cents(), 1250);
        assert_eq!("12.05".parse::<Money>().unwrap().cents(), 1205);
        assert_eq!("0.00".parse::<Money>().unwrap(), Money::ZERO);
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["", ".5", "12.", "12.345", "-1", "1e3", "12,50", " 1", "abc"] {
            assert!(raw.parse::<Money>().is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn coerces_json_numbers_and_trimmed_strings() {
        assert_eq!(Money::from_json(&json!(15)).unwrap().to_string(), "15.00");
        assert_eq!(Money::from_json(&json!(15.5)).unwrap().to_string(), "15.50");
        assert_eq!(Money::from_json(&json!("  7.1 ")).unwrap().to_string(), "7.10");
        assert!(Money::from_json(&json!(-3)).is_err());
        assert!(Money::from_json(&json!(true)).is_err());
        assert!(Money::from_json(&json!(0.1 + 0.2)).is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_value(Money::from_cents(1999)).unwrap();
        assert_eq!(json, json!("19.99"));
    }

    proptest! {
        #[test]
        fn display_parses_back(cents in 0u128..10_000_000_000u128) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
        }
    }
}
