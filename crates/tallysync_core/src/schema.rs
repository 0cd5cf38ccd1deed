//! Per-kind payload schemas.
//!
//! A [`KindSchema`] lists the mutable fields of one entity kind together with
//! their type, whether they may be absent or null, and what happens to an
//! absent field on create and on update. Validation coerces every present
//! field to its canonical JSON form.

use crate::coerce::{coerce_bool, coerce_rate, coerce_timestamp};
use crate::error::{CoreError, CoreResult};
use crate::kind::EntityKind;
use crate::money::Money;
use crate::time;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;
use uuid::Uuid;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Type of a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// String with a character count in `min..=max`.
    Text {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
    /// Email address no longer than `max`.
    Email {
        /// Maximum length.
        max: usize,
    },
    /// Hyphenated UUID referencing another row.
    Uuid,
    /// Fixed-point amount, see [`Money`].
    Money,
    /// Boolean-ish value, see [`coerce_bool`].
    Bool,
    /// Absolute instant, see [`coerce_timestamp`].
    Timestamp,
    /// Finite number.
    Rate,
}

/// Whether a field may be absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-null.
    Required,
    /// May be absent; null is rejected.
    Optional,
    /// May be absent or null.
    Nullable,
}

/// Value used when an absent field is first stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDefault {
    /// `null`.
    Null,
    /// `"0.00"`.
    ZeroMoney,
    /// `false`.
    False,
    /// A fixed string.
    Text(&'static str),
}

impl CreateDefault {
    fn value(&self) -> Value {
        match self {
            CreateDefault::Null => Value::Null,
            CreateDefault::ZeroMoney => Value::String(Money::ZERO.to_string()),
            CreateDefault::False => Value::Bool(false),
            CreateDefault::Text(text) => Value::String((*text).to_string()),
        }
    }
}

/// Handling of an absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absent {
    /// Stored as null on create and overwritten with null on update.
    Null,
    /// Stored as the default on create, left untouched on update.
    Keep(CreateDefault),
    /// Set to the effective creation instant (payload `createdAt`, else now).
    CreatedAt,
}

/// Schema entry for one payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// camelCase field name.
    pub name: &'static str,
    /// Field type.
    pub ty: FieldType,
    /// Presence rule.
    pub presence: Presence,
    /// Absence rule.
    pub absent: Absent,
}

impl FieldSpec {
    /// A required field.
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            presence: Presence::Required,
            absent: Absent::Null,
        }
    }

    /// A field that may be absent but not null.
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            presence: Presence::Optional,
            absent: Absent::Null,
        }
    }

    /// A field that may be absent or null.
    pub const fn nullable(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            presence: Presence::Nullable,
            absent: Absent::Null,
        }
    }

    /// Keeps the stored value when the field is absent from an update.
    pub const fn keep(mut self, default: CreateDefault) -> Self {
        self.absent = Absent::Keep(default);
        self
    }

    /// Defaults the field to the effective creation instant.
    pub const fn defaults_to_created_at(mut self) -> Self {
        self.absent = Absent::CreatedAt;
        self
    }

    /// A null on a kept field with a non-null default means "absent".
    fn null_means_absent(&self) -> bool {
        matches!(self.absent, Absent::Keep(default) if default != CreateDefault::Null)
            || self.absent == Absent::CreatedAt
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match self.ty {
            FieldType::Text { min, max } => {
                let text = value.as_str().ok_or("must be a string")?;
                let len = text.chars().count();
                if len < min {
                    return Err(format!("must be at least {min} characters"));
                }
                if len > max {
                    return Err(format!("must be at most {max} characters"));
                }
                Ok(Value::String(text.to_string()))
            }
            FieldType::Email { max } => {
                let text = value.as_str().ok_or("must be a string")?;
                if text.chars().count() > max {
                    return Err(format!("must be at most {max} characters"));
                }
                if !EMAIL.as_ref().is_some_and(|re| re.is_match(text)) {
                    return Err("must be a valid email address".into());
                }
                Ok(Value::String(text.to_string()))
            }
            FieldType::Uuid => {
                let text = value.as_str().ok_or("must be a string")?;
                let id = Uuid::parse_str(text)
                    .ok()
                    .filter(|_| text.len() == 36)
                    .ok_or("must be a UUID")?;
                Ok(Value::String(id.to_string()))
            }
            FieldType::Money => Money::from_json(value)
                .map(|money| Value::String(money.to_string()))
                .map_err(|e| e.to_string()),
            FieldType::Bool => coerce_bool(value).map(Value::Bool).map_err(|e| e.to_string()),
            FieldType::Timestamp => coerce_timestamp(value)
                .map(|t| Value::String(time::format(&t)))
                .map_err(|e| e.to_string()),
            FieldType::Rate => coerce_rate(value)
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| "must be a number".to_string()),
        }
    }
}

/// Payload schema of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct KindSchema {
    /// Kind this schema belongs to.
    pub kind: EntityKind,
    /// Mutable fields.
    pub fields: &'static [FieldSpec],
    /// Whether the payload may carry `createdAt` to set the creation instant.
    pub accepts_created_at: bool,
    /// Whether the payload may carry `updatedAt` to set the modification instant.
    pub accepts_updated_at: bool,
}

impl KindSchema {
    /// Validates and coerces a payload.
    ///
    /// Unknown keys are ignored.
    pub fn validate(&self, payload: Option<&Value>) -> CoreResult<ValidatedPayload> {
        let object = match payload {
            None | Some(Value::Null) => return Err(self.error("payload", "is required")),
            Some(Value::Object(object)) => object,
            Some(_) => return Err(self.error("payload", "must be an object")),
        };

        let mut values = Map::new();
        for spec in self.fields {
            match object.get(spec.name) {
                None => {
                    if spec.presence == Presence::Required {
                        return Err(self.error(spec.name, "is required"));
                    }
                }
                Some(Value::Null) => match spec.presence {
                    Presence::Required => return Err(self.error(spec.name, "is required")),
                    Presence::Optional => return Err(self.error(spec.name, "must not be null")),
                    Presence::Nullable if spec.null_means_absent() => {}
                    Presence::Nullable => {
                        values.insert(spec.name.to_string(), Value::Null);
                    }
                },
                Some(value) => {
                    let coerced = spec
                        .coerce(value)
                        .map_err(|reason| self.error(spec.name, &reason))?;
                    values.insert(spec.name.to_string(), coerced);
                }
            }
        }

        let created_at = self.instant(object, "createdAt", self.accepts_created_at)?;
        let updated_at = self.instant(object, "updatedAt", self.accepts_updated_at)?;

        Ok(ValidatedPayload {
            kind: self.kind,
            values,
            created_at,
            updated_at,
        })
    }

    /// Returns the spec of a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    fn instant(
        &self,
        object: &Map<String, Value>,
        name: &str,
        accepted: bool,
    ) -> CoreResult<Option<DateTime<Utc>>> {
        match object.get(name) {
            Some(value) if accepted => coerce_timestamp(value)
                .map(Some)
                .map_err(|e| self.error(name, &e.to_string())),
            _ => Ok(None),
        }
    }

    fn error(&self, field: &str, reason: &str) -> CoreError {
        CoreError::Validation {
            kind: self.kind,
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A payload that passed its kind schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayload {
    /// Kind the payload was validated against.
    pub kind: EntityKind,
    /// Present fields in canonical form (null where explicitly nulled).
    pub values: Map<String, Value>,
    /// Client-supplied creation instant, when the kind accepts one.
    pub created_at: Option<DateTime<Utc>>,
    /// Client-supplied modification instant, when the kind accepts one.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ValidatedPayload {
    /// Returns a present field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Builds the full field map of a new row.
    pub fn fields_for_insert(&self, schema: &KindSchema, now: DateTime<Utc>) -> Map<String, Value> {
        self.materialize(schema, None, now)
    }

    /// Builds the full field map of an existing row being overwritten.
    pub fn fields_for_update(
        &self,
        schema: &KindSchema,
        existing: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Map<String, Value> {
        self.materialize(schema, Some(existing), now)
    }

    fn materialize(
        &self,
        schema: &KindSchema,
        existing: Option<&Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> Map<String, Value> {
        let mut fields = Map::new();
        for spec in schema.fields {
            let value = match (self.values.get(spec.name), spec.absent) {
                (Some(value), _) => value.clone(),
                (None, Absent::Null) => Value::Null,
                (None, Absent::Keep(default)) => existing
                    .and_then(|row| row.get(spec.name))
                    .cloned()
                    .unwrap_or_else(|| default.value()),
                (None, Absent::CreatedAt) => {
                    Value::String(time::format(&self.created_at.unwrap_or(now)))
                }
            };
            fields.insert(spec.name.to_string(), value);
        }
        fields
    }
}
