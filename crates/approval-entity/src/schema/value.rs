//! Typed field values and their portable JSON form.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use approval_core::types::TargetId;

use super::field::FieldKind;

/// Field name → value, ordered by name so encodings are deterministic.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single field value of an application entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Identifier of another entity.
    Reference(TargetId),
    /// Arbitrary JSON document.
    Json(Value),
}

impl FieldValue {
    /// Whether the value is `Null`. A JSON `null` document counts as one.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Value::Null))
    }

    /// Collapse a JSON `null` document into `Null`.
    pub fn canonical(self) -> Self {
        match self {
            Self::Json(Value::Null) => Self::Null,
            other => other,
        }
    }

    /// Whether the value can be stored in a field of `kind`.
    ///
    /// `Null` is accepted here; nullability is checked by the schema.
    pub fn fits(&self, kind: &FieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _)
                | (Self::Boolean(_), FieldKind::Boolean)
                | (Self::Integer(_), FieldKind::Integer)
                | (Self::Text(_), FieldKind::Text)
                | (Self::Timestamp(_), FieldKind::Timestamp)
                | (Self::Reference(_), FieldKind::Reference { .. })
                | (Self::Json(_), FieldKind::Json)
        ) || matches!((self, kind), (Self::Float(f), FieldKind::Float) if f.is_finite())
    }

    /// Render the value in its portable JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
            Self::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Reference(id) => Value::String(id.to_string()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Read a value of `kind` from its portable JSON form.
    pub fn from_json(kind: &FieldKind, value: &Value) -> Result<Self, String> {
        if value.is_null() {
            return Ok(Self::Null);
        }
        let mismatch = || format!("expected {}, found {value}", kind.name());
        match kind {
            FieldKind::Text => value
                .as_str()
                .map(|s| Self::Text(s.to_string()))
                .ok_or_else(mismatch),
            FieldKind::Integer => value.as_i64().map(Self::Integer).ok_or_else(mismatch),
            FieldKind::Float => value.as_f64().map(Self::Float).ok_or_else(mismatch),
            FieldKind::Boolean => value.as_bool().map(Self::Boolean).ok_or_else(mismatch),
            FieldKind::Timestamp => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|ts| Self::Timestamp(ts.with_timezone(&Utc)))
                    .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
            }
            FieldKind::Reference { .. } => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                raw.parse::<TargetId>()
                    .map(Self::Reference)
                    .map_err(|e| format!("invalid reference {raw:?}: {e}"))
            }
            FieldKind::Json => Ok(Self::Json(value.clone())),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<TargetId> for FieldValue {
    fn from(id: TargetId) -> Self {
        Self::Reference(id)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_timestamp_keeps_subsecond_precision() {
        let ts = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .expect("valid timestamp");
        let value = FieldValue::Timestamp(ts);
        let back = FieldValue::from_json(&FieldKind::Timestamp, &value.to_json()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_reference_is_stored_as_id_string() {
        let id = TargetId::new();
        let kind = FieldKind::Reference {
            target: "child".to_string(),
        };
        let json = FieldValue::Reference(id).to_json();
        assert_eq!(json, Value::String(id.to_string()));
        assert_eq!(
            FieldValue::from_json(&kind, &json).unwrap(),
            FieldValue::Reference(id)
        );
    }

    #[test]
    fn test_kind_mismatch_is_reported() {
        let err = FieldValue::from_json(&FieldKind::Integer, &Value::from("seven")).unwrap_err();
        assert!(err.contains("expected integer"));
    }

    #[test]
    fn test_fits_rejects_non_finite_floats() {
        assert!(FieldValue::Float(1.5).fits(&FieldKind::Float));
        assert!(!FieldValue::Float(f64::NAN).fits(&FieldKind::Float));
        assert!(!FieldValue::Integer(1).fits(&FieldKind::Float));
        assert!(FieldValue::Null.fits(&FieldKind::Text));
    }

    #[test]
    fn test_json_null_is_null() {
        let value = FieldValue::Json(Value::Null);
        assert!(value.is_null());
        assert_eq!(value.canonical(), FieldValue::Null);
        let doc = FieldValue::Json(Value::from(1));
        assert!(!doc.is_null());
        assert_eq!(doc.clone().canonical(), doc);
    }
}
