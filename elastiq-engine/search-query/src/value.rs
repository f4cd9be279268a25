use std::convert::TryFrom;
use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::de::{Deserialize, Deserializer, Visitor};
use serde_json::{Number, Value as JsonValue};
use uuid::Uuid;

use crate::error::QueryError;
use crate::schema::{EnumRepr, FieldKind};

/// A value carried by a predicate.
///
/// Values deserialized from JSON only ever produce the untyped variants
/// (`Null`, `Bool`, numbers and `Text`), the remaining variants exist
/// for callers building predicates directly. Either way the value is
/// coerced against the declared type of the property it is compared to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,

    /// A boolean flag.
    Bool(bool),

    /// A signed 64 bit integer.
    I64(i64),

    /// A unsigned 64 bit integer.
    U64(u64),

    /// A 64 bit floating point number.
    F64(f64),

    /// A text value.
    Text(String),

    /// A unique identifier, rendered in its hyphenated form.
    Identifier(Uuid),

    /// A UTC timestamp.
    Datetime(DateTime<Utc>),

    /// An enum member referenced by name.
    Enum(String),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The name of the runtime kind of this value.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I64(_) | Self::U64(_) => "integer",
            Self::F64(_) => "float",
            Self::Text(_) => "text",
            Self::Identifier(_) => "identifier",
            Self::Datetime(_) => "datetime",
            Self::Enum(_) => "enum",
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Self::Null => String::from("null"),
            Self::Bool(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::U64(v) => v.to_string(),
            Self::F64(v) => v.to_string(),
            Self::Text(v) => v.clone(),
            Self::Identifier(v) => v.to_string(),
            Self::Datetime(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Self::Enum(v) => v.clone(),
        }
    }

    /// Converts the value into the form the backend indexes for a field
    /// of the given kind.
    pub(crate) fn to_term(
        &self,
        kind: &FieldKind,
        property: &str,
    ) -> Result<JsonValue, QueryError> {
        let mismatch = || {
            QueryError::invalid_value(
                property,
                format!("a {} value cannot be compared to a {} field", self.kind_name(), kind),
            )
        };

        let term = match kind {
            FieldKind::Text => match self {
                Self::Null | Self::Bool(_) => return Err(mismatch()),
                other => JsonValue::String(other.as_string()),
            },
            FieldKind::Identifier => match self {
                Self::Identifier(id) => JsonValue::String(id.to_string()),
                Self::Text(raw) => {
                    let id = Uuid::parse_str(raw).map_err(|e| {
                        QueryError::invalid_value(property, format!("invalid identifier: {}", e))
                    })?;
                    JsonValue::String(id.to_string())
                },
                _ => return Err(mismatch()),
            },
            FieldKind::Numeric => match self {
                Self::I64(v) => JsonValue::from(*v),
                Self::U64(v) => JsonValue::from(*v),
                Self::F64(v) => Number::from_f64(*v).map(JsonValue::Number).ok_or_else(|| {
                    QueryError::invalid_value(property, "non-finite numbers cannot be queried")
                })?,
                _ => return Err(mismatch()),
            },
            FieldKind::Boolean => match self {
                Self::Bool(v) => JsonValue::Bool(*v),
                _ => return Err(mismatch()),
            },
            FieldKind::Datetime => {
                let dt = self.as_datetime(property)?;
                JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            },
            FieldKind::Enum { repr, members } => {
                let (name, value) = match self {
                    Self::Enum(name) | Self::Text(name) => members
                        .get_key_value(name.as_str())
                        .map(|(name, value)| (name.clone(), *value)),
                    Self::I64(v) => members
                        .iter()
                        .find(|(_, value)| **value == *v)
                        .map(|(name, value)| (name.clone(), *value)),
                    Self::U64(v) => members
                        .iter()
                        .find(|(_, value)| **value >= 0 && **value as u64 == *v)
                        .map(|(name, value)| (name.clone(), *value)),
                    _ => return Err(mismatch()),
                }
                .ok_or_else(|| {
                    QueryError::invalid_value(
                        property,
                        format!("{:?} is not a member of the enum", self.as_string()),
                    )
                })?;

                match repr {
                    EnumRepr::Text => JsonValue::String(name),
                    EnumRepr::Integer => JsonValue::from(value),
                }
            },
        };

        Ok(term)
    }

    fn as_datetime(&self, property: &str) -> Result<DateTime<Utc>, QueryError> {
        match self {
            Self::Datetime(dt) => Ok(*dt),
            Self::Text(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    QueryError::invalid_value(
                        property,
                        "datetime should be formatted in RFC 3339 or given as a timestamp",
                    )
                }),
            Self::I64(ts) => Utc
                .timestamp_opt(*ts, 0)
                .single()
                .ok_or_else(|| QueryError::invalid_value(property, "invalid i64 timestamp given")),
            Self::U64(ts) => i64::try_from(*ts)
                .ok()
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .ok_or_else(|| QueryError::invalid_value(property, "invalid u64 timestamp given")),
            other => Err(QueryError::invalid_value(
                property,
                format!("a {} value cannot be interpreted as a datetime", other.kind_name()),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{:?}", v),
            Self::Enum(v) => write!(f, "::{}", v),
            other => f.write_str(&other.as_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Identifier(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Datetime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("null, a bool, a string, int or float")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Value::I64(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Value::U64(v))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Value::F64(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Value::Text(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
                Ok(Value::Text(v))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::Result;

    use super::*;

    fn status_kind(repr: EnumRepr) -> FieldKind {
        let mut members = BTreeMap::new();
        members.insert("Draft".to_string(), 0);
        members.insert("Published".to_string(), 1);
        FieldKind::Enum { repr, members }
    }

    #[test]
    fn test_deserialize_untyped_values() -> Result<()> {
        let values: Vec<Value> =
            serde_json::from_value(serde_json::json!([null, true, -3, 7, 1.5, "abc"]))?;

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::I64(-3),
                Value::U64(7),
                Value::F64(1.5),
                Value::Text("abc".into()),
            ]
        );

        Ok(())
    }

    #[test]
    fn test_identifier_terms_are_normalised() -> Result<()> {
        let raw = "6F9619FF-8B86-D011-B42D-00C04FC964FF";
        let term = Value::from(raw).to_term(&FieldKind::Identifier, "Id")?;
        assert_eq!(term, serde_json::json!("6f9619ff-8b86-d011-b42d-00c04fc964ff"));

        let res = Value::from("not-an-id").to_term(&FieldKind::Identifier, "Id");
        assert!(res.is_err());

        Ok(())
    }

    #[test]
    fn test_datetime_terms() -> Result<()> {
        let term = Value::from("2021-03-04T05:06:07+01:00").to_term(&FieldKind::Datetime, "At")?;
        assert_eq!(term, serde_json::json!("2021-03-04T04:06:07Z"));

        let term = Value::I64(0).to_term(&FieldKind::Datetime, "At")?;
        assert_eq!(term, serde_json::json!("1970-01-01T00:00:00Z"));

        assert!(Value::Bool(true).to_term(&FieldKind::Datetime, "At").is_err());

        let term = Value::U64(86_400).to_term(&FieldKind::Datetime, "At")?;
        assert_eq!(term, serde_json::json!("1970-01-02T00:00:00Z"));
        assert!(Value::U64(u64::MAX).to_term(&FieldKind::Datetime, "At").is_err());
        assert!(Value::U64(i64::MAX as u64 + 1).to_term(&FieldKind::Datetime, "At").is_err());
        Ok(())
    }

    #[test]
    fn test_enum_representation() -> Result<()> {
        let as_int = status_kind(EnumRepr::Integer);
        let as_text = status_kind(EnumRepr::Text);

        assert_eq!(Value::Enum("Published".into()).to_term(&as_int, "Status")?, serde_json::json!(1));
        assert_eq!(Value::I64(1).to_term(&as_text, "Status")?, serde_json::json!("Published"));
        assert_eq!(Value::from("Draft").to_term(&as_text, "Status")?, serde_json::json!("Draft"));
        assert!(Value::from("Archived").to_term(&as_int, "Status").is_err());

        Ok(())
    }

    #[test]
    fn test_numeric_rejects_text_and_nan() {
        assert!(Value::from("12").to_term(&FieldKind::Numeric, "Age").is_err());
        assert!(Value::F64(f64::NAN).to_term(&FieldKind::Numeric, "Age").is_err());
    }
}
