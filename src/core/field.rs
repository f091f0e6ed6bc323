//! Field values used as filter and sort operands

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Coerce the value to a string
    ///
    /// Integral floats render without a fractional part, date-times render as
    /// RFC 3339 with millisecond precision and `Null` renders as the empty string.
    pub fn coerce_to_string(&self) -> Cow<'_, str> {
        match self {
            FieldValue::String(s) => Cow::Borrowed(s),
            FieldValue::Integer(i) => Cow::Owned(i.to_string()),
            FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Cow::Owned(format!("{}", *f as i64))
            }
            FieldValue::Float(f) => Cow::Owned(f.to_string()),
            FieldValue::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            FieldValue::Uuid(u) => Cow::Owned(u.to_string()),
            FieldValue::DateTime(dt) => {
                Cow::Owned(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Null => Cow::Borrowed(""),
        }
    }

    /// Interpret the value as an epoch-millisecond timestamp
    ///
    /// Integers are taken as epoch milliseconds, strings go through
    /// [`parse_timestamp`]. Anything else has no timestamp.
    pub fn as_timestamp_millis(&self) -> Option<i64> {
        match self {
            FieldValue::DateTime(dt) => Some(dt.timestamp_millis()),
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Float(f) if f.is_finite() => Some(*f as i64),
            FieldValue::String(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a field value
    ///
    /// Arrays and objects have no scalar meaning and map to `Null`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            Value::Null | Value::Array(_) | Value::Object(_) => FieldValue::Null,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Parse a timestamp string into epoch milliseconds
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC), a bare
/// `YYYY-MM-DD` date (midnight UTC) or a plain integer of epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().timestamp_millis());
    }
    raw.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_field_value_string() {
        let value = FieldValue::String("hello".to_string());
        assert_eq!(value.as_string(), Some("hello"));
        assert_eq!(value.as_integer(), None);
        assert!(!value.is_null());
    }

    #[test]
    fn test_field_value_null() {
        let value = FieldValue::Null;
        assert!(value.is_null());
        assert_eq!(value.coerce_to_string(), "");
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(FieldValue::Integer(42).coerce_to_string(), "42");
        assert_eq!(FieldValue::Float(3.0).coerce_to_string(), "3");
        assert_eq!(FieldValue::Float(2.5).coerce_to_string(), "2.5");
        assert_eq!(FieldValue::Boolean(true).coerce_to_string(), "true");
    }

    #[test]
    fn test_coerce_datetime_is_rfc3339_millis() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            FieldValue::DateTime(dt).coerce_to_string(),
            "2024-03-01T12:00:00.000Z"
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
            .unwrap()
            .timestamp_millis();

        assert_eq!(parse_timestamp("2024-03-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T00:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01"), Some(expected));
        assert_eq!(parse_timestamp(&expected.to_string()), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(FieldValue::Boolean(true).as_timestamp_millis(), None);
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(FieldValue::from_json(&json!("a")), FieldValue::from("a"));
        assert_eq!(FieldValue::from_json(&json!(7)), FieldValue::Integer(7));
        assert_eq!(FieldValue::from_json(&json!(1.5)), FieldValue::Float(1.5));
        assert_eq!(FieldValue::from_json(&json!({"a": 1})), FieldValue::Null);
    }

    #[test]
    fn test_from_option() {
        let none: Option<&str> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("x")), FieldValue::from("x"));
    }
}
