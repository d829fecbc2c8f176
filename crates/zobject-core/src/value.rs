//! Dynamic attribute values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds in one day, used to convert `Date` day counts to instants.
const SECONDS_PER_DAY: i64 = 86_400;

/// Format used for date-time values in query text and bulk payloads.
///
/// No fractional seconds and no zone suffix; the platform reads these as
/// instants in the tenant's configured zone.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A dynamically-typed attribute value.
///
/// Remote objects are schema-less from the core's point of view, so every
/// attribute is carried as a `Value`. Type coercion is the connector's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent / nil value
    Null,

    /// Boolean value
    Bool(bool),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 64-bit floating point
    Double(f64),

    /// Arbitrary precision decimal (stored as string, e.g. currency amounts)
    Decimal(String),

    /// Text string
    Text(String),

    /// Date (days since epoch)
    Date(i32),

    /// Date-time (microseconds since epoch, UTC)
    Timestamp(i64),

    /// Structured value (e.g. a cached complex sub-object)
    Json(serde_json::Value),
}

impl Value {
    /// Check if this value is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a date or date-time.
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Timestamp(_))
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "DATETIME",
            Value::Json(_) => "JSON",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::BigInt(v) => Some(*v != 0),
            Value::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret this value as a UTC date-time.
    ///
    /// Dates are taken at midnight.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(days) => DateTime::from_timestamp(i64::from(*days) * SECONDS_PER_DAY, 0),
            Value::Timestamp(micros) => DateTime::from_timestamp_micros(*micros),
            _ => None,
        }
    }

    /// Render this value the way it is substituted into query text.
    ///
    /// No quoting or escaping is applied.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Decimal(s) | Value::Text(s) => s.clone(),
            Value::Date(_) => self
                .as_datetime()
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or_default(),
            Value::Timestamp(_) => self.to_wire_text(),
            Value::Json(v) => v.to_string(),
        }
    }

    /// Render this value as element text for write payloads.
    ///
    /// Dates and date-times use [`DATE_TIME_FORMAT`].
    pub fn to_wire_text(&self) -> String {
        if self.is_temporal() {
            return self
                .as_datetime()
                .map(|dt| dt.naive_utc().format(DATE_TIME_FORMAT).to_string())
                .unwrap_or_default();
        }
        self.to_literal()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        let days = v
            .signed_duration_since(NaiveDate::default())
            .num_days();
        Value::Date(i32::try_from(days).unwrap_or(i32::MAX))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc().timestamp_micros())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.timestamp_micros())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
