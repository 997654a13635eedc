use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized settings value as it travels to the device or to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            FieldValue::Int(_) => None,
        }
    }

    /// String form used for flat key-value persistence.
    pub fn to_storage_string(&self) -> String {
        match self {
            FieldValue::Int(value) => value.to_string(),
            FieldValue::Text(value) => value.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Int(value) => Value::from(*value),
            FieldValue::Text(value) => Value::from(value.as_str()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Loose numeric conversion applied to inbound settings values.
///
/// Mirrors what a configuration page or an older persisted blob may hand
/// us: numbers, numeric strings, booleans or null. Anything else is NaN.
pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_numeric(text),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    // Rust accepts "inf" and "nan" spellings that are not numeric input here.
    let plausible = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !plausible {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// 1 for any nonzero number, 0 for zero and NaN.
pub(crate) fn to_flag(value: &Value) -> i64 {
    let number = to_number(value);
    i64::from(number != 0.0 && !number.is_nan())
}

/// Integer truncation toward zero, wrapping into the i32 range; NaN becomes 0.
pub(crate) fn to_tag(value: &Value) -> i64 {
    let number = to_number(value);
    if !number.is_finite() {
        return 0;
    }
    i64::from(number.trunc() as i64 as i32)
}

/// String conversion for text fields; null yields `None` so the caller can
/// keep its current value.
pub(crate) fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}
