//! String to typed value conversion.
//!
//! Every value a user supplies (CLI argument, preset literal, next cycle
//! entry) arrives as text and is converted according to the field's declared
//! [`FieldType`]. Unknown types were already folded to
//! [`FieldType::String`] by the schema layer, so conversion never rejects a
//! type name.

use appcfg::{FieldType, Value};
use serde_json::Number;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("cannot convert {value:?} to {expected}")]
    InvalidType { value: String, expected: FieldType },

    #[error("no predefined values to cycle through")]
    NoCycleValues,

    #[error("value at this key is {found}, not a list")]
    NotAList { found: &'static str },
}

const TRUE_WORDS: [&str; 5] = ["true", "1", "yes", "on", "enabled"];
const FALSE_WORDS: [&str; 5] = ["false", "0", "no", "off", "disabled"];

/// Convert `raw` into a value of type `ty`.
pub fn convert(raw: &str, ty: FieldType) -> Result<Value, ConvertError> {
    let invalid = || ConvertError::InvalidType {
        value: raw.to_string(),
        expected: ty,
    };

    match ty {
        FieldType::Bool => {
            let lower = raw.to_ascii_lowercase();
            if TRUE_WORDS.contains(&lower.as_str()) {
                Ok(Value::Bool(true))
            } else if FALSE_WORDS.contains(&lower.as_str()) {
                Ok(Value::Bool(false))
            } else {
                Err(invalid())
            }
        }
        FieldType::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        FieldType::Float => {
            let f = raw.parse::<f64>().map_err(|_| invalid())?;
            // JSON has no NaN or infinities.
            Number::from_f64(f).map(Value::Number).ok_or_else(invalid)
        }
        FieldType::String => Ok(Value::String(raw.to_string())),
    }
}

/// The entry following `current` in `values`, wrapping around.
///
/// A `current` that is not in the list restarts at the first entry.
pub fn next_value<'a>(values: &'a [String], current: &str) -> Result<&'a str, ConvertError> {
    if values.is_empty() {
        return Err(ConvertError::NoCycleValues);
    }
    let next = match values.iter().position(|v| v == current) {
        Some(idx) => (idx + 1) % values.len(),
        None => 0,
    };
    Ok(&values[next])
}

/// Text form of a literal preset value, fed back through [`convert`].
///
/// Integers keep every digit; floats use the shortest round-trip form.
pub fn literal_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
