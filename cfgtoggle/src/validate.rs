//! Schema-level checks on a requested change.

use appcfg::{AppSchema, FieldSpec};

use crate::error::ToggleError;

/// The field declared under `key`.
pub fn field_exists<'a>(schema: &'a AppSchema, key: &str) -> Result<&'a FieldSpec, ToggleError> {
    schema.field(key).ok_or_else(|| ToggleError::FieldNotFound {
        app: schema.name.clone(),
        key: key.to_string(),
        available: schema.field_names(),
    })
}

/// Check the raw, unconverted value against the field's enumerated values.
///
/// Fields without a `values` list accept anything here.
pub fn field_value(schema: &AppSchema, key: &str, raw: &str) -> Result<(), ToggleError> {
    let field = field_exists(schema, key)?;
    if field.allows(raw) {
        return Ok(());
    }
    Err(ToggleError::FieldInvalidValue {
        app: schema.name.clone(),
        key: key.to_string(),
        value: raw.to_string(),
        allowed: field.values.clone(),
    })
}
