use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{StoreError, kind_of};

/// Key path separator for nested settings.
pub const KEY_DELIMITER: char = '.';

/// Live settings of one application, as loaded from its config file.
///
/// Keys may be dotted (`window.padding`) to address nested tables. The
/// snapshot is written back as a whole; there is no field-level persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetConfig {
    root: Map<String, Value>,
}

impl TargetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Build from a JSON document whose root must be an object.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(StoreError::NotATable {
                path: Default::default(),
                found: kind_of(&other),
            }),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split(KEY_DELIMITER);
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for seg in segments {
            current = current.as_object()?.get(seg)?;
        }
        Some(current)
    }

    /// Text form of the value at `key`; missing or null values give `""`.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(value_to_text).unwrap_or_default()
    }

    /// Assign `value` at a dotted key, creating intermediate tables.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let segments: Vec<&str> = key.split(KEY_DELIMITER).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?;

        let mut table = &mut self.root;
        for seg in parents {
            let slot = table
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let found = kind_of(slot);
            table = match slot {
                Value::Object(inner) => inner,
                _ => {
                    return Err(StoreError::PathConflict {
                        key: key.to_string(),
                        segment: seg.to_string(),
                        found,
                    });
                }
            };
        }
        table.insert(last.to_string(), value);
        Ok(())
    }

    /// All leaf values keyed by their dotted path.
    ///
    /// Arrays and empty tables are leaves.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        flatten_into(&self.root, "", &mut out);
        out
    }
}

fn flatten_into(table: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}{KEY_DELIMITER}{k}")
        };
        match v {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, out),
            _ => {
                out.insert(path, v.clone());
            }
        }
    }
}

/// Render a value the way a user would type it: strings unquoted, null empty,
/// everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
