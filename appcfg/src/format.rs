use std::{fmt, path::Path};

use serde_json::{Map, Value};

use crate::error::{StoreError, kind_of};

mod custom;

/// Key `toml` uses when a datetime passes through a serde data model.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// On-disk encoding of a target configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
    /// Line-oriented `key = value` (Ghostty).
    Custom,
}

impl Format {
    /// Pick a format from the schema hint, falling back to the file extension.
    pub fn detect(hint: &str, path: &Path) -> Result<Self, StoreError> {
        let hint = hint.trim();
        let name = if hint.is_empty() {
            path.extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_string()
        } else {
            hint.to_string()
        };

        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" | "tml" => Ok(Format::Toml),
            "custom" | "ghostty" => Ok(Format::Custom),
            _ => Err(StoreError::UnsupportedFormat {
                format: name,
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Custom => "custom",
        }
    }

    /// Decode file content into a key/value table. Blank content is an empty table.
    pub fn parse(&self, content: &str, path: &Path) -> Result<Map<String, Value>, StoreError> {
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let parse_err = |e: Box<dyn std::error::Error + Send + Sync>| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        };

        let value: Value = match self {
            Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.into()))?,
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| parse_err(e.into()))?,
            Format::Toml => {
                let v: toml::Value = toml::from_str(content).map_err(|e| parse_err(e.into()))?;
                serde_json::to_value(v).map_err(|e| parse_err(e.into()))?
            }
            Format::Custom => return Ok(custom::parse(content)),
        };

        match value {
            Value::Object(map) => Ok(map),
            // A YAML document of only comments decodes to null.
            Value::Null => Ok(Map::new()),
            other => Err(StoreError::NotATable {
                path: path.to_path_buf(),
                found: kind_of(&other),
            }),
        }
    }

    /// Encode a table in this format.
    pub fn render(&self, map: &Map<String, Value>, path: &Path) -> Result<String, StoreError> {
        self.render_over(map, None, path)
    }

    /// Encode a table, keeping the layout of `previous` where the format allows.
    ///
    /// Only [`Format::Custom`] uses `previous`: comments, blank lines and key
    /// order of the old file are kept.
    pub fn render_over(
        &self,
        map: &Map<String, Value>,
        previous: Option<&str>,
        path: &Path,
    ) -> Result<String, StoreError> {
        let ser_err = |e: Box<dyn std::error::Error + Send + Sync>| StoreError::Serialize {
            path: path.to_path_buf(),
            source: e,
        };

        let mut s = match self {
            Format::Json => serde_json::to_string_pretty(map).map_err(|e| ser_err(e.into()))?,
            Format::Yaml => serde_yaml::to_string(map).map_err(|e| ser_err(e.into()))?,
            Format::Toml => {
                let table = toml_table(map).map_err(ser_err)?;
                toml::to_string_pretty(&table).map_err(|e| ser_err(e.into()))?
            }
            Format::Custom => custom::render(map, previous).map_err(ser_err)?,
        };
        if !s.ends_with('\n') {
            s.push('\n');
        }
        Ok(s)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rebuild a TOML table, restoring datetimes and dropping nulls TOML cannot hold.
fn toml_table(map: &Map<String, Value>) -> Result<toml::Table, crate::error::CodecError> {
    let mut table = toml::Table::new();
    for (k, v) in map {
        if let Some(v) = toml_value(v)? {
            table.insert(k.clone(), v);
        }
    }
    Ok(table)
}

fn toml_value(value: &Value) -> Result<Option<toml::Value>, crate::error::CodecError> {
    let v = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => toml::Value::Integer(i),
            (None, Some(f)) => toml::Value::Float(f),
            (None, None) => return Err(format!("number {n} does not fit in TOML").into()),
        },
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(v) = toml_value(item)? {
                    out.push(v);
                }
            }
            toml::Value::Array(out)
        }
        Value::Object(map) => match map.get(TOML_DATETIME_KEY) {
            Some(Value::String(s)) if map.len() == 1 => {
                let dt: toml::value::Datetime = s.parse()?;
                toml::Value::Datetime(dt)
            }
            _ => toml::Value::Table(toml_table(map)?),
        },
    };
    Ok(Some(v))
}
