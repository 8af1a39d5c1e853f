use std::{collections::BTreeMap, fmt};

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Declarative description of one manageable application.
///
/// Loaded from `<config-dir>/apps/<name>.yaml`:
///
/// ```yaml
/// path: ~/.config/ghostty/config.json
/// format: json
/// fields:
///   theme:
///     type: choice
///     values: [dark, light, auto]
///     default: dark
/// presets:
///   daylight:
///     values:
///       theme: light
/// hooks:
///   post-toggle: notify-send ghostty updated
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppSchema {
    /// Unique application identifier; filled from the schema file name.
    #[serde(default)]
    pub name: String,
    /// Location of the application's own config file (`~` allowed).
    #[serde(rename = "path", alias = "targetPath", alias = "target_path")]
    pub target_path: String,
    /// Format hint for the target file (`json`, `yaml`, `toml`). Empty means
    /// "detect from the file extension".
    #[serde(default)]
    pub format: String,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Configurable settings keyed by (possibly dotted) config key.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
    /// Named bundles of field assignments.
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
    /// Lifecycle name (`post-toggle`, `post-cycle`, `post-preset`) to command line.
    #[serde(default)]
    pub hooks: BTreeMap<String, String>,
    /// Extra environment for hook processes.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl AppSchema {
    pub fn new(
        name: impl Into<String>,
        target_path: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_path: target_path.into(),
            format: format.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, field: FieldSpec) -> Self {
        self.fields.insert(key.into(), field);
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.presets.insert(preset.name.clone(), preset);
        self
    }

    pub fn with_hook(mut self, lifecycle: impl Into<String>, command: impl Into<String>) -> Self {
        self.hooks.insert(lifecycle.into(), command.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn hook(&self, lifecycle: &str) -> Option<&str> {
        self.hooks.get(lifecycle).map(String::as_str)
    }

    /// Field keys in sorted order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Preset names in sorted order.
    pub fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }
}

/// One configurable setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    /// Declared type as written in the schema (`choice`, `int`, `boolean`, ...).
    /// See [`FieldSpec::field_type`] for the normalized form.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Allowed literal values, in cycling order. Empty means unconstrained.
    #[serde(default, deserialize_with = "scalar_strings")]
    #[schemars(with = "Vec<String>")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field_type(&self) -> FieldType {
        FieldType::parse(&self.kind)
    }

    /// Whether the field declares an enumerated value list.
    pub fn is_enumerated(&self) -> bool {
        !self.values.is_empty()
    }

    /// Literal membership check against `values`; unconstrained fields accept anything.
    pub fn allows(&self, raw: &str) -> bool {
        self.values.is_empty() || self.values.iter().any(|v| v == raw)
    }
}

/// Normalized field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
}

impl FieldType {
    /// Total parse: aliases are folded, anything unknown is treated as a string
    /// so that schemas written for newer versions keep working.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => FieldType::Int,
            "float" | "number" => FieldType::Float,
            "bool" | "boolean" => FieldType::Bool,
            _ => FieldType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named bundle of field assignments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Preset {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Key to literal value; values may be of any primitive type.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl Preset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Accept `values: [12, 14]` as well as `values: ["12", "14"]`.
fn scalar_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "field values must be scalars, found {other}"
            ))),
        })
        .collect()
}
