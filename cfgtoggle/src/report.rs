//! Results of engine operations.
//!
//! Output here is line-oriented text for humans; it is not a stable
//! machine-readable format.

use std::{collections::BTreeMap, fmt};

use appcfg::{AppSchema, ConfigDiff, FieldSpec, FieldType, Preset, Value, value_to_text};

use crate::hook::HookOutcome;

/// Mutating operation a [`ChangeReport`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Toggle,
    Cycle,
    Preset,
    Append,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Toggle => "toggle",
            Operation::Cycle => "cycle",
            Operation::Preset => "preset",
            Operation::Append => "append",
            Operation::Remove => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a mutating operation did, or would do in dry-run mode.
#[derive(Debug, Clone)]
pub struct ChangeReport {
    pub app: String,
    pub operation: Operation,
    /// Target file with `~` expanded.
    pub target_path: String,
    pub diff: ConfigDiff,
    pub dry_run: bool,
    /// Whether the target file was written.
    pub saved: bool,
    /// The hook that ran after saving, if any.
    pub hook: Option<HookOutcome>,
    pub warnings: Vec<String>,
}

impl ChangeReport {
    pub fn new(app: &str, operation: Operation, target_path: String, diff: ConfigDiff) -> Self {
        Self {
            app: app.to_string(),
            operation,
            target_path,
            diff,
            dry_run: false,
            saved: false,
            hook: None,
            warnings: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.diff.has_changes()
    }

    /// One-line headline, e.g. `ghostty: toggle ~1 modified (dry run)`.
    pub fn headline(&self) -> String {
        let mut s = format!("{}: {} {}", self.app, self.operation, self.diff.summary());
        if self.dry_run {
            s.push_str(" (dry run)");
        }
        s
    }
}

impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headline())?;
        for line in self.diff.lines() {
            writeln!(f, "  {line}")?;
        }
        if let Some(hook) = &self.hook {
            writeln!(f, "  hook {}: {}", hook.lifecycle, hook.command)?;
        }
        for w in &self.warnings {
            writeln!(f, "  warning: {w}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppListing {
    pub name: String,
    pub description: Option<String>,
    pub target_path: String,
    pub fields: usize,
    pub presets: usize,
}

impl AppListing {
    pub fn new(schema: &AppSchema, target_path: String) -> Self {
        Self {
            name: schema.name.clone(),
            description: schema.description.clone(),
            target_path,
            fields: schema.fields.len(),
            presets: schema.presets.len(),
        }
    }
}

impl fmt::Display for AppListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} fields, {} presets) {}",
            self.name, self.fields, self.presets, self.target_path
        )?;
        if let Some(d) = &self.description {
            write!(f, " - {d}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyListing {
    pub key: String,
    pub kind: FieldType,
    pub values: Vec<String>,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl KeyListing {
    pub fn new(key: &str, field: &FieldSpec) -> Self {
        Self {
            key: key.to_string(),
            kind: field.field_type(),
            values: field.values.clone(),
            default: field.default.clone(),
            description: field.description.clone(),
        }
    }
}

impl fmt::Display for KeyListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.key, self.kind)?;
        if !self.values.is_empty() {
            write!(f, " [{}]", self.values.join(", "))?;
        }
        if let Some(d) = &self.default {
            write!(f, " default={}", value_to_text(d))?;
        }
        if let Some(d) = &self.description {
            write!(f, " - {d}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresetListing {
    pub name: String,
    pub description: Option<String>,
    pub values: BTreeMap<String, Value>,
}

impl From<&Preset> for PresetListing {
    fn from(preset: &Preset) -> Self {
        Self {
            name: preset.name.clone(),
            description: preset.description.clone(),
            values: preset.values.clone(),
        }
    }
}

impl fmt::Display for PresetListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(d) = &self.description {
            write!(f, " - {d}")?;
        }
        for (k, v) in &self.values {
            write!(f, "\n  {k} = {}", value_to_text(v))?;
        }
        Ok(())
    }
}
