use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use serde_json::Value;

use super::target::{TargetConfig, value_to_text};

/// Old and new value of a modified key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub old: Value,
    pub new: Value,
}

/// Key-level comparison of two target snapshots.
///
/// Keys are dotted leaf paths as produced by [`TargetConfig::flatten`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDiff {
    pub added: BTreeMap<String, Value>,
    pub modified: BTreeMap<String, ValueChange>,
    pub removed: BTreeMap<String, Value>,
    pub unchanged: BTreeMap<String, Value>,
}

impl ConfigDiff {
    pub fn between(before: &TargetConfig, after: &TargetConfig) -> Self {
        let old = before.flatten();
        let mut new = after.flatten();
        let mut diff = ConfigDiff::default();

        for (key, old_value) in old {
            match new.remove(&key) {
                Some(new_value) if new_value == old_value => {
                    diff.unchanged.insert(key, new_value);
                }
                Some(new_value) => {
                    diff.modified.insert(
                        key,
                        ValueChange {
                            old: old_value,
                            new: new_value,
                        },
                    );
                }
                None => {
                    diff.removed.insert(key, old_value);
                }
            }
        }
        diff.added = new;
        diff
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty())
    }

    pub fn summary(&self) -> String {
        if !self.has_changes() {
            return "No changes".to_string();
        }
        format!(
            "+{} added, ~{} modified, -{} removed",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        )
    }

    /// One line per change, additions first.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (k, v) in &self.added {
            out.push(format!("+ {k} = {}", value_to_text(v)));
        }
        for (k, c) in &self.modified {
            out.push(format!(
                "~ {k}: {} -> {}",
                value_to_text(&c.old),
                value_to_text(&c.new)
            ));
        }
        for (k, v) in &self.removed {
            out.push(format!("- {k} = {}", value_to_text(v)));
        }
        out
    }

    pub fn format(&self) -> String {
        self.lines().join("\n")
    }
}

impl fmt::Display for ConfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}
