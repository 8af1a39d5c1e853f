//! The configuration-toggle engine.
//!
//! Every mutating operation follows the same sequence:
//!
//! ```text
//! load schema -> validate -> convert -> load target -> mutate
//!     -> (dry run: report and stop) -> save -> run hook
//! ```
//!
//! Schemas and targets are loaded fresh on every call. Nothing is saved until
//! every assignment of an operation has succeeded, so a failure part way
//! through leaves the file on disk untouched.

use std::{collections::BTreeMap, sync::Arc};

use appcfg::{
    AppSchema, ConfigDiff, ConfigStore, FieldType, Preset, TargetConfig, Value, value_to_text,
};

use crate::{
    convert::{self, ConvertError},
    error::ToggleError,
    hook::{HookRunner, Lifecycle},
    operator::ConfigOperator,
    options::EngineOptions,
    report::{AppListing, ChangeReport, KeyListing, Operation, PresetListing},
    validate,
};

pub struct Engine {
    options: EngineOptions,
    operator: ConfigOperator,
    hooks: HookRunner,
}

impl Engine {
    pub fn new(store: Arc<dyn ConfigStore>, options: EngineOptions) -> Self {
        Self {
            operator: ConfigOperator::new(store, options.dry_run),
            hooks: HookRunner::new(options.hook_timeout),
            options,
        }
    }

    /// Override the directory `~` expands to in reported paths.
    pub fn with_home(mut self, home: impl Into<std::path::PathBuf>) -> Self {
        self.operator = self.operator.with_home(home);
        self
    }

    pub fn operator(&self) -> &ConfigOperator {
        &self.operator
    }

    /// Set `key` of `app` to `value`, converted to the field's type.
    pub fn toggle(&self, app: &str, key: &str, value: &str) -> Result<ChangeReport, ToggleError> {
        debug!("toggle {app}: {key} = {value:?}");
        let schema = self.operator.load_app_config(app)?;
        let field = validate::field_exists(&schema, key)?;
        validate::field_value(&schema, key, value)?;
        let converted = convert_field(&schema, key, value, field.field_type())?;

        let mut target = self.operator.load_target_config(&schema)?;
        let before = target.clone();
        self.operator
            .set_config_value(&schema, &mut target, key, converted)?;

        let report = self.report(&schema, Operation::Toggle, &before, &target);
        self.finish(&schema, &target, report, Lifecycle::PostToggle)
    }

    /// Advance `key` of `app` to the next entry of its `values` list.
    pub fn cycle(&self, app: &str, key: &str) -> Result<ChangeReport, ToggleError> {
        debug!("cycle {app}: {key}");
        let schema = self.operator.load_app_config(app)?;
        let field = validate::field_exists(&schema, key)?;
        let ty = field.field_type();
        if !field.is_enumerated() {
            return Err(invalid_type(&schema, key, "", ty, ConvertError::NoCycleValues));
        }

        let mut target = self.operator.load_target_config(&schema)?;
        let current = target.get_string(key);
        let next = convert::next_value(&field.values, &current)
            .map_err(|e| invalid_type(&schema, key, &current, ty, e))?;
        let converted = convert_field(&schema, key, next, ty)?;

        let before = target.clone();
        self.operator
            .set_config_value(&schema, &mut target, key, converted)?;
        if self.options.dry_run {
            info!("Would cycle {app}.{key}: {current:?} -> {next:?}");
        } else {
            debug!("Cycling {app}.{key}: {current:?} -> {next:?}");
        }

        let report = self.report(&schema, Operation::Cycle, &before, &target);
        self.finish(&schema, &target, report, Lifecycle::PostCycle)
    }

    /// Apply every assignment of the preset `preset` of `app`.
    pub fn apply_preset(&self, app: &str, preset: &str) -> Result<ChangeReport, ToggleError> {
        debug!("preset {app}: {preset}");
        let schema = self.operator.load_app_config(app)?;
        let preset = find_preset(&schema, preset)?;

        let mut target = self.operator.load_target_config(&schema)?;
        let before = target.clone();
        let warnings = self.apply_preset_values(&schema, preset, &mut target)?;

        let mut report = self.report(&schema, Operation::Preset, &before, &target);
        report.warnings = warnings;
        self.finish(&schema, &target, report, Lifecycle::PostPreset)
    }

    /// What [`Engine::apply_preset`] would change, without saving.
    pub fn preset_diff(&self, app: &str, preset: &str) -> Result<ConfigDiff, ToggleError> {
        let schema = self.operator.load_app_config(app)?;
        let preset = find_preset(&schema, preset)?;

        let mut target = self.operator.load_target_config(&schema)?;
        let before = target.clone();
        self.apply_preset_values(&schema, preset, &mut target)?;
        Ok(ConfigDiff::between(&before, &target))
    }

    /// Append `value` to the list stored at `key`.
    ///
    /// The item is converted to the field's type. A missing key becomes a
    /// one-element list and a scalar becomes a two-element list. Appending a
    /// value already present changes nothing.
    pub fn append(&self, app: &str, key: &str, value: &str) -> Result<ChangeReport, ToggleError> {
        debug!("append {app}: {key} += {value:?}");
        let schema = self.operator.load_app_config(app)?;
        let field = validate::field_exists(&schema, key)?;
        let ty = field.field_type();
        let item = convert_field(&schema, key, value, ty)?;

        let mut target = self.operator.load_target_config(&schema)?;
        let updated = match target.get(key) {
            None | Some(Value::Null) => Some(Value::Array(vec![item])),
            Some(Value::Array(items)) if items.contains(&item) => None,
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                items.push(item);
                Some(Value::Array(items))
            }
            Some(existing) if *existing == item => None,
            Some(Value::Object(_)) => {
                return Err(invalid_type(
                    &schema,
                    key,
                    value,
                    ty,
                    ConvertError::NotAList { found: "a table" },
                ));
            }
            Some(existing) => Some(Value::Array(vec![existing.clone(), item])),
        };

        let Some(updated) = updated else {
            warn!("{app}.{key} already contains {value:?}");
            return Ok(self.unchanged(&schema, Operation::Append));
        };

        let before = target.clone();
        self.operator
            .set_config_value(&schema, &mut target, key, updated)?;
        let report = self.report(&schema, Operation::Append, &before, &target);
        self.finish(&schema, &target, report, Lifecycle::PostToggle)
    }

    /// Remove list items equal to `value` or starting with `value=`.
    pub fn remove(&self, app: &str, key: &str, value: &str) -> Result<ChangeReport, ToggleError> {
        debug!("remove {app}: {key} -= {value:?}");
        let schema = self.operator.load_app_config(app)?;
        validate::field_exists(&schema, key)?;

        let mut target = self.operator.load_target_config(&schema)?;
        let prefix = format!("{value}=");
        let matches = |v: &Value| {
            let text = value_to_text(v);
            text == value || text.starts_with(&prefix)
        };

        let updated = match target.get(key) {
            Some(Value::Array(items)) => {
                let kept: Vec<Value> = items.iter().filter(|v| !matches(*v)).cloned().collect();
                (kept.len() != items.len()).then_some(Value::Array(kept))
            }
            Some(single) if matches(single) => Some(Value::Array(Vec::new())),
            _ => None,
        };

        let Some(updated) = updated else {
            warn!("{app}.{key} has no entry matching {value:?}");
            return Ok(self.unchanged(&schema, Operation::Remove));
        };

        let before = target.clone();
        self.operator
            .set_config_value(&schema, &mut target, key, updated)?;
        let report = self.report(&schema, Operation::Remove, &before, &target);
        self.finish(&schema, &target, report, Lifecycle::PostToggle)
    }

    /// Names of every configured app.
    pub fn get_apps(&self) -> Result<Vec<String>, ToggleError> {
        self.operator.list_apps()
    }

    pub fn get_app_config(&self, app: &str) -> Result<AppSchema, ToggleError> {
        self.operator.load_app_config(app)
    }

    pub fn get_presets(&self, app: &str) -> Result<BTreeMap<String, Preset>, ToggleError> {
        Ok(self.operator.load_app_config(app)?.presets)
    }

    /// Every app with a loadable schema. Broken schemas are logged and skipped.
    pub fn list_apps(&self) -> Result<Vec<AppListing>, ToggleError> {
        let mut out = Vec::new();
        for name in self.operator.list_apps()? {
            match self.operator.store().load_app_config(&name) {
                Ok(schema) => {
                    let path = self.operator.expand_path(&schema.target_path);
                    out.push(AppListing::new(&schema, path));
                }
                Err(e) => warn!("Skipping app {name}: {e}"),
            }
        }
        Ok(out)
    }

    pub fn list_presets(&self, app: &str) -> Result<Vec<PresetListing>, ToggleError> {
        let schema = self.operator.load_app_config(app)?;
        Ok(schema.presets.values().map(PresetListing::from).collect())
    }

    pub fn list_keys(&self, app: &str) -> Result<Vec<KeyListing>, ToggleError> {
        let schema = self.operator.load_app_config(app)?;
        Ok(schema
            .fields
            .iter()
            .map(|(key, field)| KeyListing::new(key, field))
            .collect())
    }

    /// Current value of every schema field; `None` when unset in the target.
    pub fn get_current_values(
        &self,
        app: &str,
    ) -> Result<BTreeMap<String, Option<Value>>, ToggleError> {
        let schema = self.operator.load_app_config(app)?;
        let target = self.operator.load_target_config(&schema)?;
        Ok(schema
            .fields
            .keys()
            .map(|key| (key.clone(), target.get(key).cloned()))
            .collect())
    }

    /// Fields whose current value differs from the schema default.
    ///
    /// Values compare as text, so `14` equals `"14"`. A field without a
    /// default counts once it is set. An unset field counts when its default
    /// is not empty, `0` or `false`, and is reported as `None`.
    pub fn get_changed_values(
        &self,
        app: &str,
    ) -> Result<BTreeMap<String, Option<Value>>, ToggleError> {
        let schema = self.operator.load_app_config(app)?;
        let target = self.operator.load_target_config(&schema)?;

        let mut changed = BTreeMap::new();
        for (key, field) in &schema.fields {
            let default = field.default.as_ref().map(value_to_text);
            match (target.get(key), default) {
                (Some(current), default) => {
                    if default.as_deref() != Some(value_to_text(current).as_str()) {
                        changed.insert(key.clone(), Some(current.clone()));
                    }
                }
                (None, Some(d)) if !matches!(d.as_str(), "" | "0" | "false") => {
                    changed.insert(key.clone(), None);
                }
                _ => {}
            }
        }
        Ok(changed)
    }

    fn apply_preset_values(
        &self,
        schema: &AppSchema,
        preset: &Preset,
        target: &mut TargetConfig,
    ) -> Result<Vec<String>, ToggleError> {
        let mut warnings = Vec::new();
        for (key, literal) in &preset.values {
            let value = match schema.field(key) {
                Some(field) => {
                    let text = convert::literal_text(literal);
                    convert_field(schema, key, &text, field.field_type())?
                }
                None => {
                    let msg = format!(
                        "key '{key}' is not defined in the {} schema, applied as-is",
                        schema.name
                    );
                    warn!("Preset {}: {msg}", preset.name);
                    warnings.push(msg);
                    literal.clone()
                }
            };
            self.operator.set_config_value(schema, target, key, value)?;
        }
        Ok(warnings)
    }

    fn report(
        &self,
        schema: &AppSchema,
        operation: Operation,
        before: &TargetConfig,
        after: &TargetConfig,
    ) -> ChangeReport {
        let mut report = ChangeReport::new(
            &schema.name,
            operation,
            self.operator.expand_path(&schema.target_path),
            ConfigDiff::between(before, after),
        );
        report.dry_run = self.options.dry_run;
        report
    }

    fn unchanged(&self, schema: &AppSchema, operation: Operation) -> ChangeReport {
        let empty = TargetConfig::new();
        self.report(schema, operation, &empty, &empty)
    }

    /// Shared tail: dry-run short circuit, save, hook.
    fn finish(
        &self,
        schema: &AppSchema,
        target: &TargetConfig,
        mut report: ChangeReport,
        lifecycle: Lifecycle,
    ) -> Result<ChangeReport, ToggleError> {
        if self.options.dry_run || self.options.verbose {
            for line in report.diff.lines() {
                info!("{}: {line}", schema.name);
            }
        }
        if self.options.dry_run {
            info!("Dry run, {} not saved: {}", report.target_path, report.diff.summary());
            return Ok(report);
        }

        self.operator.save_config_safely(schema, target)?;
        report.saved = true;
        info!("{}: {}", report.target_path, report.diff.summary());

        report.hook = self
            .hooks
            .run_hooks(schema, lifecycle)
            .map_err(|e| ToggleError::Hook {
                app: schema.name.clone(),
                lifecycle: lifecycle.to_string(),
                source: e,
            })?;
        Ok(report)
    }
}

fn find_preset<'a>(schema: &'a AppSchema, name: &str) -> Result<&'a Preset, ToggleError> {
    schema.preset(name).ok_or_else(|| ToggleError::PresetNotFound {
        app: schema.name.clone(),
        preset: name.to_string(),
        available: schema.preset_names(),
    })
}

fn convert_field(
    schema: &AppSchema,
    key: &str,
    raw: &str,
    ty: FieldType,
) -> Result<Value, ToggleError> {
    convert::convert(raw, ty).map_err(|e| invalid_type(schema, key, raw, ty, e))
}

fn invalid_type(
    schema: &AppSchema,
    key: &str,
    raw: &str,
    expected: FieldType,
    source: ConvertError,
) -> ToggleError {
    ToggleError::FieldInvalidType {
        app: schema.name.clone(),
        key: key.to_string(),
        value: raw.to_string(),
        expected,
        source,
    }
}
