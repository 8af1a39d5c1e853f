//! Access to one application's persisted configuration.
//!
//! Every store failure is classified here, so the engine only ever sees
//! [`ToggleError`].

use std::{path::PathBuf, sync::Arc};

use appcfg::{AppSchema, ConfigStore, TargetConfig, Value, path::expand_home};

use crate::{error::ToggleError, path_cache::PathCache};

pub struct ConfigOperator {
    store: Arc<dyn ConfigStore>,
    dry_run: bool,
    home: Option<PathBuf>,
    paths: PathCache,
}

impl ConfigOperator {
    pub fn new(store: Arc<dyn ConfigStore>, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            home: dirs::home_dir(),
            paths: PathCache::default(),
        }
    }

    /// Override the directory `~` expands to.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.paths
    }

    /// Load the schema of `app`; any failure is reported as an unknown app.
    pub fn load_app_config(&self, app: &str) -> Result<AppSchema, ToggleError> {
        self.store.load_app_config(app).map_err(|e| {
            debug!("Loading schema for {app} failed: {e}");
            ToggleError::AppNotFound {
                app: app.to_string(),
                known: self.store.list_apps().unwrap_or_default(),
            }
        })
    }

    pub fn list_apps(&self) -> Result<Vec<String>, ToggleError> {
        self.store
            .list_apps()
            .map_err(|e| ToggleError::ConfigParse {
                app: None,
                path: "apps".to_string(),
                source: e,
            })
    }

    pub fn load_target_config(&self, schema: &AppSchema) -> Result<TargetConfig, ToggleError> {
        self.store
            .load_target_config(schema)
            .map_err(|e| ToggleError::ConfigParse {
                app: Some(schema.name.clone()),
                path: self.expand_path(&schema.target_path),
                source: e,
            })
    }

    pub fn set_config_value(
        &self,
        schema: &AppSchema,
        target: &mut TargetConfig,
        key: &str,
        value: Value,
    ) -> Result<(), ToggleError> {
        target
            .set(key, value)
            .map_err(|e| ToggleError::ConfigWrite {
                app: schema.name.clone(),
                path: self.expand_path(&schema.target_path),
                source: e,
            })
    }

    /// Persist the whole snapshot. A no-op in dry-run mode.
    pub fn save_config_safely(
        &self,
        schema: &AppSchema,
        target: &TargetConfig,
    ) -> Result<(), ToggleError> {
        if self.dry_run {
            debug!("Dry run: not saving {}", schema.name);
            return Ok(());
        }
        self.store
            .save_target_config(schema, target)
            .map_err(|e| ToggleError::ConfigWrite {
                app: schema.name.clone(),
                path: self.expand_path(&schema.target_path),
                source: e,
            })
    }

    /// Expand a leading `~`, memoized per raw path.
    pub fn expand_path(&self, path: &str) -> String {
        self.paths
            .get_or_insert_with(path, || expand_home(path, self.home.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use appcfg::{MemoryStore, StoreError};
    use serde_json::json;

    fn operator(dry_run: bool) -> (Arc<MemoryStore>, ConfigOperator) {
        let store = Arc::new(MemoryStore::new());
        store.insert_app(AppSchema::new("test-app", "~/test.json", "json"));
        let op = ConfigOperator::new(store.clone(), dry_run).with_home("/home/u");
        (store, op)
    }

    #[test]
    fn test_unknown_app_lists_known() {
        let (_, op) = operator(false);
        let err = op.load_app_config("nonexistent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AppNotFound);
        assert_eq!(err.suggestions(), vec!["test-app"]);
    }

    #[test]
    fn test_expand_path_cached() {
        let (_, op) = operator(false);
        assert_eq!(op.expand_path("~/test.json"), "/home/u/test.json");
        assert_eq!(op.expand_path("~"), "/home/u");
        assert_eq!(op.expand_path("/abs"), "/abs");
        assert_eq!(op.path_cache().len(), 3);
        op.expand_path("~/test.json");
        assert_eq!(op.path_cache().len(), 3);
    }

    #[test]
    fn test_save_respects_dry_run() {
        let (store, op) = operator(true);
        let schema = op.load_app_config("test-app").unwrap();
        let mut target = op.load_target_config(&schema).unwrap();
        op.set_config_value(&schema, &mut target, "theme", json!("light"))
            .unwrap();
        op.save_config_safely(&schema, &target).unwrap();
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_write_errors_classified() {
        let (store, op) = operator(false);
        let schema = op.load_app_config("test-app").unwrap();
        let mut target = TargetConfig::new();
        target.set("theme", json!("dark")).unwrap();

        let err = op
            .set_config_value(&schema, &mut target, "theme.inner", json!(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigWrite);
        assert!(matches!(
            err,
            ToggleError::ConfigWrite {
                source: StoreError::PathConflict { .. },
                ..
            }
        ));

        store.set_read_only(true);
        let err = op.save_config_safely(&schema, &target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigWrite);
        assert_eq!(err.suggestions(), vec!["check file permissions and disk space"]);
    }
}
