use std::{
    collections::BTreeMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use crate::{AppSchema, StoreError, TargetConfig, store::ConfigStore};

/// In-memory store for embedders that already hold parsed schemas.
///
/// Targets are keyed by app name. A missing target loads as an empty table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    schemas: RwLock<BTreeMap<String, AppSchema>>,
    targets: RwLock<BTreeMap<String, TargetConfig>>,
    saves: AtomicUsize,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under its `name`.
    pub fn insert_app(&self, schema: AppSchema) {
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        schemas.insert(schema.name.clone(), schema);
    }

    pub fn insert_target(&self, app: &str, target: TargetConfig) {
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        targets.insert(app.to_string(), target);
    }

    pub fn target(&self, app: &str) -> Option<TargetConfig> {
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        targets.get(app).cloned()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent save fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl ConfigStore for MemoryStore {
    fn load_app_config(&self, name: &str) -> Result<AppSchema, StoreError> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        let mut schema = schemas
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::AppNotFound(name.to_string()))?;
        schema.name = name.to_string();
        Ok(schema)
    }

    fn list_apps(&self) -> Result<Vec<String>, StoreError> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        Ok(schemas.keys().cloned().collect())
    }

    fn load_target_config(&self, schema: &AppSchema) -> Result<TargetConfig, StoreError> {
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(targets.get(&schema.name).cloned().unwrap_or_default())
    }

    fn save_target_config(
        &self,
        schema: &AppSchema,
        target: &TargetConfig,
    ) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                path: schema.target_path.clone().into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        targets.insert(schema.name.clone(), target.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
