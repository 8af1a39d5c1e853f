//! Storage capability consumed by the engine.
//!
//! The engine never touches files directly; every format translation happens
//! behind [`ConfigStore`].

use crate::{AppSchema, StoreError, TargetConfig};

pub mod file;
pub mod memory;

/// Load and save schemas and target snapshots by logical app name.
pub trait ConfigStore: Send + Sync {
    /// Schema of `name`, with `schema.name` filled in.
    fn load_app_config(&self, name: &str) -> Result<AppSchema, StoreError>;

    /// Names of every known app, sorted.
    fn list_apps(&self) -> Result<Vec<String>, StoreError>;

    fn load_target_config(&self, schema: &AppSchema) -> Result<TargetConfig, StoreError>;

    /// Replace the whole target file with `target`.
    fn save_target_config(
        &self,
        schema: &AppSchema,
        target: &TargetConfig,
    ) -> Result<(), StoreError>;
}
