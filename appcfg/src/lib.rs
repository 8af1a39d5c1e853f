//! # appcfg
//!
//! Application schemas and target configuration snapshots for cfgtoggle.
//!
//! An *app schema* declares which settings of a third-party application can be
//! changed, their types, allowed values, presets and hooks. A *target config*
//! is the live content of that application's own configuration file, held as a
//! generic key/value tree so that the engine never cares about the on-disk
//! format.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use appcfg::{ConfigStore, FileStore};
//!
//! let store = FileStore::from_default_dir().unwrap();
//! let schema = store.load_app_config("ghostty").unwrap();
//! let target = store.load_target_config(&schema).unwrap();
//! println!("{:?}", target.get("theme"));
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Schema types, target snapshots and diffs
//! - [`format`] - JSON / YAML / TOML codecs for target files
//! - [`path`] - Home directory expansion
//! - [`store`] - The [`ConfigStore`] capability and its implementations

#[macro_use]
extern crate log;

/// Schema types, target snapshots and snapshot diffs.
pub mod data;

/// Error type shared by every store operation.
pub mod error;

/// Serialization formats for target configuration files.
pub mod format;

/// Home directory expansion for schema paths.
pub mod path;

/// Storage capability used by the engine.
pub mod store;

pub use data::{
    diff::{ConfigDiff, ValueChange},
    schema::{AppSchema, FieldSpec, FieldType, Preset},
    target::{TargetConfig, value_to_text},
};
pub use error::StoreError;
pub use format::Format;
pub use serde_json::Value;
pub use store::{ConfigStore, file::FileStore, memory::MemoryStore};
