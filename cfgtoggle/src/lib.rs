//! # cfgtoggle
//!
//! Change named settings of third-party applications by editing their own
//! configuration files, driven by a declarative per-app schema.
//!
//! ## Features
//!
//! - **Toggle**: set a field to a validated, typed value
//! - **Cycle**: advance an enumerated field to its next value
//! - **Presets**: apply a named bundle of assignments at once
//! - **Hooks**: run an allow-listed notification command after a change
//! - **Dry run**: preview the diff without touching files or processes
//!
//! ## Modules
//!
//! - [`convert`] - String to typed value conversion and cycling
//! - [`validate`] - Field existence and membership checks
//! - [`operator`] - Schema/target loading and saving, path expansion
//! - [`path_cache`] - Bounded LRU cache for expanded paths
//! - [`hook`] - Sandboxed post-change commands
//! - [`engine`] - The public operations
//! - [`report`] - Results and listings
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cfgtoggle::{Engine, EngineOptions, appcfg::FileStore};
//!
//! let store = FileStore::from_default_dir().unwrap();
//! let engine = Engine::new(Arc::new(store), EngineOptions::default().with_dry_run(true));
//! let report = engine.toggle("ghostty", "theme", "light").unwrap();
//! println!("{}", report.diff);
//! ```

#[macro_use]
extern crate log;

/// Conversion of raw user input into typed values.
pub mod convert;

/// The public configuration-toggle operations.
pub mod engine;

/// Error kinds returned by every engine operation.
pub mod error;

/// Post-change hook execution under a strict command policy.
pub mod hook;

/// Access to one application's persisted configuration.
pub mod operator;

/// Engine construction options.
pub mod options;

/// Bounded least-recently-used cache for expanded paths.
pub mod path_cache;

/// Operation results and read-only listings.
pub mod report;

/// Schema-level checks on requested keys and values.
pub mod validate;

pub use appcfg;
pub use engine::Engine;
pub use error::{ErrorKind, ToggleError};
pub use options::EngineOptions;
pub use report::{ChangeReport, Operation};
