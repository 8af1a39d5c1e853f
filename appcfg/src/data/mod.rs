//! Configuration data structures.
//!
//! - [`schema`] - What an application exposes: fields, presets, hooks
//! - [`target`] - The application's live settings as a key/value tree
//! - [`diff`] - Before/after comparison of two target snapshots
//!
//! Schemas are declarations and are never mutated by the engine; only
//! [`target::TargetConfig`] values change during an operation.

/// Declarative application description.
pub mod schema;

/// In-memory snapshot of a target configuration file.
pub mod target;

/// Snapshot comparison used for previews.
pub mod diff;
