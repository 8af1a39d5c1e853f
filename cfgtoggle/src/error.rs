use std::fmt;

use appcfg::{FieldType, StoreError};
use thiserror::Error;

use crate::{convert::ConvertError, hook::HookError};

/// Stable classification of a [`ToggleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AppNotFound,
    PresetNotFound,
    FieldNotFound,
    FieldInvalidValue,
    FieldInvalidType,
    ConfigParse,
    ConfigWrite,
    HookFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AppNotFound => "APP_NOT_FOUND",
            ErrorKind::PresetNotFound => "PRESET_NOT_FOUND",
            ErrorKind::FieldNotFound => "FIELD_NOT_FOUND",
            ErrorKind::FieldInvalidValue => "FIELD_INVALID_VALUE",
            ErrorKind::FieldInvalidType => "FIELD_INVALID_TYPE",
            ErrorKind::ConfigParse => "CONFIG_PARSE_ERROR",
            ErrorKind::ConfigWrite => "CONFIG_WRITE_ERROR",
            ErrorKind::HookFailed => "HOOK_FAILED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an engine operation.
///
/// Underlying I/O, parser and process errors are kept as the `source`.
#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("app '{app}' not found")]
    AppNotFound { app: String, known: Vec<String> },

    #[error("preset '{preset}' not found in {app}")]
    PresetNotFound {
        app: String,
        preset: String,
        available: Vec<String>,
    },

    #[error("field '{key}' not found in {app}")]
    FieldNotFound {
        app: String,
        key: String,
        available: Vec<String>,
    },

    #[error("invalid value {value:?} for field '{key}' in {app}")]
    FieldInvalidValue {
        app: String,
        key: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("value {value:?} for field '{key}' in {app} is not a valid {expected}")]
    FieldInvalidType {
        app: String,
        key: String,
        value: String,
        expected: FieldType,
        #[source]
        source: ConvertError,
    },

    #[error("failed to load config {path}")]
    ConfigParse {
        app: Option<String>,
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to write config {path} for {app}")]
    ConfigWrite {
        app: String,
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("hook {lifecycle} failed for {app}")]
    Hook {
        app: String,
        lifecycle: String,
        #[source]
        source: HookError,
    },
}

impl ToggleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToggleError::AppNotFound { .. } => ErrorKind::AppNotFound,
            ToggleError::PresetNotFound { .. } => ErrorKind::PresetNotFound,
            ToggleError::FieldNotFound { .. } => ErrorKind::FieldNotFound,
            ToggleError::FieldInvalidValue { .. } => ErrorKind::FieldInvalidValue,
            ToggleError::FieldInvalidType { .. } => ErrorKind::FieldInvalidType,
            ToggleError::ConfigParse { .. } => ErrorKind::ConfigParse,
            ToggleError::ConfigWrite { .. } => ErrorKind::ConfigWrite,
            ToggleError::Hook { .. } => ErrorKind::HookFailed,
        }
    }

    /// App the error refers to, when known.
    pub fn app(&self) -> Option<&str> {
        match self {
            ToggleError::AppNotFound { app, .. }
            | ToggleError::PresetNotFound { app, .. }
            | ToggleError::FieldNotFound { app, .. }
            | ToggleError::FieldInvalidValue { app, .. }
            | ToggleError::FieldInvalidType { app, .. }
            | ToggleError::ConfigWrite { app, .. }
            | ToggleError::Hook { app, .. } => Some(app),
            ToggleError::ConfigParse { app, .. } => app.as_deref(),
        }
    }

    /// Things the user can try next: known names, allowed values or a hint.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ToggleError::AppNotFound { known, .. } => known.clone(),
            ToggleError::PresetNotFound { available, .. }
            | ToggleError::FieldNotFound { available, .. } => available.clone(),
            ToggleError::FieldInvalidValue { allowed, .. } => allowed.clone(),
            ToggleError::FieldInvalidType {
                expected, source, ..
            } => match source {
                ConvertError::NoCycleValues => {
                    vec!["declare `values` for this field to cycle it".to_string()]
                }
                ConvertError::NotAList { .. } => {
                    vec!["only list-valued settings support append".to_string()]
                }
                ConvertError::InvalidType { .. } => vec![format!("provide a {expected} value")],
            },
            ToggleError::ConfigParse { .. } => {
                vec!["check the file exists and is readable".to_string()]
            }
            ToggleError::ConfigWrite { .. } => {
                vec!["check file permissions and disk space".to_string()]
            }
            ToggleError::Hook { source, .. } => match source {
                HookError::Validation(_) | HookError::Environment(_) => {
                    vec!["hooks may only run allow-listed commands with plain arguments".to_string()]
                }
                HookError::CommandNotFound(_) => {
                    vec!["install the command or remove the hook".to_string()]
                }
                _ => vec!["the configuration was saved; rerun the hook manually".to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        let err = ToggleError::AppNotFound {
            app: "nonexistent".into(),
            known: vec!["test-app".into()],
        };
        assert_eq!(err.kind(), ErrorKind::AppNotFound);
        assert_eq!(err.kind().to_string(), "APP_NOT_FOUND");
        assert_eq!(err.suggestions(), vec!["test-app"]);
        assert_eq!(err.app(), Some("nonexistent"));
        assert_eq!(err.to_string(), "app 'nonexistent' not found");
    }

    #[test]
    fn test_parse_hint() {
        let err = ToggleError::ConfigParse {
            app: None,
            path: "/x".into(),
            source: StoreError::NoHomeDir,
        };
        assert_eq!(err.kind().as_str(), "CONFIG_PARSE_ERROR");
        assert_eq!(err.app(), None);
        assert!(err.suggestions()[0].contains("readable"));
    }
}
