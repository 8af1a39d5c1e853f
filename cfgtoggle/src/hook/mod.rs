//! Post-change hooks.
//!
//! A hook is one command line declared in the app schema under a lifecycle
//! name. Every run goes through the same stages:
//!
//! 1. validate the command and the schema's `env` against [`policy`]
//! 2. resolve the bare program name on `PATH`
//! 3. execute in a fresh scratch directory with a minimal environment,
//!    bounded by the runner's timeout
//!
//! Nothing is retried. The schema's `env` entries are given to the child only;
//! the engine's own environment is never modified.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fmt,
    process::ExitStatus,
    time::{Duration, Instant},
};

use appcfg::AppSchema;
use tempfile::TempDir;
use thiserror::Error;

use crate::options::DEFAULT_HOOK_TIMEOUT;

pub mod command;
pub mod policy;

pub use command::{SandboxCommand, resolve_program};
pub use policy::{HookCommand, PolicyViolation, check_hook_command, check_hook_env};

/// Points after a successful change at which a hook may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    PostToggle,
    PostCycle,
    PostPreset,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::PostToggle => "post-toggle",
            Lifecycle::PostCycle => "post-cycle",
            Lifecycle::PostPreset => "post-preset",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("validation failed: {0}")]
    Validation(PolicyViolation),

    #[error("environment rejected: {0}")]
    Environment(PolicyViolation),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// A hook that ran to successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub lifecycle: Lifecycle,
    pub command: String,
    pub elapsed: Duration,
}

/// Executes schema hooks.
#[derive(Debug, Clone)]
pub struct HookRunner {
    timeout: Duration,
    search_path: Option<OsString>,
}

impl Default for HookRunner {
    fn default() -> Self {
        Self::new(DEFAULT_HOOK_TIMEOUT)
    }
}

impl HookRunner {
    /// Runner resolving programs on this process' `PATH`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Replace the directories searched for hook programs.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Run the schema's hook for `lifecycle`, if it declares one.
    pub fn run_hooks(
        &self,
        schema: &AppSchema,
        lifecycle: Lifecycle,
    ) -> Result<Option<HookOutcome>, HookError> {
        let Some(command) = schema.hook(lifecycle.as_str()) else {
            trace!("{}: no {lifecycle} hook", schema.name);
            return Ok(None);
        };
        info!("Running {lifecycle} hook for {}", schema.name);
        self.run_command(command, &schema.env, lifecycle).map(Some)
    }

    /// Validate, resolve and execute one command line.
    pub fn run_command(
        &self,
        command: &str,
        env: &BTreeMap<String, String>,
        lifecycle: Lifecycle,
    ) -> Result<HookOutcome, HookError> {
        let hook = check_hook_command(command).map_err(|v| {
            error!("Rejected {lifecycle} hook {command:?}: {v}");
            HookError::Validation(v)
        })?;
        check_hook_env(env).map_err(|v| {
            error!("Rejected {lifecycle} hook environment: {v}");
            HookError::Environment(v)
        })?;

        let executable = resolve_program(&hook.program, self.search_path.as_deref())
            .ok_or_else(|| HookError::CommandNotFound(hook.program.clone()))?;
        debug!("Resolved {} to {}", hook.program, executable.display());

        let scratch = TempDir::with_prefix("cfgtoggle-hook-").map_err(|e| HookError::Spawn {
            program: hook.program.clone(),
            source: e,
        })?;

        let mut cmd = SandboxCommand::new(&executable, scratch.path(), self.search_path.as_deref());
        cmd.args(&hook.args);
        cmd.scoped_envs(env);

        let started = Instant::now();
        let status = cmd.run_with_timeout(self.timeout)?;
        if !status.success() {
            return Err(HookError::Failed {
                program: hook.program,
                status,
            });
        }

        Ok(HookOutcome {
            lifecycle,
            command: hook.command_line(),
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use ntest::timeout;

    fn schema_with_hook(command: &str) -> AppSchema {
        AppSchema::new("app", "/tmp/app.json", "json").with_hook("post-toggle", command)
    }

    #[test]
    fn test_missing_hook_is_ok() {
        let runner = HookRunner::default();
        let schema = AppSchema::new("app", "/tmp/app.json", "json");
        assert!(runner.run_hooks(&schema, Lifecycle::PostCycle).unwrap().is_none());
    }

    #[test]
    #[timeout(10000)]
    fn test_runs_allowed_command() {
        let runner = HookRunner::default();
        let outcome = runner
            .run_hooks(&schema_with_hook("echo hello"), Lifecycle::PostToggle)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.command, "echo hello");
        assert_eq!(outcome.lifecycle, Lifecycle::PostToggle);
    }

    #[test]
    fn test_rejected_before_execution() {
        let runner = HookRunner::default();
        for cmd in ["rm -rf /", "curl http://x", "./script.sh"] {
            let err = runner
                .run_hooks(&schema_with_hook(cmd), Lifecycle::PostToggle)
                .unwrap_err();
            assert!(matches!(err, HookError::Validation(_)), "{cmd}");
        }
        let err = runner
            .run_hooks(
                &schema_with_hook("nonexistent-command-that-should-fail"),
                Lifecycle::PostToggle,
            )
            .unwrap_err();
        assert!(matches!(err, HookError::Validation(PolicyViolation::NotAllowed(_))));
    }

    #[test]
    fn test_env_rejected() {
        let schema = schema_with_hook("echo hi").with_env("LD_PRELOAD", "/tmp/x.so");
        let err = HookRunner::default()
            .run_hooks(&schema, Lifecycle::PostToggle)
            .unwrap_err();
        assert!(matches!(err, HookError::Environment(_)));
    }

    #[test]
    fn test_command_not_found() {
        let empty = tempfile::tempdir().unwrap();
        let runner = HookRunner::default().with_search_path(empty.path());
        let err = runner
            .run_hooks(&schema_with_hook("echo hi"), Lifecycle::PostToggle)
            .unwrap_err();
        assert!(matches!(err, HookError::CommandNotFound(ref p) if p == "echo"));
    }

    #[test]
    #[timeout(10000)]
    fn test_non_zero_exit() {
        let err = HookRunner::default()
            .run_hooks(
                &schema_with_hook("ls definitely-missing-entry"),
                Lifecycle::PostToggle,
            )
            .unwrap_err();
        assert!(matches!(err, HookError::Failed { .. }));
    }

    #[test]
    #[timeout(10000)]
    fn test_timeout_kills_child() {
        let runner = HookRunner::new(Duration::from_millis(200));
        let started = Instant::now();
        let err = runner
            .run_hooks(&schema_with_hook("sleep 30"), Lifecycle::PostToggle)
            .unwrap_err();
        assert!(matches!(err, HookError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    #[timeout(10000)]
    fn test_env_scoped_to_child() {
        let schema = schema_with_hook("echo scoped").with_env("CFGTOGGLE_TEST_SCOPED", "1");
        HookRunner::default()
            .run_hooks(&schema, Lifecycle::PostToggle)
            .unwrap();
        assert!(std::env::var_os("CFGTOGGLE_TEST_SCOPED").is_none());
    }
}
