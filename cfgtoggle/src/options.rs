use std::time::Duration;

/// Hard limit on a hook process' lifetime.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Flags fixed when the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Compute and report changes without saving or running hooks.
    pub dry_run: bool,
    /// Log the diff of every change, not only in dry-run mode.
    pub verbose: bool,
    pub hook_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verbose: false,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }
}

impl EngineOptions {
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }
}
