//! Sandboxed child process for hooks.

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use super::HookError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A `std::process::Command` with a cleared environment, a scratch working
/// directory and disconnected stdin.
pub struct SandboxCommand {
    inner: std::process::Command,
    program: String,
}

impl Deref for SandboxCommand {
    type Target = std::process::Command;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SandboxCommand {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl SandboxCommand {
    /// Build a command for the resolved `executable`.
    ///
    /// The child sees only `PATH`, `HOME` and `TMPDIR`; the latter two point
    /// at `scratch`, which is also the working directory.
    pub fn new(executable: &Path, scratch: &Path, search_path: Option<&OsStr>) -> Self {
        let mut cmd = std::process::Command::new(executable);
        cmd.env_clear();
        if let Some(path) = search_path {
            cmd.env("PATH", path);
        }
        cmd.env("HOME", scratch);
        cmd.env("TMPDIR", scratch);
        cmd.current_dir(scratch);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        Self {
            inner: cmd,
            program: executable.display().to_string(),
        }
    }

    /// Add variables visible to this child only.
    pub fn scoped_envs(&mut self, env: &BTreeMap<String, String>) -> &mut Self {
        self.inner.envs(env);
        self
    }

    /// The command line as it will be executed.
    pub fn cmd_line(&self) -> String {
        let mut s = self.inner.get_program().to_string_lossy().to_string();
        for arg in self.inner.get_args() {
            s += " ";
            s += arg.to_string_lossy().as_ref();
        }
        s
    }

    /// Spawn and wait, killing the child once `timeout` has elapsed.
    pub fn run_with_timeout(&mut self, timeout: Duration) -> Result<ExitStatus, HookError> {
        debug!("Executing hook: {}", self.cmd_line());

        let mut child = self.inner.spawn().map_err(|e| HookError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;
        let deadline = Instant::now() + timeout;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!("Hook {} timed out after {:?}, killing", self.program, timeout);
                    // The child may exit between the last poll and the kill.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HookError::Timeout {
                        program: self.program.clone(),
                        timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(HookError::Spawn {
                        program: self.program.clone(),
                        source: e,
                    });
                }
            }
        }
    }
}

/// Find `name` on `search_path` the way a shell would, without a shell.
pub fn resolve_program(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .filter(|dir| dir.is_absolute())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
