//! Command and environment policy for hooks.
//!
//! Pure functions: nothing here touches the filesystem or spawns processes.

use std::collections::BTreeMap;

use thiserror::Error;

/// Programs a hook may start.
pub const ALLOWED_COMMANDS: [&str; 19] = [
    "echo",
    "printf",
    "cat",
    "head",
    "tail",
    "wc",
    "grep",
    "sed",
    "awk",
    "sort",
    "uniq",
    "touch",
    "mkdir",
    "ls",
    "pwd",
    "notify-send",
    "osascript",
    "date",
    "sleep",
];

/// Literal fragments rejected anywhere in a command, compared lowercase.
const FORBIDDEN_SUBSTRINGS: &[&str] = &[
    "rm -rf",
    "rm -f",
    "2>&1",
    ">>",
    "<<",
    ">",
    "<",
    "/dev/null",
    "|",
    "&",
    ";",
    "`",
    "$",
    "(",
    "{",
    "su -",
    "chmod +x",
    "bash -c",
    "sh -c",
    "../",
    "./",
    "~",
    "/etc/",
    "/usr/",
    "/var/",
    "*",
    "?",
    "[",
    "]",
    "curl",
    "wget",
    "nc",
    "telnet",
    "ssh",
    "scp",
    "sudo",
    "chown",
    "setuid",
    "eval",
    "exec",
    "source",
];

/// Variables a hook may never set.
const DANGEROUS_ENV: &[&str] = &[
    "PATH",
    "LD_LIBRARY_PATH",
    "LD_PRELOAD",
    "LD_AUDIT",
    "HOME",
    "USER",
    "SHELL",
    "IFS",
    "TMPDIR",
    "SUDO_USER",
    "SUDO_COMMAND",
];

/// Why a hook command or its environment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("hook command is empty")]
    Empty,

    #[error("hook command contains forbidden pattern {0:?}")]
    ForbiddenPattern(String),

    #[error("hook command contains control character U+{0:04X}")]
    ControlCharacter(u32),

    #[error("hook command must be a bare program name, got {0:?}")]
    PathInvocation(String),

    #[error("{0:?} is not an allowed hook command")]
    NotAllowed(String),

    #[error("invalid environment variable name {0:?}")]
    InvalidEnvName(String),

    #[error("environment variable {0} may not be set by a hook")]
    DangerousEnvName(String),

    #[error("environment variable {0} has an unsafe value")]
    UnsafeEnvValue(String),
}

/// A command line that passed [`check_hook_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCommand {
    /// Bare allow-listed program name.
    pub program: String,
    pub args: Vec<String>,
}

impl HookCommand {
    pub fn command_line(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Validate a hook command line and split it into program and arguments.
pub fn check_hook_command(command: &str) -> Result<HookCommand, PolicyViolation> {
    let command = command.trim();
    if command.is_empty() {
        return Err(PolicyViolation::Empty);
    }

    let lower = command.to_lowercase();
    if let Some(pat) = FORBIDDEN_SUBSTRINGS.iter().find(|p| lower.contains(*p)) {
        return Err(PolicyViolation::ForbiddenPattern(pat.to_string()));
    }
    if let Some(c) = command
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(PolicyViolation::ControlCharacter(c as u32));
    }

    let mut tokens = command.split_whitespace();
    let program = tokens.next().ok_or(PolicyViolation::Empty)?;
    if program.contains(['/', '\\']) {
        return Err(PolicyViolation::PathInvocation(program.to_string()));
    }
    if !ALLOWED_COMMANDS.contains(&program) {
        return Err(PolicyViolation::NotAllowed(program.to_string()));
    }

    Ok(HookCommand {
        program: program.to_string(),
        args: tokens.map(str::to_string).collect(),
    })
}

/// Validate the variables a schema wants to pass to its hooks.
pub fn check_hook_env(env: &BTreeMap<String, String>) -> Result<(), PolicyViolation> {
    for (name, value) in env {
        if name.is_empty() || name.contains(['=', '\0']) {
            return Err(PolicyViolation::InvalidEnvName(name.clone()));
        }
        let upper = name.to_ascii_uppercase();
        if DANGEROUS_ENV.contains(&upper.as_str()) || upper.starts_with("DYLD_") {
            return Err(PolicyViolation::DangerousEnvName(name.clone()));
        }
        if value.contains(['`', '$', '\0']) {
            return Err(PolicyViolation::UnsafeEnvValue(name.clone()));
        }
    }
    Ok(())
}
