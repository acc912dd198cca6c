//! Core types for provisioning runs

use std::fmt;
use std::process::Output;
use thiserror::Error;

/// Requirement level for elevated privileges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Privilege {
    /// Runs as the invoking user
    #[default]
    None,
    /// Needs an elevated session, with a reason shown to the operator
    Required { reason: String },
}

impl Privilege {
    /// Shorthand for `Privilege::Required`
    pub fn required(reason: impl Into<String>) -> Self {
        Self::Required {
            reason: reason.into(),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required { .. })
    }
}

/// Machine state a step reads or mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Touch {
    /// Package manager installation and its package database
    PackageManager,
    /// OS preference stores (`defaults`, `scutil`, `systemsetup`, `spctl`)
    SystemPreferences,
    /// Files under the operator's home directory
    Filesystem,
    /// Remote hosts (downloads, clones)
    Network,
    /// Shell startup files
    Shell,
}

impl fmt::Display for Touch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PackageManager => "package manager",
            Self::SystemPreferences => "system preferences",
            Self::Filesystem => "filesystem",
            Self::Network => "network",
            Self::Shell => "shell",
        };
        f.write_str(name)
    }
}

/// Outcome of a single step within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Precondition already held, nothing was done
    AlreadySatisfied,
    /// The step's action ran and succeeded
    Applied,
    /// Dry run: the step would have been applied
    Pending,
}

/// Per-step record in a finished run
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub index: usize,
    pub id: String,
    pub description: String,
    pub outcome: StepOutcome,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.count(&StepOutcome::Applied)
    }

    pub fn satisfied(&self) -> usize {
        self.count(&StepOutcome::AlreadySatisfied)
    }

    pub fn pending(&self) -> usize {
        self.count(&StepOutcome::Pending)
    }

    pub fn total(&self) -> usize {
        self.steps.len()
    }

    /// True when every step was already satisfied
    pub fn is_noop(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.outcome == StepOutcome::AlreadySatisfied)
    }

    fn count(&self, outcome: &StepOutcome) -> usize {
        self.steps.iter().filter(|s| &s.outcome == outcome).count()
    }
}

/// Options for a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Check preconditions only, never apply
    pub dry_run: bool,
    /// How often the keep-alive refreshes the elevated session
    pub keepalive_interval: std::time::Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            keepalive_interval: std::time::Duration::from_secs(60),
        }
    }
}

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Run through the elevation mechanism (`sudo`)
    pub privileged: bool,
    /// Data written to the child's stdin
    pub stdin: Option<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Connect the child to the terminal instead of capturing output
    pub interactive: bool,
    /// Argument values masked in [`Invocation::command_line`]
    pub secrets: Vec<String>,
    /// Working directory, inherited when `None`
    pub cwd: Option<std::path::PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            privileged: false,
            stdin: None,
            env: Vec::new(),
            interactive: false,
            secrets: Vec::new(),
            cwd: None,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn in_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Mask an argument value (e.g. a passphrase) in logs and errors
    pub fn with_secret(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            self.secrets.push(secret.to_string());
        }
        self
    }

    /// Command line for display and logs, privilege prefix included
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if self.privileged {
            parts.push("sudo");
        }
        parts.push(self.program.as_str());
        for arg in &self.args {
            if self.secrets.contains(arg) {
                parts.push("****");
            } else {
                parts.push(arg.as_str());
            }
        }
        parts.join(" ")
    }
}

/// Output from an external command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            code: output.status.code(),
        }
    }
}

impl CommandOutput {
    /// A successful output with the given stdout
    pub fn ok(stdout: &str) -> Self {
        Self {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            code: Some(0),
        }
    }

    /// A failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
            code: Some(code),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Turn a non-zero exit into a [`CommandFailed`] error
    pub fn ensure_success(self, invocation: &Invocation) -> Result<Self, CommandFailed> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandFailed {
                command: invocation.command_line(),
                code: self.code,
                stderr: self.stderr_str().trim().to_string(),
            })
        }
    }
}

/// An external command exited unsuccessfully
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{command}` exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
pub struct CommandFailed {
    pub command: String,
    pub code: Option<i32>,
    pub stderr: String,
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_includes_sudo_prefix() {
        let inv = Invocation::new("scutil", ["--set", "HostName", "mac"]).privileged();
        assert_eq!(inv.command_line(), "sudo scutil --set HostName mac");
    }

    #[test]
    fn test_command_line_masks_secrets() {
        let inv = Invocation::new("ssh-keygen", ["-N", "hunter2", "-f", "key"]).with_secret("hunter2");
        assert_eq!(inv.command_line(), "ssh-keygen -N **** -f key");
    }

    #[test]
    fn test_ensure_success_maps_exit_code() {
        let inv = Invocation::new("brew", ["install", "nope"]);
        let err = CommandOutput::failed(3, "No available formula\n")
            .ensure_success(&inv)
            .unwrap_err();
        assert_eq!(err.code, Some(3));
        assert_eq!(
            err.to_string(),
            "`brew install nope` exited with status 3: No available formula"
        );
    }

    #[test]
    fn test_report_counts() {
        let record = |i, outcome| StepRecord {
            index: i,
            id: format!("s{i}"),
            description: String::new(),
            outcome,
        };
        let report = RunReport {
            steps: vec![
                record(1, StepOutcome::Applied),
                record(2, StepOutcome::AlreadySatisfied),
                record(3, StepOutcome::AlreadySatisfied),
            ],
        };
        assert_eq!(report.applied(), 1);
        assert_eq!(report.satisfied(), 2);
        assert_eq!(report.pending(), 0);
        assert!(!report.is_noop());
    }
}
