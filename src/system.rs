//! The real machine: spawns processes, probes PATH, downloads over HTTPS

use anyhow::{Context, Result};
use provision::{CommandOutput, Invocation, System};
use std::io::Write;
use std::process::{Command, Stdio};

const USER_AGENT: &str = concat!("primer/", env!("CARGO_PKG_VERSION"));

/// [`System`] implementation backed by `std::process` and `ureq`
pub struct MacSystem {
    agent: ureq::Agent,
}

impl MacSystem {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = if invocation.privileged {
            let mut c = Command::new("sudo");
            c.arg(&invocation.program);
            c
        } else {
            Command::new(&invocation.program)
        };
        cmd.args(&invocation.args);
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for MacSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MacSystem {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        log::debug!("exec: {}", invocation.command_line());
        let mut cmd = Self::command(invocation);

        if invocation.interactive {
            // Show output in real-time
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .with_context(|| format!("Failed to execute: {}", invocation.command_line()))?;
            return Ok(CommandOutput {
                code: status.code(),
                ..Default::default()
            });
        }

        let Some(input) = &invocation.stdin else {
            let output = cmd
                .stdin(Stdio::null())
                .output()
                .with_context(|| format!("Failed to execute: {}", invocation.command_line()))?;
            return Ok(output.into());
        };

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute: {}", invocation.command_line()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("Failed to write stdin of {}", invocation.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for: {}", invocation.command_line()))?;
        Ok(output.into())
    }

    fn command_exists(&self, program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn fetch(&self, url: &str) -> Result<String> {
        log::debug!("GET {url}");
        self.agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .with_context(|| format!("Failed to fetch {url}"))?
            .body_mut()
            .read_to_string()
            .with_context(|| format!("Failed to read response body from {url}"))
    }
}
