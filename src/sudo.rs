//! Sudo-backed elevation for a provisioning run
//!
//! Sudo is never requested up front. The runner acquires it right before the
//! first privileged step that actually has work to do, a keep-alive refreshes
//! the timestamp while the run lasts, and it is invalidated when the run ends.

use anyhow::{Context, Result, bail};
use provision::Elevation;
use std::process::{Command, Stdio};

use crate::ui;

/// Elevation through `sudo`'s cached credentials
pub struct SudoSession;

impl SudoSession {
    /// Check if sudo is currently valid (without prompting)
    pub fn is_valid() -> bool {
        Command::new("sudo")
            .args(["-n", "true"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Elevation for SudoSession {
    fn acquire(&self, reason: &str) -> Result<()> {
        if Self::is_valid() {
            log::debug!("sudo timestamp already valid");
            return Ok(());
        }

        // Prompt user with reason
        eprintln!();
        ui::info(&format!("Administrator access required: {reason}"));

        // Validate sudo (will prompt for password)
        let status = Command::new("sudo")
            .arg("-v")
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        // -n: never prompt from the background thread
        let status = Command::new("sudo")
            .args(["-n", "-v"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("sudo timestamp expired");
        }
        Ok(())
    }

    fn release(&self) {
        // Invalidate sudo timestamp to release privileges
        let _ = Command::new("sudo").arg("-k").status();
    }
}
