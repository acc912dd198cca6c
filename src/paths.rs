//! Centralized path resolution for primer
//!
//! # Environment Variables
//!
//! - `PRIMER_CONFIG_DIR` - Override config directory
//! - `PRIMER_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PRIMER_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/primer` (if set)
//! 3. `~/.config/primer`
//!
//! For state_dir():
//! 1. `PRIMER_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/primer` (if set)
//! 3. `~/.local/state/primer`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PRIMER_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "PRIMER_STATE_DIR";

const APP_DIR: &str = "primer";

/// Get the primer config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = home_dir()?;
    let path = resolve(
        |key| std::env::var(key).ok(),
        &home,
        ENV_CONFIG_DIR,
        "XDG_CONFIG_HOME",
        &[".config"],
    );
    log::debug!("Using config dir: {}", path.display());
    Ok(path)
}

/// Get the primer state directory path
pub fn state_dir() -> Result<PathBuf> {
    let home = home_dir()?;
    let path = resolve(
        |key| std::env::var(key).ok(),
        &home,
        ENV_STATE_DIR,
        "XDG_STATE_HOME",
        &[".local", "state"],
    );
    log::debug!("Using state dir: {}", path.display());
    Ok(path)
}

/// The operator's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine home directory")
}

/// Shared resolution order: explicit override, XDG variable, home default
fn resolve<F>(env: F, home: &Path, override_var: &str, xdg_var: &str, default: &[&str]) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = env(override_var).filter(|d| !d.is_empty()) {
        return expand(&dir);
    }

    if let Some(xdg) = env(xdg_var).filter(|d| !d.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR);
    }

    let mut path = home.to_path_buf();
    for part in default {
        path.push(part);
    }
    path.join(APP_DIR)
}

/// Expand ~ and environment variables in a path string.
///
/// All modules should use this instead of calling shellexpand directly.
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Expand a path relative to an explicit home directory
///
/// Used where the home directory is injected (tests, alternate users)
/// rather than read from the environment.
pub fn expand_in(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home.join(rest);
    }
    expand(path)
}

// ============================================================================
// Tests
// ============================================================================
