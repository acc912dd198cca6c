use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Persistent record of what primer has already done on this machine
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PrimerState {
    /// Remote defaults scripts applied, keyed by URL
    #[serde(default)]
    pub defaults_scripts: BTreeMap<String, AppliedScript>,

    /// Dotfiles checkouts whose bootstrap script has run, keyed by path
    #[serde(default)]
    pub dotfiles_bootstrapped: BTreeMap<String, DateTime<Utc>>,

    /// Last run that finished without error
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

/// A remote script that was run successfully
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppliedScript {
    /// blake3 hash of the script body
    pub hash: String,
    pub applied_at: DateTime<Utc>,
}

/// Hash used to recognise a script body that was already applied
pub fn content_hash(body: &str) -> String {
    blake3::hash(body.as_bytes()).to_hex().to_string()
}

// ============================================================================
// PrimerState Implementation
// ============================================================================

impl PrimerState {
    /// Get the state file path
    pub fn state_file() -> Result<PathBuf> {
        Ok(crate::paths::state_dir()?.join("state.toml"))
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Whether `body` is exactly what was last applied from `url`
    pub fn script_applied(&self, url: &str, body: &str) -> bool {
        self.defaults_scripts
            .get(url)
            .is_some_and(|s| s.hash == content_hash(body))
    }

    pub fn mark_script_applied(&mut self, url: &str, body: &str) {
        self.defaults_scripts.insert(
            url.to_string(),
            AppliedScript {
                hash: content_hash(body),
                applied_at: Utc::now(),
            },
        );
    }

    pub fn is_bootstrapped(&self, checkout: &Path) -> bool {
        self.dotfiles_bootstrapped
            .contains_key(&checkout.display().to_string())
    }

    pub fn mark_bootstrapped(&mut self, checkout: &Path) {
        self.dotfiles_bootstrapped
            .insert(checkout.display().to_string(), Utc::now());
    }

    /// Load, change and save in one go
    pub fn update(path: &Path, change: impl FnOnce(&mut Self)) -> Result<()> {
        let mut state = Self::load_from(path)?;
        change(&mut state);
        state.save_to(path)
    }

    /// Stamp a successful run and save
    pub fn touch_run(path: &Path) -> Result<()> {
        Self::update(path, |state| state.last_run = Some(Utc::now()))
    }
}
