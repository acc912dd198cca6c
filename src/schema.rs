use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Main Config Schema
// ============================================================================

/// The primer configuration file (`config.toml`)
///
/// Every section is optional; an absent file is the same as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimerConfig {
    /// Overrides for the interactive settings' defaults
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Homebrew packages
    #[serde(default)]
    pub packages: PackagesConfig,

    /// Shell plugins sourced from the rc file
    #[serde(default)]
    pub shell: ShellConfig,

    /// Dotfiles repository
    #[serde(default)]
    pub dotfiles: Option<DotfilesConfig>,

    /// SSH key generation
    #[serde(default)]
    pub ssh: SshConfig,

    /// macOS defaults written after the remote defaults script
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Privilege allowlist
    #[serde(default)]
    pub sudo: SudoConfig,
}

impl PrimerConfig {
    /// `config.toml` in the config directory
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::paths::config_dir()?.join("config.toml"))
    }

    /// Load a config file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(dotfiles) = &self.dotfiles {
            dotfiles.validate().context("Invalid [dotfiles]")?;
        }
        self.ssh.validate().context("Invalid [ssh]")?;

        for key in self.defaults.settings.keys() {
            if !key.contains('.') {
                bail!("Invalid defaults key '{key}': expected 'domain.key'");
            }
        }

        for plugin in &self.shell.plugins {
            if plugin.contains('/') || plugin.contains(char::is_whitespace) {
                bail!("Invalid shell plugin name '{plugin}'");
            }
        }

        Ok(())
    }
}

// ============================================================================
// Settings - defaults for the interactive prompts
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub timezone: Option<String>,
    pub computer_name: Option<String>,
    pub gatekeeper: Option<bool>,
    pub defaults_url: Option<String>,
}

// ============================================================================
// Packages - Homebrew
// ============================================================================

/// Homebrew packages; `None` means "use the built-in list"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagesConfig {
    #[serde(default)]
    pub taps: Vec<String>,
    #[serde(default = "default_formulae")]
    pub formulae: Vec<String>,
    #[serde(default = "default_casks")]
    pub casks: Vec<String>,
    #[serde(default = "default_fonts")]
    pub fonts: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            taps: Vec::new(),
            formulae: default_formulae(),
            casks: default_casks(),
            fonts: default_fonts(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_formulae() -> Vec<String> {
    strings(&[
        "git",
        "gh",
        "ripgrep",
        "fd",
        "jq",
        "starship",
        "zsh-autosuggestions",
        "zsh-syntax-highlighting",
    ])
}

fn default_casks() -> Vec<String> {
    strings(&["iterm2", "visual-studio-code", "rectangle"])
}

fn default_fonts() -> Vec<String> {
    strings(&["font-fira-code", "font-jetbrains-mono-nerd-font"])
}

// ============================================================================
// Shell
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_rc_file")]
    pub rc_file: String,
    /// Brew formulae that ship `share/<name>/<name>.zsh`
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            rc_file: default_rc_file(),
            plugins: default_plugins(),
        }
    }
}

fn default_rc_file() -> String {
    "~/.zshrc".to_string()
}

fn default_plugins() -> Vec<String> {
    strings(&["zsh-autosuggestions", "zsh-syntax-highlighting"])
}

// ============================================================================
// Dotfiles
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotfilesConfig {
    /// Git URL to clone
    pub repo: String,
    #[serde(default = "default_dotfiles_path")]
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Script inside the repo run once after cloning (e.g. `install.sh`)
    #[serde(default)]
    pub bootstrap: Option<String>,
}

impl DotfilesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.repo.trim().is_empty() {
            bail!("repo must not be empty");
        }
        if let Some(script) = &self.bootstrap
            && (script.starts_with('/') || script.split('/').any(|p| p == ".."))
        {
            bail!("bootstrap must be a path inside the repository, got '{script}'");
        }
        Ok(())
    }
}

fn default_dotfiles_path() -> String {
    "~/.dotfiles".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

// ============================================================================
// SSH
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_key_type")]
    pub key_type: String,
    /// Private key path; defaults to `~/.ssh/id_<key_type>`
    #[serde(default)]
    pub path: Option<String>,
    /// Key comment; defaults to `<user>@<computer name>`
    #[serde(default)]
    pub comment: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            key_type: default_key_type(),
            path: None,
            comment: None,
        }
    }
}

impl SshConfig {
    pub fn validate(&self) -> Result<()> {
        match self.key_type.as_str() {
            "ed25519" | "ecdsa" | "rsa" => Ok(()),
            other => bail!("unsupported key_type '{other}' (expected ed25519, ecdsa or rsa)"),
        }
    }

    /// Private key path, unexpanded
    pub fn key_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("~/.ssh/id_{}", self.key_type))
    }
}

fn default_key_type() -> String {
    "ed25519".to_string()
}

// ============================================================================
// Defaults - macOS defaults configuration
// ============================================================================

/// macOS defaults configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Key-value pairs for defaults (domain.key = value)
    #[serde(flatten)]
    pub settings: BTreeMap<String, DefaultValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Privilege allowlist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SudoConfig {
    /// `domain.key` entries written with sudo
    #[serde(default)]
    pub defaults: Vec<String>,
}

impl SudoConfig {
    /// Check if a default requires sudo
    pub fn default_requires_sudo(&self, domain_key: &str) -> bool {
        self.defaults.iter().any(|d| d == domain_key)
    }
}
