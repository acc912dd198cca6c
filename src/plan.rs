//! Build the provisioning plan from settings and config

use anyhow::Result;
use provision::{Plan, parse_names};
use std::path::PathBuf;

use crate::paths;
use crate::schema::PrimerConfig;
use crate::settings::Settings;
use crate::steps::{
    BrewPackages, ComputerName, Dotfiles, Gatekeeper, Homebrew, MacOSDefault, PackageKind,
    RemoteDefaults, ShellPlugins, SshKey, Timezone, XcodeTools,
};

/// Stages in run order, as accepted by `--only`/`--skip`
pub const STAGES: &[&str] = &[
    "bootstrap",
    "defaults",
    "system",
    "packages",
    "shell",
    "dotfiles",
    "ssh",
];

/// Where things live on the machine being provisioned
#[derive(Debug, Clone)]
pub struct Machine {
    pub home: PathBuf,
    pub user: String,
    pub state_file: PathBuf,
}

impl Machine {
    pub fn current() -> Result<Self> {
        Ok(Self {
            home: paths::home_dir()?,
            user: std::env::var("USER").unwrap_or_else(|_| "user".to_string()),
            state_file: crate::state::PrimerState::state_file()?,
        })
    }

    fn path(&self, raw: &str) -> PathBuf {
        paths::expand_in(raw, &self.home)
    }
}

/// Map stage aliases to their canonical names
pub fn normalize_stage(name: &str) -> String {
    match name {
        "brew" => "packages".to_string(),
        other => other.to_string(),
    }
}

/// Parse a comma-separated `--only`/`--skip` list, resolving aliases
pub fn parse_selection(list: Option<&str>) -> Vec<String> {
    parse_names(list)
        .iter()
        .map(|n| normalize_stage(n))
        .collect()
}

/// Every step, in run order, for these settings
pub fn build(settings: &Settings, config: &PrimerConfig, machine: &Machine) -> Result<Plan> {
    let mut plan = Plan::new();
    plan.declare_stages(STAGES);

    // Bootstrap
    plan.push("bootstrap", XcodeTools);
    plan.push("bootstrap", Homebrew);

    // Defaults. A remote script may set its own timezone or Gatekeeper
    // posture, so it runs before the system stage applies the operator's.
    plan.push(
        "defaults",
        RemoteDefaults {
            url: settings.defaults_url.clone(),
            state_file: machine.state_file.clone(),
        },
    );
    for (domain_key, value) in &config.defaults.settings {
        let default = MacOSDefault::from_domain_key(domain_key, value.clone())?
            .with_sudo(config.sudo.default_requires_sudo(domain_key));
        plan.push("defaults", default);
    }

    // System preferences
    plan.push("system", Timezone::new(&settings.timezone));
    plan.push("system", ComputerName::new(&settings.computer_name));
    plan.push(
        "system",
        Gatekeeper {
            enabled: settings.gatekeeper,
        },
    );

    // Packages
    let packages = &config.packages;
    for (kind, names) in [
        (PackageKind::Tap, &packages.taps),
        (PackageKind::Formula, &packages.formulae),
        (PackageKind::Cask, &packages.casks),
        (PackageKind::Font, &packages.fonts),
    ] {
        if !names.is_empty() {
            plan.push("packages", BrewPackages::new(kind, names.clone()));
        }
    }

    // Shell
    if !config.shell.plugins.is_empty() {
        plan.push(
            "shell",
            ShellPlugins::new(
                machine.path(&config.shell.rc_file),
                config.shell.plugins.clone(),
            ),
        );
    }

    // Dotfiles
    if let Some(dotfiles) = &config.dotfiles {
        plan.push(
            "dotfiles",
            Dotfiles {
                repo: dotfiles.repo.clone(),
                path: machine.path(&dotfiles.path),
                branch: dotfiles.branch.clone(),
                bootstrap: dotfiles.bootstrap.clone(),
                state_file: machine.state_file.clone(),
            },
        );
    }

    // SSH
    let ssh = &config.ssh;
    plan.push(
        "ssh",
        SshKey {
            key_type: ssh.key_type.clone(),
            path: machine.path(&ssh.key_path()),
            comment: ssh
                .comment
                .clone()
                .unwrap_or_else(|| format!("{}@{}", machine.user, settings.computer_name)),
            passphrase: settings.passphrase.clone(),
        },
    );

    Ok(plan)
}
