//! Homebrew itself, and package groups installed through it

use anyhow::{Context, Result, bail};
use provision::{Invocation, Privilege, Step, StepContext, System, Touch};

use super::missing_from;

const INSTALL_URL: &str = "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// Where the installer puts `brew` on Apple Silicon and Intel
const BREW_LOCATIONS: [&str; 2] = ["/opt/homebrew/bin/brew", "/usr/local/bin/brew"];

/// The `brew` executable to run
///
/// Right after a fresh install `brew` is usually not on this process's
/// `PATH` yet, so the standard install locations are tried too.
pub fn brew_program(system: &dyn System) -> Option<String> {
    if system.command_exists("brew") {
        return Some("brew".to_string());
    }
    BREW_LOCATIONS
        .iter()
        .find(|path| system.command_exists(path))
        .map(|path| (*path).to_string())
}

fn require_brew(system: &dyn System) -> Result<String> {
    match brew_program(system) {
        Some(brew) => Ok(brew),
        None => bail!("Homebrew is not installed"),
    }
}

/// The Homebrew package manager
#[derive(Debug)]
pub struct Homebrew;

impl Step for Homebrew {
    fn id(&self) -> String {
        "homebrew".to_string()
    }

    fn description(&self) -> String {
        "Install Homebrew".to_string()
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::PackageManager, Touch::Network]
    }

    /// With `NONINTERACTIVE` set the installer only uses `sudo -n`, so a
    /// cached sudo timestamp must exist before it starts
    fn privilege(&self) -> Privilege {
        Privilege::required("Installing Homebrew")
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        Ok(brew_program(ctx.system).is_some())
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let script = ctx
            .system
            .fetch(INSTALL_URL)
            .with_context(|| format!("Failed to download the Homebrew installer from {INSTALL_URL}"))?;
        ctx.run(&install_invocation(&script))?;

        if brew_program(ctx.system).is_none() {
            bail!(
                "Homebrew install script succeeded but `brew` is still not found.\n\
                 Add Homebrew to your PATH and run primer again."
            );
        }
        Ok(())
    }
}

/// `bash -c <installer>`, the shape of Homebrew's documented one-liner
fn install_invocation(script: &str) -> Invocation {
    Invocation::new("/bin/bash", ["-c", script])
        .with_env("NONINTERACTIVE", "1")
        // Keeps the installer body out of logs and error messages
        .with_secret(script)
        .interactive()
}

/// Kind of package group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Tap,
    Formula,
    Cask,
    /// Font casks, kept apart so they can be skipped on their own
    Font,
}

impl PackageKind {
    fn id(self) -> &'static str {
        match self {
            Self::Tap => "brew-taps",
            Self::Formula => "brew-formulae",
            Self::Cask => "brew-casks",
            Self::Font => "fonts",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Tap => "taps",
            Self::Formula => "formulae",
            Self::Cask => "casks",
            Self::Font => "fonts",
        }
    }

    fn list_args(self) -> &'static [&'static str] {
        match self {
            Self::Tap => &["tap"],
            Self::Formula => &["list", "--formula", "-1"],
            Self::Cask | Self::Font => &["list", "--cask", "-1"],
        }
    }
}

/// A group of Homebrew packages of one kind
#[derive(Debug)]
pub struct BrewPackages {
    pub kind: PackageKind,
    pub names: Vec<String>,
}

impl BrewPackages {
    pub fn new(kind: PackageKind, names: Vec<String>) -> Self {
        Self { kind, names }
    }

    fn missing(&self, ctx: &StepContext<'_>, brew: &str) -> Result<Vec<String>> {
        let listing = ctx.run(&Invocation::new(brew, self.kind.list_args().iter().copied()))?;
        Ok(missing_from(&listing, &self.names))
    }
}

impl Step for BrewPackages {
    fn id(&self) -> String {
        self.kind.id().to_string()
    }

    fn description(&self) -> String {
        let verb = if self.kind == PackageKind::Tap { "Tap" } else { "Install" };
        format!("{verb} Homebrew {} ({})", self.kind.noun(), self.names.len())
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::PackageManager, Touch::Network]
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        // Nothing can be installed yet; a dry run on a fresh machine lands here
        let Some(brew) = brew_program(ctx.system) else {
            return Ok(false);
        };
        Ok(self.missing(ctx, &brew)?.is_empty())
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let brew = require_brew(ctx.system)?;
        let missing = self.missing(ctx, &brew)?;
        log::info!("{}: installing {}", self.id(), missing.join(", "));

        match self.kind {
            PackageKind::Tap => {
                for tap in &missing {
                    ctx.run(&Invocation::new(&brew, ["tap", tap.as_str()]).interactive())?;
                }
            }
            PackageKind::Formula => {
                let args = ["install", "--formula"]
                    .into_iter()
                    .map(String::from)
                    .chain(missing);
                ctx.run(&Invocation::new(&brew, args).interactive())?;
            }
            PackageKind::Cask | PackageKind::Font => {
                let args = ["install", "--cask"]
                    .into_iter()
                    .map(String::from)
                    .chain(missing);
                ctx.run(&Invocation::new(&brew, args).interactive())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision::testing::FakeSystem;
    use provision::{CommandOutput, StepExt};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_homebrew_found_in_install_location() {
        let system = FakeSystem::new();
        assert_eq!(brew_program(&system), None);

        system.add_command("/opt/homebrew/bin/brew");
        assert_eq!(brew_program(&system).as_deref(), Some("/opt/homebrew/bin/brew"));

        system.add_command("brew");
        assert_eq!(brew_program(&system).as_deref(), Some("brew"));
    }

    #[test]
    fn test_homebrew_install_runs_downloaded_script() {
        let system = FakeSystem::new();
        system.serve(INSTALL_URL, "#!/bin/bash\necho installing\n");
        let mut ctx = StepContext::new(&system);
        assert!(!Homebrew.is_satisfied(&ctx).unwrap());

        // Install "succeeds" but brew never appears
        assert!(Homebrew.apply(&mut ctx).is_err());
        let inv = &system.invocations()[0];
        assert_eq!(inv.program, "/bin/bash");
        assert_eq!(inv.args, vec!["-c", "#!/bin/bash\necho installing\n"]);
        assert!(inv.env.contains(&("NONINTERACTIVE".to_string(), "1".to_string())));
        assert_eq!(inv.command_line(), "/bin/bash -c ****");
    }

    #[test]
    fn test_homebrew_download_failure_runs_nothing() {
        let system = FakeSystem::new();
        let mut ctx = StepContext::new(&system);

        let err = Homebrew.apply(&mut ctx).unwrap_err();
        assert!(format!("{err:#}").contains("Homebrew installer"));
        assert!(system.invocations().is_empty());
    }

    #[test]
    fn test_homebrew_requires_privilege() {
        assert!(Homebrew.requires_privilege());
        assert_eq!(Homebrew.privilege(), Privilege::required("Installing Homebrew"));
    }

    #[cfg(unix)]
    #[test]
    fn test_install_invocation_executes_script_body() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("installed");
        // A shebang line first, like the real installer
        let script = format!(
            "#!/bin/bash\nset -e\n[ \"$NONINTERACTIVE\" = 1 ]\ntouch '{}'\n",
            marker.display()
        );

        let out = crate::system::MacSystem::new()
            .run(&install_invocation(&script))
            .unwrap();

        assert_eq!(out.code, Some(0));
        assert!(marker.exists());
    }

    #[test]
    fn test_formulae_install_only_missing() {
        let system = FakeSystem::new();
        system.add_command("brew");
        system.respond("brew list --formula -1", CommandOutput::ok("git\nfd\n"));

        let step = BrewPackages::new(PackageKind::Formula, names(&["git", "jq", "fd", "gh"]));
        let mut ctx = StepContext::new(&system);
        assert!(!step.is_satisfied(&ctx).unwrap());

        step.apply(&mut ctx).unwrap();
        assert!(system.ran("brew install --formula jq gh"));
    }

    #[test]
    fn test_fonts_check_cask_list() {
        let system = FakeSystem::new();
        system.add_command("brew");
        system.respond("brew list --cask -1", CommandOutput::ok("font-fira-code\n"));

        let step = BrewPackages::new(PackageKind::Font, names(&["font-fira-code"]));
        let ctx = StepContext::new(&system);
        assert!(step.is_satisfied(&ctx).unwrap());
        assert_eq!(step.id(), "fonts");
    }

    #[test]
    fn test_taps_one_at_a_time() {
        let system = FakeSystem::new();
        system.add_command("brew");
        system.respond("brew tap", CommandOutput::ok("homebrew/core\n"));

        let step = BrewPackages::new(PackageKind::Tap, names(&["hashicorp/tap", "oven-sh/bun"]));
        let mut ctx = StepContext::new(&system);
        step.apply(&mut ctx).unwrap();

        assert!(system.ran("brew tap hashicorp/tap"));
        assert!(system.ran("brew tap oven-sh/bun"));
    }

    #[test]
    fn test_unsatisfied_without_brew() {
        let system = FakeSystem::new();
        let step = BrewPackages::new(PackageKind::Cask, names(&["iterm2"]));
        let ctx = StepContext::new(&system);
        assert!(!step.is_satisfied(&ctx).unwrap());
        assert!(system.invocations().is_empty());
    }

    #[test]
    fn test_list_failure_fails_step() {
        let system = FakeSystem::new();
        system.add_command("brew");
        system.respond("brew list", CommandOutput::failed(1, "Error: broken"));

        let step = BrewPackages::new(PackageKind::Cask, names(&["iterm2"]));
        let ctx = StepContext::new(&system);
        assert!(step.is_satisfied(&ctx).is_err());
    }
}
