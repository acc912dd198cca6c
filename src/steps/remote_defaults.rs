use anyhow::{Context, Result, bail};
use provision::{Invocation, Step, StepContext, Touch};
use std::path::PathBuf;

use crate::state::PrimerState;

/// Run a remote shell script of macOS `defaults` (e.g. a `.macos` file)
///
/// The script is not idempotent in any checkable way, so the state file
/// records the hash of the body last run from this URL. Changing upstream
/// content makes the step pending again.
#[derive(Debug)]
pub struct RemoteDefaults {
    pub url: String,
    pub state_file: PathBuf,
}

impl RemoteDefaults {
    fn fetch(&self, ctx: &StepContext<'_>) -> Result<String> {
        let body = ctx
            .system
            .fetch(&self.url)
            .with_context(|| format!("Failed to download defaults script from {}", self.url))?;
        if body.trim().is_empty() {
            bail!("Defaults script at {} is empty", self.url);
        }
        Ok(body)
    }
}

impl Step for RemoteDefaults {
    fn id(&self) -> String {
        "macos-defaults".to_string()
    }

    fn description(&self) -> String {
        format!("Apply macOS defaults from {}", self.url)
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::Network, Touch::SystemPreferences]
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        let body = self.fetch(ctx)?;
        Ok(PrimerState::load_from(&self.state_file)?.script_applied(&self.url, &body))
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let body = self.fetch(ctx)?;
        ctx.run(&Invocation::new("/bin/bash", ["-s"]).with_stdin(body.clone()))?;
        PrimerState::update(&self.state_file, |s| s.mark_script_applied(&self.url, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision::CommandOutput;
    use provision::testing::FakeSystem;
    use tempfile::TempDir;

    const URL: &str = "https://example.test/.macos";

    #[test]
    fn test_runs_script_once_per_content() {
        let dir = TempDir::new().unwrap();
        let step = RemoteDefaults {
            url: URL.to_string(),
            state_file: dir.path().join("state.toml"),
        };
        let system = FakeSystem::new();
        system.serve(URL, "defaults write com.apple.dock autohide -bool true\n");
        let mut ctx = StepContext::new(&system);

        assert!(!step.is_satisfied(&ctx).unwrap());
        step.apply(&mut ctx).unwrap();

        let inv = system
            .invocations()
            .into_iter()
            .find(|i| i.program == "/bin/bash")
            .unwrap();
        assert_eq!(inv.args, vec!["-s"]);
        assert_eq!(
            inv.stdin.as_deref(),
            Some("defaults write com.apple.dock autohide -bool true\n")
        );
        assert!(step.is_satisfied(&ctx).unwrap());

        // Upstream edit
        system.serve(URL, "defaults write com.apple.dock autohide -bool false\n");
        assert!(!step.is_satisfied(&ctx).unwrap());
    }

    #[test]
    fn test_failed_script_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let step = RemoteDefaults {
            url: URL.to_string(),
            state_file: dir.path().join("state.toml"),
        };
        let system = FakeSystem::new();
        system.serve(URL, "exit 9\n");
        system.respond("/bin/bash -s", CommandOutput::failed(9, ""));
        let mut ctx = StepContext::new(&system);

        assert!(step.apply(&mut ctx).is_err());
        assert!(!step.is_satisfied(&ctx).unwrap());
    }

    #[test]
    fn test_unreachable_url_fails() {
        let dir = TempDir::new().unwrap();
        let step = RemoteDefaults {
            url: URL.to_string(),
            state_file: dir.path().join("state.toml"),
        };
        let system = FakeSystem::new();
        let ctx = StepContext::new(&system);
        let err = step.is_satisfied(&ctx).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to download"));
    }
}
