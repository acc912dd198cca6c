use anyhow::{Result, bail};
use provision::{Invocation, Step, StepContext, Touch};
use std::path::PathBuf;

use crate::state::PrimerState;

/// Clone the dotfiles repository and run its bootstrap script once
#[derive(Debug)]
pub struct Dotfiles {
    pub repo: String,
    pub path: PathBuf,
    pub branch: String,
    /// Script relative to the checkout
    pub bootstrap: Option<String>,
    /// Where completed bootstraps are recorded
    pub state_file: PathBuf,
}

impl Dotfiles {
    fn is_checkout(&self) -> bool {
        self.path.join(".git").exists()
    }

    fn needs_bootstrap(&self) -> Result<bool> {
        if self.bootstrap.is_none() {
            return Ok(false);
        }
        Ok(!PrimerState::load_from(&self.state_file)?.is_bootstrapped(&self.path))
    }

    fn clone_repo(&self, ctx: &StepContext<'_>) -> Result<()> {
        if self.path.exists() && self.path.read_dir()?.next().is_some() {
            bail!(
                "{} exists but is not a git checkout; move it aside and run primer again",
                self.path.display()
            );
        }

        let target = self.path.display().to_string();
        ctx.run(
            &Invocation::new(
                "git",
                [
                    "clone",
                    "--branch",
                    self.branch.as_str(),
                    self.repo.as_str(),
                    target.as_str(),
                ],
            )
            .interactive(),
        )?;
        Ok(())
    }
}

impl Step for Dotfiles {
    fn id(&self) -> String {
        "dotfiles".to_string()
    }

    fn description(&self) -> String {
        format!("Clone dotfiles into {}", self.path.display())
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::Filesystem, Touch::Network]
    }

    fn is_satisfied(&self, _ctx: &StepContext<'_>) -> Result<bool> {
        Ok(self.is_checkout() && !self.needs_bootstrap()?)
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !self.is_checkout() {
            self.clone_repo(ctx)?;
        }

        if let Some(script) = &self.bootstrap
            && self.needs_bootstrap()?
        {
            log::info!("running dotfiles bootstrap {script}");
            ctx.run(
                &Invocation::new("/bin/bash", [script.as_str()])
                    .in_dir(&self.path)
                    .interactive(),
            )?;
            PrimerState::update(&self.state_file, |s| s.mark_bootstrapped(&self.path))?;
        }
        Ok(())
    }
}
