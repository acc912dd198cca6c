use anyhow::{Result, bail};
use provision::{Invocation, Privilege, Step, StepContext, Touch};

/// Gatekeeper assessment policy
#[derive(Debug)]
pub struct Gatekeeper {
    pub enabled: bool,
}

/// Parse `spctl --status` output
fn parse_status(stdout: &str) -> Option<bool> {
    let status = stdout.trim();
    if status.ends_with("assessments enabled") {
        Some(true)
    } else if status.ends_with("assessments disabled") {
        Some(false)
    } else {
        None
    }
}

impl Step for Gatekeeper {
    fn id(&self) -> String {
        "gatekeeper".to_string()
    }

    fn description(&self) -> String {
        if self.enabled {
            "Enable Gatekeeper".to_string()
        } else {
            "Disable Gatekeeper".to_string()
        }
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::SystemPreferences]
    }

    fn privilege(&self) -> Privilege {
        Privilege::required("Changing the Gatekeeper policy")
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        // spctl exits 1 when assessments are disabled, so don't require success
        let output = ctx.system.run(&Invocation::new("spctl", ["--status"]))?;
        match parse_status(&output.stdout_str()) {
            Some(enabled) => Ok(enabled == self.enabled),
            None => bail!(
                "Unexpected `spctl --status` output: {}",
                output.stdout_str().trim()
            ),
        }
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let flag = if self.enabled {
            "--master-enable"
        } else {
            "--master-disable"
        };
        ctx.run(&Invocation::new("spctl", [flag]).privileged())?;
        Ok(())
    }
}
