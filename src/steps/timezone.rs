use anyhow::Result;
use provision::{Invocation, Privilege, Step, StepContext, Touch};

/// System timezone
#[derive(Debug)]
pub struct Timezone {
    pub zone: String,
}

impl Timezone {
    pub fn new(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
        }
    }
}

impl Step for Timezone {
    fn id(&self) -> String {
        "timezone".to_string()
    }

    fn description(&self) -> String {
        format!("Set timezone to {}", self.zone)
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::SystemPreferences]
    }

    fn privilege(&self) -> Privilege {
        Privilege::required("Setting the system timezone")
    }

    /// `systemsetup -gettimezone` itself needs root; the zoneinfo link does not
    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        let output = ctx
            .system
            .run(&Invocation::new("readlink", ["/etc/localtime"]))?;
        if !output.success() {
            return Ok(false);
        }
        let target = output.stdout_str();
        Ok(target.trim().ends_with(&format!("zoneinfo/{}", self.zone)))
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run(
            &Invocation::new("systemsetup", ["-settimezone", self.zone.as_str()]).privileged(),
        )?;
        Ok(())
    }
}
