use anyhow::{Result, bail};
use provision::{Invocation, Step, StepContext, Touch};

/// Xcode Command Line Tools (compilers, git, make)
#[derive(Debug)]
pub struct XcodeTools;

impl Step for XcodeTools {
    fn id(&self) -> String {
        "xcode-clt".to_string()
    }

    fn description(&self) -> String {
        "Install Xcode Command Line Tools".to_string()
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::PackageManager]
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        Ok(ctx.probe(&Invocation::new("xcode-select", ["-p"])))
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run(&Invocation::new("xcode-select", ["--install"]).interactive())?;

        // The installer runs in a separate GUI process
        if !ctx.probe(&Invocation::new("xcode-select", ["-p"])) {
            bail!(
                "Command Line Tools installer started; finish it in the dialog, then run primer again"
            );
        }
        Ok(())
    }
}
