use anyhow::{Context, Result};
use provision::{Invocation, Step, StepContext, Touch};
use std::fs;
use std::path::PathBuf;

/// Generate the operator's SSH key pair
#[derive(Debug)]
pub struct SshKey {
    pub key_type: String,
    /// Private key path
    pub path: PathBuf,
    pub comment: String,
    pub passphrase: String,
}

impl SshKey {
    fn ensure_key_dir(&self) -> Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        if dir.exists() {
            return Ok(());
        }

        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("Failed to restrict {}", dir.display()))?;
        }
        Ok(())
    }
}

impl Step for SshKey {
    fn id(&self) -> String {
        "ssh-key".to_string()
    }

    fn description(&self) -> String {
        format!("Generate {} SSH key at {}", self.key_type, self.path.display())
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::Filesystem]
    }

    fn is_satisfied(&self, _ctx: &StepContext<'_>) -> Result<bool> {
        Ok(self.path.exists())
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        self.ensure_key_dir()?;

        let path = self.path.display().to_string();
        let mut args = vec!["-q", "-t", self.key_type.as_str()];
        if self.key_type == "rsa" {
            args.extend(["-b", "4096"]);
        }
        args.extend([
            "-N",
            self.passphrase.as_str(),
            "-C",
            self.comment.as_str(),
            "-f",
            path.as_str(),
        ]);

        ctx.run(&Invocation::new("ssh-keygen", args).with_secret(&self.passphrase))?;
        Ok(())
    }
}
