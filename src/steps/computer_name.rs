use anyhow::Result;
use provision::{Invocation, Privilege, Step, StepContext, Touch};

/// Computer, Bonjour and host names
#[derive(Debug)]
pub struct ComputerName {
    pub name: String,
}

impl ComputerName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// `(scutil key, desired value)` pairs
    fn targets(&self) -> [(&'static str, String); 3] {
        let host = local_host_name(&self.name);
        [
            ("ComputerName", self.name.clone()),
            ("LocalHostName", host.clone()),
            ("HostName", host),
        ]
    }

    fn current(ctx: &StepContext<'_>, key: &str) -> Result<Option<String>> {
        // `scutil --get` exits non-zero when the name is unset
        let output = ctx.system.run(&Invocation::new("scutil", ["--get", key]))?;
        Ok(output
            .success()
            .then(|| output.stdout_str().trim().to_string()))
    }
}

/// Bonjour-safe form of a computer name: `[A-Za-z0-9-]`, no leading,
/// trailing or doubled dashes
pub fn local_host_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "Mac".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Step for ComputerName {
    fn id(&self) -> String {
        "computer-name".to_string()
    }

    fn description(&self) -> String {
        format!("Set computer name to \"{}\"", self.name)
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::SystemPreferences]
    }

    fn privilege(&self) -> Privilege {
        Privilege::required("Changing the computer name")
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        for (key, want) in self.targets() {
            if Self::current(ctx, key)?.as_deref() != Some(want.as_str()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (key, want) in self.targets() {
            if Self::current(ctx, key)?.as_deref() == Some(want.as_str()) {
                continue;
            }
            ctx.run(&Invocation::new("scutil", ["--set", key, want.as_str()]).privileged())?;
        }
        Ok(())
    }
}
