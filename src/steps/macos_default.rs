//! A single macOS default - `defaults read` / `defaults write`

use anyhow::{Result, bail};
use provision::{Invocation, Privilege, Step, StepContext, Touch};

use crate::schema::DefaultValue;

/// A macOS default preference
#[derive(Debug, Clone)]
pub struct MacOSDefault {
    /// Domain (e.g., "com.apple.finder")
    pub domain: String,
    /// Key (e.g., "ShowPathbar")
    pub key: String,
    /// Desired value
    pub value: DefaultValue,
    /// Whether this default requires sudo
    pub requires_sudo: bool,
}

impl MacOSDefault {
    pub fn new(domain: &str, key: &str, value: DefaultValue) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.to_string(),
            value,
            requires_sudo: false,
        }
    }

    pub fn with_sudo(mut self, requires: bool) -> Self {
        self.requires_sudo = requires;
        self
    }

    /// Parse "domain.key" format
    pub fn from_domain_key(domain_key: &str, value: DefaultValue) -> Result<Self> {
        if let Some(key) = domain_key.strip_prefix("NSGlobalDomain.") {
            return Ok(Self::new("NSGlobalDomain", key, value));
        }

        // The key follows the last dot
        match domain_key.rsplit_once('.') {
            Some((domain, key)) if !domain.is_empty() && !key.is_empty() => {
                Ok(Self::new(domain, key, value))
            }
            _ => bail!("Invalid domain.key format: {domain_key}"),
        }
    }

    fn read_current(&self, ctx: &StepContext<'_>) -> Result<Option<DefaultValue>> {
        let output = ctx.system.run(&Invocation::new(
            "defaults",
            ["read", self.domain.as_str(), self.key.as_str()],
        ))?;

        if !output.success() {
            // Key doesn't exist
            return Ok(None);
        }

        let stdout = output.stdout_str().trim().to_string();

        // Parse as the same type as the desired value
        let parsed = match &self.value {
            DefaultValue::Bool(_) => match stdout.as_str() {
                "1" | "true" => Some(DefaultValue::Bool(true)),
                "0" | "false" => Some(DefaultValue::Bool(false)),
                _ => None,
            },
            DefaultValue::Int(_) => stdout.parse::<i64>().ok().map(DefaultValue::Int),
            DefaultValue::Float(_) => stdout.parse::<f64>().ok().map(DefaultValue::Float),
            DefaultValue::String(_) => Some(DefaultValue::String(stdout)),
        };

        Ok(parsed)
    }

    fn write_args(&self) -> Vec<String> {
        let (type_flag, value) = match &self.value {
            DefaultValue::Bool(b) => ("-bool", b.to_string()),
            DefaultValue::Int(i) => ("-int", i.to_string()),
            DefaultValue::Float(f) => ("-float", f.to_string()),
            DefaultValue::String(s) => ("-string", s.clone()),
        };
        vec![
            "write".to_string(),
            self.domain.clone(),
            self.key.clone(),
            type_flag.to_string(),
            value,
        ]
    }
}

impl Step for MacOSDefault {
    fn id(&self) -> String {
        format!("defaults:{}.{}", self.domain, self.key)
    }

    fn description(&self) -> String {
        format!("Set {}.{} = {}", self.domain, self.key, display(&self.value))
    }

    fn touches(&self) -> &'static [Touch] {
        &[Touch::SystemPreferences]
    }

    fn privilege(&self) -> Privilege {
        if self.requires_sudo {
            Privilege::required(format!("Setting {}.{} requires sudo", self.domain, self.key))
        } else {
            Privilege::None
        }
    }

    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool> {
        Ok(self.read_current(ctx)?.as_ref() == Some(&self.value))
    }

    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut invocation = Invocation::new("defaults", self.write_args());
        if self.requires_sudo {
            invocation = invocation.privileged();
        }
        ctx.run(&invocation)?;
        Ok(())
    }
}

fn display(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Bool(b) => b.to_string(),
        DefaultValue::Int(i) => i.to_string(),
        DefaultValue::Float(f) => f.to_string(),
        DefaultValue::String(s) => format!("\"{s}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision::CommandOutput;
    use provision::testing::FakeSystem;

    #[test]
    fn test_from_domain_key() {
        let d = MacOSDefault::from_domain_key("com.apple.dock.autohide", DefaultValue::Bool(true))
            .unwrap();
        assert_eq!(d.domain, "com.apple.dock");
        assert_eq!(d.key, "autohide");

        let g = MacOSDefault::from_domain_key(
            "NSGlobalDomain.AppleShowAllExtensions",
            DefaultValue::Bool(true),
        )
        .unwrap();
        assert_eq!(g.domain, "NSGlobalDomain");
        assert_eq!(g.key, "AppleShowAllExtensions");

        assert!(MacOSDefault::from_domain_key("autohide", DefaultValue::Bool(true)).is_err());
        assert!(MacOSDefault::from_domain_key("com.apple.dock.", DefaultValue::Int(1)).is_err());
    }

    #[test]
    fn test_bool_read_as_integer() {
        let system = FakeSystem::new();
        system.respond("defaults read com.apple.dock autohide", CommandOutput::ok("1\n"));
        let ctx = StepContext::new(&system);

        let d = MacOSDefault::new("com.apple.dock", "autohide", DefaultValue::Bool(true));
        assert!(d.is_satisfied(&ctx).unwrap());

        let off = MacOSDefault::new("com.apple.dock", "autohide", DefaultValue::Bool(false));
        assert!(!off.is_satisfied(&ctx).unwrap());
    }

    #[test]
    fn test_missing_key_is_unsatisfied() {
        let system = FakeSystem::new();
        system.respond("defaults read", CommandOutput::failed(1, "does not exist"));
        let ctx = StepContext::new(&system);

        let d = MacOSDefault::new("com.apple.dock", "tilesize", DefaultValue::Int(36));
        assert!(!d.is_satisfied(&ctx).unwrap());
    }

    #[test]
    fn test_typed_write_and_sudo() {
        let system = FakeSystem::new();
        let mut ctx = StepContext::new(&system);

        MacOSDefault::new("com.apple.dock", "tilesize", DefaultValue::Int(36))
            .apply(&mut ctx)
            .unwrap();
        let guest = MacOSDefault::new(
            "/Library/Preferences/com.apple.loginwindow",
            "GuestEnabled",
            DefaultValue::Bool(false),
        )
        .with_sudo(true);
        assert!(guest.privilege().is_required());
        guest.apply(&mut ctx).unwrap();

        assert_eq!(
            system.command_lines(),
            vec![
                "defaults write com.apple.dock tilesize -int 36",
                "sudo defaults write /Library/Preferences/com.apple.loginwindow GuestEnabled -bool false",
            ]
        );
    }

    #[test]
    fn test_id_and_description() {
        let d = MacOSDefault::new(
            "NSGlobalDomain",
            "AppleInterfaceStyle",
            DefaultValue::String("Dark".to_string()),
        );
        assert_eq!(d.id(), "defaults:NSGlobalDomain.AppleInterfaceStyle");
        assert_eq!(d.description(), "Set NSGlobalDomain.AppleInterfaceStyle = \"Dark\"");
    }
}
