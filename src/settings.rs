//! Operator settings - resolved defaults, prompts, and confirmation
//!
//! Every setting has a default: built-in, then the config file's
//! `[settings]`, then a CLI flag. That value is offered at the prompt and a
//! blank answer keeps it. Quiet mode skips the prompts altogether.

use anyhow::{Result, bail};
use provision::{Invocation, System};

use crate::prompt::Prompter;
use crate::schema::SettingsConfig;
use crate::ui;

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
pub const DEFAULT_DEFAULTS_URL: &str =
    "https://raw.githubusercontent.com/mathiasbynens/dotfiles/main/.macos";
const FALLBACK_COMPUTER_NAME: &str = "Mac";

/// Resolved settings every step reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub timezone: String,
    pub computer_name: String,
    /// Gatekeeper enabled
    pub gatekeeper: bool,
    /// Remote macOS defaults script
    pub defaults_url: String,
    /// SSH key passphrase, empty for none
    pub passphrase: String,
    pub quiet: bool,
}

/// Values offered as prompt defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDefaults {
    pub timezone: String,
    pub computer_name: String,
    pub gatekeeper: bool,
    pub defaults_url: String,
}

impl SettingsDefaults {
    /// Built-in defaults for a machine currently named `computer_name`
    pub fn builtin(computer_name: String) -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            computer_name,
            gatekeeper: true,
            defaults_url: DEFAULT_DEFAULTS_URL.to_string(),
        }
    }

    /// Layer overrides on top; later layers win
    pub fn with(mut self, layer: &SettingsConfig) -> Self {
        if let Some(tz) = non_blank(layer.timezone.as_deref()) {
            self.timezone = tz;
        }
        if let Some(name) = non_blank(layer.computer_name.as_deref()) {
            self.computer_name = name;
        }
        if let Some(enabled) = layer.gatekeeper {
            self.gatekeeper = enabled;
        }
        if let Some(url) = non_blank(layer.defaults_url.as_deref()) {
            self.defaults_url = url;
        }
        self
    }

    fn into_settings(self, passphrase: String, quiet: bool) -> Settings {
        Settings {
            timezone: self.timezone,
            computer_name: self.computer_name,
            gatekeeper: self.gatekeeper,
            defaults_url: self.defaults_url,
            passphrase,
            quiet,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Current computer name: `scutil`, then `hostname -s`, then "Mac"
pub fn detect_computer_name(system: &dyn System) -> String {
    let probes = [
        Invocation::new("scutil", ["--get", "ComputerName"]),
        Invocation::new("hostname", ["-s"]),
    ];
    for probe in &probes {
        match system.run_checked(probe) {
            Ok(out) if !out.trim().is_empty() => return out.trim().to_string(),
            Ok(_) => {}
            Err(e) => log::debug!("{}: {e:#}", probe.command_line()),
        }
    }
    FALLBACK_COMPUTER_NAME.to_string()
}

/// Ask for each setting, or take the defaults in quiet mode
///
/// `passphrase` comes from `--passphrase` or the environment; when given,
/// the passphrase prompt is skipped.
pub fn gather(
    prompter: &mut dyn Prompter,
    defaults: SettingsDefaults,
    quiet: bool,
    passphrase: Option<String>,
) -> Result<Settings> {
    if quiet {
        let settings = defaults.into_settings(passphrase.unwrap_or_default(), true);
        settings.validate()?;
        return Ok(settings);
    }

    let timezone = or_default(prompter.input("Timezone", &defaults.timezone)?, &defaults.timezone);
    let computer_name = or_default(
        prompter.input("Computer name", &defaults.computer_name)?,
        &defaults.computer_name,
    );
    let defaults_url = or_default(
        prompter.input("macOS defaults script URL", &defaults.defaults_url)?,
        &defaults.defaults_url,
    );
    let gatekeeper = prompter.confirm("Enable Gatekeeper?", defaults.gatekeeper)?;
    let passphrase = match passphrase {
        Some(p) => p,
        None => prompter.password("SSH key passphrase (blank for none)")?,
    };

    let settings = Settings {
        timezone,
        computer_name,
        gatekeeper,
        defaults_url,
        passphrase,
        quiet: false,
    };
    settings.validate()?;
    Ok(settings)
}

fn or_default(answer: String, default: &str) -> String {
    let answer = answer.trim();
    if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !self.timezone.contains('/') && self.timezone != "UTC" && self.timezone != "GMT" {
            bail!(
                "Invalid timezone '{}': expected an IANA name like Europe/Paris",
                self.timezone
            );
        }
        if self.computer_name.contains(['\n', '\r']) {
            bail!("Computer name must be a single line");
        }
        if !self.defaults_url.starts_with("https://") && !self.defaults_url.starts_with("http://") {
            bail!("Invalid defaults URL '{}': expected http(s)://", self.defaults_url);
        }
        Ok(())
    }

    /// Print the settings back to the operator, passphrase masked
    pub fn print_summary(&self) {
        ui::header("Settings");
        ui::kv("Timezone", &self.timezone);
        ui::kv("Computer name", &self.computer_name);
        ui::kv("Gatekeeper", if self.gatekeeper { "enabled" } else { "disabled" });
        ui::kv("Defaults URL", &self.defaults_url);
        ui::kv("SSH passphrase", ui::mask(&self.passphrase));
        println!();
    }
}

/// Final go/no-go; implied in quiet mode and with `--yes`
pub fn confirm(prompter: &mut dyn Prompter, settings: &Settings, yes: bool) -> Result<bool> {
    if settings.quiet || yes {
        return Ok(true);
    }
    prompter.confirm("Proceed with these settings?", true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use provision::CommandOutput;
    use provision::testing::FakeSystem;

    fn defaults() -> SettingsDefaults {
        SettingsDefaults::builtin("Studio".to_string())
    }

    #[test]
    fn test_blank_answers_yield_defaults() {
        let mut prompter = ScriptedPrompter::new(["", "", "", "", ""]);
        let settings = gather(&mut prompter, defaults(), false, None).unwrap();

        assert_eq!(settings.timezone, "Europe/Paris");
        assert_eq!(settings.computer_name, "Studio");
        assert_eq!(settings.defaults_url, DEFAULT_DEFAULTS_URL);
        assert!(settings.gatekeeper);
        assert_eq!(settings.passphrase, "");
        assert_eq!(prompter.reads, 5);
    }

    #[test]
    fn test_whitespace_only_is_blank() {
        let mut prompter = ScriptedPrompter::new(["   ", "\t", " ", "", ""]);
        let settings = gather(&mut prompter, defaults(), false, None).unwrap();
        assert_eq!(settings.timezone, "Europe/Paris");
        assert_eq!(settings.computer_name, "Studio");
    }

    #[test]
    fn test_quiet_reads_nothing_and_matches_blank_run() {
        let mut silent = ScriptedPrompter::new(Vec::<String>::new());
        let quiet = gather(&mut silent, defaults(), true, None).unwrap();
        assert_eq!(silent.reads, 0);

        let mut blank = ScriptedPrompter::new(["", "", "", "", ""]);
        let interactive = gather(&mut blank, defaults(), false, None).unwrap();

        assert_eq!(
            Settings {
                quiet: false,
                ..quiet
            },
            interactive
        );
    }

    #[test]
    fn test_answers_override_defaults() {
        let mut prompter = ScriptedPrompter::new([
            "America/New_York",
            "  work-mac ",
            "https://example.test/.macos",
            "n",
            "s3cret",
        ]);
        let settings = gather(&mut prompter, defaults(), false, None).unwrap();

        assert_eq!(settings.timezone, "America/New_York");
        assert_eq!(settings.computer_name, "work-mac");
        assert_eq!(settings.defaults_url, "https://example.test/.macos");
        assert!(!settings.gatekeeper);
        assert_eq!(settings.passphrase, "s3cret");
    }

    #[test]
    fn test_passphrase_flag_skips_prompt() {
        let mut prompter = ScriptedPrompter::new(["", "", "", ""]);
        let settings =
            gather(&mut prompter, defaults(), false, Some("from-env".to_string())).unwrap();
        assert_eq!(settings.passphrase, "from-env");
        assert_eq!(prompter.reads, 4);

        let mut silent = ScriptedPrompter::new(Vec::<String>::new());
        let quiet = gather(&mut silent, defaults(), true, Some("x".to_string())).unwrap();
        assert_eq!(quiet.passphrase, "x");
    }

    #[test]
    fn test_layers_apply_in_order() {
        let config = SettingsConfig {
            timezone: Some("Asia/Tokyo".to_string()),
            gatekeeper: Some(false),
            ..Default::default()
        };
        let flags = SettingsConfig {
            timezone: Some("America/Sao_Paulo".to_string()),
            computer_name: Some("  ".to_string()),
            ..Default::default()
        };
        let resolved = defaults().with(&config).with(&flags);

        assert_eq!(resolved.timezone, "America/Sao_Paulo");
        assert_eq!(resolved.computer_name, "Studio");
        assert!(!resolved.gatekeeper);
        assert_eq!(resolved.defaults_url, DEFAULT_DEFAULTS_URL);
    }

    #[test]
    fn test_layered_default_is_offered_at_prompt() {
        let config = SettingsConfig {
            timezone: Some("Asia/Tokyo".to_string()),
            ..Default::default()
        };
        let mut prompter = ScriptedPrompter::new(["", "", "", "", ""]);
        let settings = gather(&mut prompter, defaults().with(&config), false, None).unwrap();
        assert_eq!(settings.timezone, "Asia/Tokyo");
    }

    #[test]
    fn test_confirm_decline_and_implied() {
        let settings = gather(
            &mut ScriptedPrompter::new(Vec::<String>::new()),
            defaults(),
            true,
            None,
        )
        .unwrap();
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        assert!(confirm(&mut prompter, &settings, false).unwrap());
        assert_eq!(prompter.reads, 0);

        let interactive = Settings {
            quiet: false,
            ..settings
        };
        let mut decline = ScriptedPrompter::new(["n"]);
        assert!(!confirm(&mut decline, &interactive, false).unwrap());

        let mut yes = ScriptedPrompter::new(Vec::<String>::new());
        assert!(confirm(&mut yes, &interactive, true).unwrap());
        assert_eq!(yes.reads, 0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut prompter = ScriptedPrompter::new(["Paris", "", "", "", ""]);
        assert!(gather(&mut prompter, defaults(), false, None).is_err());

        let mut prompter = ScriptedPrompter::new(["", "", "ftp://nope", "", ""]);
        assert!(gather(&mut prompter, defaults(), false, None).is_err());
    }

    #[test]
    fn test_detect_computer_name_fallbacks() {
        let system = FakeSystem::new();
        system.respond("scutil --get ComputerName", CommandOutput::ok("Jo's MacBook\n"));
        assert_eq!(detect_computer_name(&system), "Jo's MacBook");

        let system = FakeSystem::new();
        system.respond("scutil", CommandOutput::failed(1, "not set"));
        system.respond("hostname -s", CommandOutput::ok("jo-mbp\n"));
        assert_eq!(detect_computer_name(&system), "jo-mbp");

        let system = FakeSystem::new();
        system.respond("scutil", CommandOutput::failed(1, ""));
        system.respond("hostname", CommandOutput::ok(""));
        assert_eq!(detect_computer_name(&system), "Mac");
    }
}
