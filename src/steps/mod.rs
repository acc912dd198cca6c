//! Provisioning steps
//!
//! Each step pairs a read-only `is_satisfied` query with an `apply` that
//! converges the machine, so the whole sequence can be re-run after a
//! failure and picks up where it stopped.

mod computer_name;
mod dotfiles;
mod gatekeeper;
mod homebrew;
mod macos_default;
mod remote_defaults;
mod shell;
mod ssh_key;
mod timezone;
mod xcode;

pub use computer_name::ComputerName;
pub use dotfiles::Dotfiles;
pub use gatekeeper::Gatekeeper;
pub use homebrew::{BrewPackages, Homebrew, PackageKind};
pub use macos_default::MacOSDefault;
pub use remote_defaults::RemoteDefaults;
pub use shell::ShellPlugins;
pub use ssh_key::SshKey;
pub use timezone::Timezone;
pub use xcode::XcodeTools;

/// Names in `wanted` absent from a newline-separated listing
///
/// A tap-qualified name (`owner/tap/name`) matches its bare `name`, which is
/// how `brew list` prints it. Comparison ignores case.
pub(crate) fn missing_from(listing: &str, wanted: &[String]) -> Vec<String> {
    let present: Vec<String> = listing
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();

    wanted
        .iter()
        .filter(|name| {
            let full = name.to_lowercase();
            let bare = full.rsplit('/').next().unwrap_or(&full).to_string();
            !present.iter().any(|p| *p == full || *p == bare)
        })
        .cloned()
        .collect()
}
