use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "primer")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision a new macOS machine", long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Non-interactive: take every default, skip the confirmation
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/primer/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Provisioning options when no subcommand is given
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Gather settings and provision this machine (default)
    Run(RunArgs),

    /// List the planned steps
    Steps(StepsArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// Default timezone offered at the prompt (e.g. America/New_York)
    #[arg(long)]
    pub timezone: Option<String>,

    /// Default computer name offered at the prompt
    #[arg(long)]
    pub computer_name: Option<String>,

    /// Default URL of the macOS defaults script
    #[arg(long, value_name = "URL")]
    pub defaults_url: Option<String>,

    /// Default to leaving Gatekeeper disabled
    #[arg(long)]
    pub no_gatekeeper: bool,

    /// SSH key passphrase (skips the passphrase prompt)
    #[arg(long, env = "PRIMER_SSH_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Skip the final confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run - check every step, change nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Only run specific stages or steps (comma-separated)
    #[arg(long, value_name = "NAMES")]
    pub only: Option<String>,

    /// Skip specific stages or steps (comma-separated)
    #[arg(long, value_name = "NAMES")]
    pub skip: Option<String>,
}

#[derive(Args)]
pub struct StepsArgs {
    /// Check whether each step is already satisfied
    #[arg(long)]
    pub check: bool,

    /// Only list specific stages or steps (comma-separated)
    #[arg(long, value_name = "NAMES")]
    pub only: Option<String>,

    /// Leave out specific stages or steps (comma-separated)
    #[arg(long, value_name = "NAMES")]
    pub skip: Option<String>,
}
