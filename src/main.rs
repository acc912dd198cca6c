mod cli;
mod commands;
mod paths;
mod plan;
mod prompt;
mod schema;
mod settings;
mod state;
mod steps;
mod sudo;
mod system;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// `--config` override
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    if let Err(err) = dispatch(&ctx, cli.command, cli.run) {
        ui::error(&format!("{err:#}"));
        // A failed tool's own exit status is passed through
        let code = err
            .downcast_ref::<provision::Error>()
            .map_or(1, provision::Error::exit_status);
        std::process::exit(code);
    }
}

fn dispatch(ctx: &Context, command: Option<Command>, run: cli::RunArgs) -> Result<()> {
    match command {
        None => commands::run::run(ctx, run),
        Some(Command::Run(args)) => commands::run::run(ctx, args),
        Some(Command::Steps(args)) => commands::steps::run(ctx, args),
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "primer", &mut io::stdout());
            Ok(())
        }
    }
}
