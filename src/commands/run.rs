//! Run command - gather settings, confirm, provision

use anyhow::Result;
use colored::Colorize;
use provision::{
    Elevation, ProgressCallback, RunOptions, RunReport, Runner, Step, StepOutcome, System,
};
use std::sync::Arc;

use crate::Context as AppContext;
use crate::cli::RunArgs;
use crate::plan::{self, Machine, parse_selection};
use crate::prompt::{Prompter, TerminalPrompter};
use crate::schema::SettingsConfig;
use crate::settings::{self, SettingsDefaults, detect_computer_name};
use crate::state::PrimerState;
use crate::sudo::SudoSession;
use crate::system::MacSystem;
use crate::ui;

pub fn run(ctx: &AppContext, args: RunArgs) -> Result<()> {
    if !ctx.quiet {
        ui::banner();
    }

    let system = MacSystem::new();
    let machine = Machine::current()?;
    execute(
        ctx,
        &args,
        &system,
        Arc::new(SudoSession),
        &mut TerminalPrompter,
        &machine,
    )?;
    Ok(())
}

/// CLI flags as the top settings layer
fn overrides(args: &RunArgs) -> SettingsConfig {
    SettingsConfig {
        timezone: args.timezone.clone(),
        computer_name: args.computer_name.clone(),
        gatekeeper: args.no_gatekeeper.then_some(false),
        defaults_url: args.defaults_url.clone(),
    }
}

/// The whole run against injected collaborators
///
/// Returns `None` when the operator declined at the confirmation.
pub(crate) fn execute(
    ctx: &AppContext,
    args: &RunArgs,
    system: &dyn System,
    elevation: Arc<dyn Elevation>,
    prompter: &mut dyn Prompter,
    machine: &Machine,
) -> Result<Option<RunReport>> {
    let config = super::load_config(ctx)?;

    let defaults = SettingsDefaults::builtin(detect_computer_name(system))
        .with(&config.settings)
        .with(&overrides(args));
    let settings = settings::gather(prompter, defaults, ctx.quiet, args.passphrase.clone())?;

    if !settings.quiet {
        settings.print_summary();
    }
    if !settings::confirm(prompter, &settings, args.yes)? {
        println!("  {} Aborted", "✗".red());
        return Ok(None);
    }

    let plan = plan::build(&settings, &config, machine)?.select(
        &parse_selection(args.only.as_deref()),
        &parse_selection(args.skip.as_deref()),
    )?;

    if plan.is_empty() {
        ui::warn("No steps selected");
        return Ok(Some(RunReport::default()));
    }

    let opts = RunOptions {
        dry_run: args.dry_run,
        ..Default::default()
    };
    let runner = Runner::new(system, elevation, opts);
    let report = runner.run(plan, &mut UiProgress)?;

    if !args.dry_run {
        PrimerState::touch_run(&machine.state_file)?;
    }

    print_summary(&report, args.dry_run);
    Ok(Some(report))
}

/// Numbered step lines on the terminal
struct UiProgress;

impl ProgressCallback for UiProgress {
    fn on_run_start(&mut self, total: usize) {
        ui::header(&format!("Provisioning ({total} steps)"));
    }

    fn on_step_start(&mut self, index: usize, total: usize, step: &dyn Step) {
        ui::step(index, total, &step.description());
    }

    fn on_step_complete(&mut self, _index: usize, _step: &dyn Step, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::AlreadySatisfied => ui::dim("already done"),
            StepOutcome::Applied => println!("    {} done", "✓".green()),
            StepOutcome::Pending => println!("    {} would apply", "→".cyan()),
        }
    }

    fn on_step_failed(&mut self, _index: usize, step: &dyn Step, error: &anyhow::Error) {
        ui::error(&format!("{} failed: {error:#}", step.id()));
    }
}

fn print_summary(report: &RunReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if report.is_noop() {
        println!(
            "  {} Nothing to do - this machine is already provisioned",
            "✓".green().bold()
        );
        return;
    } else {
        println!("  {} Provisioning complete!", "✓".green().bold());
    }

    if report.applied() > 0 {
        println!("    • {} steps applied", report.applied());
    }
    if report.satisfied() > 0 {
        println!("    • {} steps already satisfied", report.satisfied());
    }
    if report.pending() > 0 {
        println!("    • {} steps pending", report.pending());
    }
}
