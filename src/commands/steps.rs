//! Steps command - list the plan, optionally checking each step

use anyhow::Result;
use colored::Colorize;
use provision::{NoElevation, Plan, RunOptions, Runner, StepExt, System};
use std::sync::Arc;

use crate::Context as AppContext;
use crate::cli::StepsArgs;
use crate::plan::{self, Machine, parse_selection};
use crate::prompt::TerminalPrompter;
use crate::settings::{self, SettingsDefaults, detect_computer_name};
use crate::system::MacSystem;
use crate::ui;

pub fn run(ctx: &AppContext, args: StepsArgs) -> Result<()> {
    let system = MacSystem::new();
    let machine = Machine::current()?;
    let plan = planned(ctx, &args, &system, &machine)?;

    ui::header(&format!("Steps ({})", plan.len()));
    let checks = if args.check {
        Runner::new(&system, Arc::new(NoElevation), RunOptions::default()).check(&plan)
    } else {
        Vec::new()
    };

    for (i, planned) in plan.iter().enumerate() {
        let step = planned.step.as_ref();
        let status = match checks.get(i) {
            None => String::new(),
            Some(Ok(true)) => format!(" {}", "✓ done".green()),
            Some(Ok(false)) => format!(" {}", "• pending".yellow()),
            Some(Err(e)) => format!(" {} {e:#}", "✗".red()),
        };
        let sudo = if step.requires_privilege() {
            format!(" {}", "[sudo]".yellow())
        } else {
            String::new()
        };
        println!(
            "{} {:<10} {}{}{}",
            ui::step_label(i + 1, plan.len()).blue().bold(),
            planned.stage.dimmed(),
            step.description(),
            sudo,
            status
        );
        if ctx.verbose > 0 {
            let touches: Vec<String> = step.touches().iter().map(ToString::to_string).collect();
            ui::dim(&format!("{}  touches: {}", step.id(), touches.join(", ")));
        }
    }
    Ok(())
}

/// The plan a quiet run would execute
fn planned(
    ctx: &AppContext,
    args: &StepsArgs,
    system: &dyn System,
    machine: &Machine,
) -> Result<Plan> {
    let config = super::load_config(ctx)?;
    let defaults =
        SettingsDefaults::builtin(detect_computer_name(system)).with(&config.settings);
    // Quiet: nothing is read from the terminal
    let settings = settings::gather(&mut TerminalPrompter, defaults, true, None)?;

    let plan = plan::build(&settings, &config, machine)?.select(
        &parse_selection(args.only.as_deref()),
        &parse_selection(args.skip.as_deref()),
    )?;
    Ok(plan)
}
