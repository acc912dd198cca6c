//! Step context and provider traits
//!
//! These traits keep the runner independent of how commands are spawned,
//! how privileges are obtained, and how progress is rendered.

use crate::error::Error;
use crate::step::Step;
use crate::types::{CommandOutput, Invocation, StepOutcome};
use anyhow::Result;

/// Handle to the machine being provisioned
///
/// Every side effect a step performs against the OS or an external tool
/// goes through this trait, so a run can be replayed against a fake.
pub trait System: Send + Sync {
    /// Run an external program and return its output
    ///
    /// A non-zero exit is *not* an error at this level; callers decide via
    /// [`CommandOutput::ensure_success`].
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Whether a program is on `PATH`
    fn command_exists(&self, program: &str) -> bool;

    /// Fetch a URL body as text
    fn fetch(&self, url: &str) -> Result<String>;

    /// Run and require success, returning stdout
    fn run_checked(&self, invocation: &Invocation) -> Result<String> {
        let output = self.run(invocation)?.ensure_success(invocation)?;
        Ok(output.stdout_str())
    }

    /// Run and report only whether the command succeeded
    fn probe(&self, invocation: &Invocation) -> bool {
        self.run(invocation).is_ok_and(|o| o.success())
    }
}

/// Provider for an elevated session
///
/// The runner acquires once, before the first privileged step, then keeps
/// the session alive in the background until the run ends.
pub trait Elevation: Send + Sync {
    /// Obtain the elevated session (may prompt for a password)
    fn acquire(&self, reason: &str) -> Result<()>;

    /// Extend the session without prompting
    fn refresh(&self) -> Result<()>;

    /// Drop the elevated session
    fn release(&self);
}

/// Elevation provider for runs that must not escalate
pub struct NoElevation;

impl Elevation for NoElevation {
    fn acquire(&self, reason: &str) -> Result<()> {
        Err(Error::Elevation(format!("privileges unavailable ({reason})")).into())
    }

    fn refresh(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) {}
}

/// Progress callback for runs
pub trait ProgressCallback {
    /// Called once with the number of steps about to run
    fn on_run_start(&mut self, total: usize);

    /// Called before a step's precondition is evaluated
    fn on_step_start(&mut self, index: usize, total: usize, step: &dyn Step);

    /// Called when a step finished successfully
    fn on_step_complete(&mut self, index: usize, step: &dyn Step, outcome: &StepOutcome);

    /// Called when a step failed; the run stops afterwards
    fn on_step_failed(&mut self, index: usize, step: &dyn Step, error: &anyhow::Error);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _total: usize) {}
    fn on_step_start(&mut self, _index: usize, _total: usize, _step: &dyn Step) {}
    fn on_step_complete(&mut self, _index: usize, _step: &dyn Step, _outcome: &StepOutcome) {}
    fn on_step_failed(&mut self, _index: usize, _step: &dyn Step, _error: &anyhow::Error) {}
}

/// Context passed to step precondition checks and actions
pub struct StepContext<'a> {
    /// The machine being provisioned
    pub system: &'a dyn System,
}

impl<'a> StepContext<'a> {
    pub fn new(system: &'a dyn System) -> Self {
        Self { system }
    }

    /// Run a command, failing the step on non-zero exit
    pub fn run(&self, invocation: &Invocation) -> Result<String> {
        self.system.run_checked(invocation)
    }

    /// Run a command and report success without failing the step
    pub fn probe(&self, invocation: &Invocation) -> bool {
        self.system.probe(invocation)
    }
}
