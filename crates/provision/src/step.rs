//! Step trait for idempotent provisioning actions
//!
//! A Step is one unit of work in a run. Idempotency is an explicit part of
//! the contract: the runner asks [`Step::is_satisfied`] first and only calls
//! [`Step::apply`] when the precondition does not already hold.

use crate::context::StepContext;
use crate::types::{Privilege, Touch};
use anyhow::Result;
use std::fmt;

/// Core trait for provisioning steps
///
/// # Example
///
/// ```ignore
/// use provision::{Invocation, Step, StepContext, Touch};
///
/// #[derive(Debug)]
/// struct Homebrew;
///
/// impl Step for Homebrew {
///     fn id(&self) -> String {
///         "homebrew".into()
///     }
///
///     fn description(&self) -> String {
///         "Ensure Homebrew is installed".into()
///     }
///
///     fn touches(&self) -> &'static [Touch] {
///         &[Touch::PackageManager, Touch::Network]
///     }
///
///     fn is_satisfied(&self, ctx: &StepContext) -> anyhow::Result<bool> {
///         Ok(ctx.system.command_exists("brew"))
///     }
///
///     fn apply(&self, ctx: &mut StepContext) -> anyhow::Result<()> {
///         ctx.run(&Invocation::new("/bin/bash", ["-c", INSTALL_SCRIPT]).interactive())?;
///         Ok(())
///     }
/// }
/// ```
pub trait Step: Send + Sync + fmt::Debug {
    /// Stable identifier, used for `--only`/`--skip` and reports
    fn id(&self) -> String;

    /// Human-readable description printed next to the step number
    fn description(&self) -> String;

    /// External state this step reads or mutates
    fn touches(&self) -> &'static [Touch];

    /// Whether this step needs an elevated session
    fn privilege(&self) -> Privilege {
        Privilege::None
    }

    /// Query the system: is the desired state already in place?
    ///
    /// Must not mutate anything.
    fn is_satisfied(&self, ctx: &StepContext<'_>) -> Result<bool>;

    /// Make the desired state true
    ///
    /// Only called when [`Step::is_satisfied`] returned `false`. Any error
    /// aborts the whole run.
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()>;
}

/// A boxed step for type-erased storage
pub type BoxedStep = Box<dyn Step>;

/// Extension trait for working with steps
pub trait StepExt {
    /// Check if the step needs elevated privileges
    fn requires_privilege(&self) -> bool;
}

impl<S: Step + ?Sized> StepExt for S {
    fn requires_privilege(&self) -> bool {
        self.privilege().is_required()
    }
}
