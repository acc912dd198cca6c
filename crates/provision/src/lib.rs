//! # Provision
//!
//! An idempotent, fail-fast step runner for machine provisioning.
//!
//! A run is an ordered list of steps executed strictly one after another.
//! Each step states how to tell whether its work is already done and how to
//! do it, so re-running a whole plan on a configured machine is a no-op.
//!
//! ## Core Concepts
//!
//! - **Step**: one idempotent action with `is_satisfied` and `apply`
//! - **Plan**: steps in run order, grouped into named stages
//! - **System**: the handle every side effect goes through
//! - **Runner**: executes a plan, fail-fast, with numbered progress
//! - **KeepAlive**: keeps an elevated session fresh while the run lasts
//!
//! ## Example
//!
//! ```ignore
//! use provision::{Plan, Runner, RunOptions, NoElevation, NoProgress};
//!
//! let mut plan = Plan::new();
//! plan.push("bootstrap", Homebrew);
//!
//! let runner = Runner::new(&system, Arc::new(NoElevation), RunOptions::default());
//! let report = runner.run(plan, &mut NoProgress)?;
//! assert_eq!(report.total(), 1);
//! ```
//!
//! ## Provider Traits
//!
//! - [`System`]: spawns commands, probes `PATH`, fetches URLs
//! - [`Elevation`]: acquires, refreshes and releases privileges
//! - [`ProgressCallback`]: receives per-step progress

pub mod context;
pub mod error;
pub mod keepalive;
pub mod plan;
pub mod runner;
pub mod step;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types at crate root
pub use context::{Elevation, NoElevation, NoProgress, ProgressCallback, StepContext, System};
pub use error::Error;
pub use keepalive::KeepAlive;
pub use plan::{Plan, PlannedStep, parse_names};
pub use runner::Runner;
pub use step::{BoxedStep, Step, StepExt};
pub use types::{
    CommandFailed, CommandOutput, Invocation, Privilege, RunOptions, RunReport, StepOutcome,
    StepRecord, Touch,
};
