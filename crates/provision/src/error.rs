//! Error types for provisioning runs

use crate::types::CommandFailed;
use thiserror::Error;

/// Errors that end a run
#[derive(Debug, Error)]
pub enum Error {
    /// A step's precondition check or action failed
    #[error("step {index}/{total} `{id}` ({description}) failed: {reason}")]
    StepFailed {
        /// 1-based position of the step in the run
        index: usize,
        total: usize,
        id: String,
        description: String,
        reason: String,
        /// Exit status of the external tool, when the failure was a non-zero exit
        exit_code: Option<i32>,
    },

    /// `--only`/`--skip` named something that is neither a step nor a stage
    #[error("unknown step or stage '{name}' (known: {known})")]
    UnknownStep { name: String, known: String },

    /// Elevated privileges could not be obtained
    #[error("elevation failed: {0}")]
    Elevation(String),
}

impl Error {
    /// Build a `StepFailed` from a step error, keeping the tool's exit status
    pub(crate) fn step_failed(
        index: usize,
        total: usize,
        id: String,
        description: String,
        error: &anyhow::Error,
    ) -> Self {
        let exit_code = error
            .chain()
            .find_map(|e| e.downcast_ref::<CommandFailed>())
            .and_then(|f| f.code);

        Self::StepFailed {
            index,
            total,
            id,
            description,
            reason: format!("{error:#}"),
            exit_code,
        }
    }

    /// Process exit status appropriate for this error
    ///
    /// A failed external tool's own non-zero status is propagated; anything
    /// else maps to 1.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::StepFailed {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}
