//! Error types for the pipeline orchestrator.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::analysis::ProbeError;
use crate::clips::ClipError;
use crate::config::StyleError;
use crate::plan::{ArtifactError, PlanError};
use crate::render::RenderError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The user declined the plan at the confirmation gate.
    ///
    /// A graceful termination: no render resources were committed.
    #[error("Run '{run_name}' was declined at the confirmation gate")]
    Aborted { run_name: String },

    /// Pipeline was cancelled.
    #[error("Run '{run_name}' was cancelled")]
    Cancelled { run_name: String },

    /// Failed to set up the run (create directories, open the log).
    #[error("Run '{run_name}' setup failed: {message}")]
    SetupFailed { run_name: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create an aborted error.
    pub fn aborted(run_name: impl Into<String>) -> Self {
        Self::Aborted {
            run_name: run_name.into(),
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(run_name: impl Into<String>) -> Self {
        Self::Cancelled {
            run_name: run_name.into(),
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// The user declined to continue. Mapped to `PipelineError::Aborted`
    /// by the runner.
    #[error("Declined at the confirmation gate")]
    Aborted,

    /// Clip discovery failed.
    #[error(transparent)]
    Clips(#[from] ClipError),

    /// Probing a clip failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Style resolution or validation failed.
    #[error(transparent)]
    Style(#[from] StyleError),

    /// Plan construction failed.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Plan artifact persistence failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Render execution failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
