//! Pipeline orchestration.
//!
//! The pipeline executes steps strictly forward: discover → analyze →
//! detect cuts → build plan → confirm → render. Each step validates its
//! inputs, does its work, and validates its outputs; the confirmation step
//! is the single blocking point before render resources are committed.

mod confirm;
mod errors;
mod pipeline;
mod runner;
mod step;
pub mod steps;
mod types;

pub use confirm::{ConfirmationGate, GateDecision, GateState};
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use runner::{RunProcessor, RunReport};
pub use step::PipelineStep;
pub use types::{
    AnalysisStageOutput, ConfirmCallback, Context, CutsStageOutput, PlanStageOutput,
    ProgressCallback, RenderStageOutput, RunMode, RunRequest, RunState, StepOutcome,
};
