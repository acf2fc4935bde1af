//! Core types for the orchestrator pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{Settings, StyleConstraints};
use crate::logging::JobLogger;
use crate::models::{AnalysisResult, AnalysisWarning, Clip, EditPlan, PrecisionCut};
use crate::render::{OutputPreset, RenderOutcome};

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Confirmation callback: shown the drafted plan, answers approve/decline.
pub type ConfirmCallback = Box<dyn Fn(&EditPlan) -> bool + Send + Sync>;

/// What the invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Analyze, plan, confirm, render.
    Full,
    /// Produce and persist the plan without rendering.
    AnalyzeOnly,
    /// Render from a previously saved plan without re-analysis.
    ExecuteOnly,
}

/// Specification for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Directory containing the raw clips.
    pub clip_dir: PathBuf,
    /// Invocation mode.
    pub mode: RunMode,
    /// Requested target duration in seconds, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration_secs: Option<f64>,
    /// Style name or profile path, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Output encode preset.
    pub preset: OutputPreset,
    /// Output file name (placed in the clip directory).
    pub output_name: String,
    /// Approve the plan without asking.
    pub skip_confirmation: bool,
}

impl RunRequest {
    /// Create a request with defaults for everything but the directory.
    pub fn new(clip_dir: impl Into<PathBuf>, mode: RunMode) -> Self {
        Self {
            clip_dir: clip_dir.into(),
            mode,
            target_duration_secs: None,
            style: None,
            preset: OutputPreset::default(),
            output_name: "output.mp4".to_string(),
            skip_confirmation: false,
        }
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains the run configuration and shared resources that steps can read
/// but not modify. Mutable state goes in `RunState`.
pub struct Context {
    /// Run specification.
    pub request: RunRequest,
    /// Application settings.
    pub settings: Settings,
    /// Resolved style constraints.
    pub constraints: StyleConstraints,
    /// Run name/identifier.
    pub run_name: String,
    /// Directory for render intermediates.
    pub work_dir: PathBuf,
    /// Directory for derived analysis artifacts (cache + plan).
    pub analysis_dir: PathBuf,
    /// Per-run logger.
    pub logger: Arc<JobLogger>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
    /// Optional confirmation callback.
    confirm_callback: Option<ConfirmCallback>,
}

impl Context {
    /// Create a new context for a run.
    pub fn new(
        request: RunRequest,
        settings: Settings,
        constraints: StyleConstraints,
        run_name: impl Into<String>,
        work_dir: PathBuf,
        analysis_dir: PathBuf,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            request,
            settings,
            constraints,
            run_name: run_name.into(),
            work_dir,
            analysis_dir,
            logger,
            progress_callback: None,
            confirm_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the confirmation callback.
    pub fn with_confirm_callback(mut self, callback: ConfirmCallback) -> Self {
        self.confirm_callback = Some(callback);
        self
    }

    /// Report progress to the callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Ask for confirmation of the drafted plan.
    ///
    /// Returns `None` when no interactive channel is available.
    pub fn confirm(&self, plan: &EditPlan) -> Option<bool> {
        self.confirm_callback.as_ref().map(|callback| callback(plan))
    }

    /// Final output path: the requested file name inside the clip directory.
    pub fn output_path(&self) -> PathBuf {
        self.request.clip_dir.join(&self.request.output_name)
    }
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// A write-once manifest: each step records its output in its own section
/// and never overwrites another's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Discovered clips, in discovery order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips: Option<Vec<Clip>>,
    /// Analysis results (from the Analyze step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisStageOutput>,
    /// Precision cuts (from the DetectCuts step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuts: Option<CutsStageOutput>,
    /// The drafted plan (from BuildPlan or LoadPlan).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanStageOutput>,
    /// Render results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderStageOutput>,
}

impl RunState {
    /// Create a new run state with the given ID.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn has_clips(&self) -> bool {
        self.clips.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_analysis(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn has_plan(&self) -> bool {
        self.plan.is_some()
    }
}

/// Output from the Analyze step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStageOutput {
    /// Normalized results keyed by clip id.
    pub results: BTreeMap<String, AnalysisResult>,
    /// Per-clip failures that were absorbed.
    #[serde(default)]
    pub warnings: Vec<AnalysisWarning>,
}

/// Output from the DetectCuts step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutsStageOutput {
    /// Precision cuts keyed by clip id.
    pub cuts: BTreeMap<String, PrecisionCut>,
    /// Clips whose trims consumed the whole timeline.
    #[serde(default)]
    pub empty_clips: Vec<String>,
}

/// Output from the BuildPlan / LoadPlan steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStageOutput {
    /// The drafted plan.
    pub plan: EditPlan,
    /// Where the plan artifact lives on disk.
    pub artifact_path: PathBuf,
}

/// Output from the Render step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderStageOutput {
    pub outcome: RenderOutcome,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_state_tracks_completion() {
        let mut state = RunState::new("run-123");
        assert!(!state.has_analysis());
        assert!(!state.has_plan());

        state.analysis = Some(AnalysisStageOutput {
            results: BTreeMap::new(),
            warnings: Vec::new(),
        });

        assert!(state.has_analysis());
    }

    #[test]
    fn run_state_serializes() {
        let state = RunState::new("run-456");
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"run_id\":\"run-456\""));
    }

    #[test]
    fn run_request_defaults() {
        let request = RunRequest::new("/videos", RunMode::Full);
        assert_eq!(request.output_name, "output.mp4");
        assert!(!request.skip_confirmation);
        assert!(request.target_duration_secs.is_none());
    }
}
