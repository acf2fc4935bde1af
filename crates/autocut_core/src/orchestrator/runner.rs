//! Run processor: assembles and executes the pipeline for one request.
//!
//! Wires settings, resolved constraints and the injectable capabilities
//! (analyzer, media engine, prober) into the step sequence for the requested
//! mode, then collects the outcome into a `RunReport`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{
    ClipProber, CommandAnalyzer, ContentAnalysisAdapter, ContentAnalyzer, FfprobeProber,
    RetryPolicy,
};
use crate::config::{Settings, StyleConstraints};
use crate::cutting::CutPolicy;
use crate::logging::{JobLogger, LogCallback, LogConfig, LogLevel};
use crate::render::{FfmpegEngine, MediaEngine, RenderExecutor};

use super::errors::PipelineError;
use super::pipeline::Pipeline;
use super::steps::{
    AnalyzeStep, BuildPlanStep, ConfirmStep, DetectCutsStep, DiscoverStep, LoadPlanStep,
    RenderStep,
};
use super::types::{ConfirmCallback, Context, ProgressCallback, RunMode, RunRequest, RunState};

/// Result of processing a single run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run name that was processed.
    pub run_name: String,
    /// Whether the run completed successfully.
    pub success: bool,
    /// Whether the run was declined at the confirmation gate.
    pub aborted: bool,
    /// Path to the rendered output (if the render stage ran).
    pub output_path: Option<PathBuf>,
    /// Path to the persisted plan artifact (if planning ran).
    pub plan_path: Option<PathBuf>,
    /// Planned total output duration in milliseconds.
    pub total_output_ms: Option<u64>,
    /// Error message (if failed).
    pub error: Option<String>,
    /// Steps that completed.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
}

/// Processor for running requests through the pipeline.
pub struct RunProcessor {
    settings: Settings,
    constraints: StyleConstraints,
    analyzer: Arc<dyn ContentAnalyzer>,
    engine: Arc<dyn MediaEngine>,
    prober: Arc<dyn ClipProber>,
    cut_policy: CutPolicy,
}

impl RunProcessor {
    /// Create a processor with the default external capabilities: the
    /// configured analyzer command, ffmpeg, and ffprobe.
    pub fn new(settings: Settings, constraints: StyleConstraints) -> Self {
        let analyzer = Arc::new(CommandAnalyzer::new(
            settings.analysis.analyzer_command.clone(),
            Duration::from_secs(settings.analysis.request_timeout_secs),
        ));
        let engine = Arc::new(
            FfmpegEngine::new()
                .with_executables(
                    settings.render.ffmpeg_path.clone(),
                    settings.render.ffprobe_path.clone(),
                ),
        );
        let prober = Arc::new(
            FfprobeProber::new().with_executable(settings.render.ffprobe_path.clone()),
        );

        Self {
            settings,
            constraints,
            analyzer,
            engine,
            prober,
            cut_policy: CutPolicy::default(),
        }
    }

    /// Replace the content analyzer (tests, alternative services).
    pub fn with_analyzer(mut self, analyzer: Arc<dyn ContentAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Replace the media engine.
    pub fn with_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the clip prober.
    pub fn with_prober(mut self, prober: Arc<dyn ClipProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Override the cut detection policy.
    pub fn with_cut_policy(mut self, policy: CutPolicy) -> Self {
        self.cut_policy = policy;
        self
    }

    /// Process a single request.
    pub fn process(
        &self,
        request: RunRequest,
        log_sink: Option<LogCallback>,
        progress_callback: Option<ProgressCallback>,
        confirm_callback: Option<ConfirmCallback>,
    ) -> RunReport {
        let run_name = derive_run_name(&request);

        let clip_dir = &request.clip_dir;
        let analysis_dir = clip_dir.join(&self.settings.paths.analysis_folder);
        let work_dir = clip_dir.join(&self.settings.paths.work_root);
        let log_dir = clip_dir.join(&self.settings.paths.logs_folder);

        let log_config = LogConfig {
            level: LogLevel::Info,
            compact: self.settings.logging.compact,
            progress_step: self.settings.logging.progress_step,
            error_tail: self.settings.logging.error_tail as usize,
            show_timestamps: self.settings.logging.show_timestamps,
        };

        let logger = match JobLogger::new(&run_name, &log_dir, log_config, log_sink) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                return failure_report(
                    run_name.clone(),
                    PipelineError::setup_failed(&run_name, format!("cannot open run log: {}", e)),
                );
            }
        };

        logger.phase(&format!("Run: {}", run_name));

        let mut ctx = Context::new(
            request.clone(),
            self.settings.clone(),
            self.constraints.clone(),
            run_name.clone(),
            work_dir,
            analysis_dir,
            logger,
        );
        if let Some(progress) = progress_callback {
            ctx = ctx.with_progress_callback(progress);
        }
        if let Some(confirm) = confirm_callback {
            ctx = ctx.with_confirm_callback(confirm);
        }

        let pipeline = self.build_pipeline(&request);
        let mut state = RunState::new(&run_name);

        match pipeline.run(&ctx, &mut state) {
            Ok(run_result) => RunReport {
                run_name,
                success: true,
                aborted: false,
                output_path: state.render.as_ref().map(|r| r.outcome.output_path.clone()),
                plan_path: state.plan.as_ref().map(|p| p.artifact_path.clone()),
                total_output_ms: state.plan.as_ref().map(|p| p.plan.total_output_ms),
                error: None,
                steps_completed: run_result.steps_completed,
                steps_skipped: run_result.steps_skipped,
            },
            Err(PipelineError::Aborted { .. }) => RunReport {
                run_name,
                success: false,
                aborted: true,
                output_path: None,
                plan_path: state.plan.as_ref().map(|p| p.artifact_path.clone()),
                total_output_ms: state.plan.as_ref().map(|p| p.plan.total_output_ms),
                error: None,
                steps_completed: Vec::new(),
                steps_skipped: Vec::new(),
            },
            Err(e) => failure_report(run_name, e),
        }
    }

    /// Assemble the step sequence for the requested mode.
    fn build_pipeline(&self, request: &RunRequest) -> Pipeline {
        let mut adapter = ContentAnalysisAdapter::new(
            Arc::clone(&self.analyzer),
            RetryPolicy {
                max_attempts: self.settings.analysis.max_attempts.max(1),
                base_delay: Duration::from_secs(self.settings.analysis.backoff_base_secs),
            },
            self.settings.analysis.max_concurrent,
        );
        if let Some(style) = &request.style {
            adapter = adapter.with_style_hint(style.clone());
        }

        let executor = RenderExecutor::new(
            Arc::clone(&self.engine),
            request.preset.encode_settings(),
        )
        .keep_intermediates(self.settings.render.keep_intermediates)
        .duration_tolerance_ms(self.settings.render.duration_tolerance_ms);

        match request.mode {
            RunMode::Full => Pipeline::new()
                .with_step(DiscoverStep::new(Arc::clone(&self.prober)))
                .with_step(AnalyzeStep::new(adapter))
                .with_step(DetectCutsStep::new(self.cut_policy))
                .with_step(BuildPlanStep::new())
                .with_step(ConfirmStep::new())
                .with_step(RenderStep::new(executor)),
            RunMode::AnalyzeOnly => Pipeline::new()
                .with_step(DiscoverStep::new(Arc::clone(&self.prober)))
                .with_step(AnalyzeStep::new(adapter))
                .with_step(DetectCutsStep::new(self.cut_policy))
                .with_step(BuildPlanStep::new()),
            RunMode::ExecuteOnly => Pipeline::new()
                .with_step(LoadPlanStep::new())
                .with_step(ConfirmStep::new())
                .with_step(RenderStep::new(executor)),
        }
    }
}

/// Derive a run name from the clip directory and a timestamp.
fn derive_run_name(request: &RunRequest) -> String {
    let dir_name = request
        .clip_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "run".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}", dir_name, stamp)
}

fn failure_report(run_name: String, error: PipelineError) -> RunReport {
    RunReport {
        run_name,
        success: false,
        aborted: false,
        output_path: None,
        plan_path: None,
        total_output_ms: None,
        error: Some(error.to_string()),
        steps_completed: Vec::new(),
        steps_skipped: Vec::new(),
    }
}
