//! Analyze step - runs content analysis for every discovered clip.
//!
//! Delegates understanding to the external service through the adapter,
//! which owns concurrency bounding, retries and normalization. Per-clip
//! failures degrade to warnings; the run continues with whatever analyzed
//! successfully.

use crate::analysis::{AnalysisCache, ContentAnalysisAdapter};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AnalysisStageOutput, Context, RunState, StepOutcome};

/// Analyze step: batch content analysis with caching.
pub struct AnalyzeStep {
    adapter: ContentAnalysisAdapter,
}

impl AnalyzeStep {
    pub fn new(adapter: ContentAnalysisAdapter) -> Self {
        Self { adapter }
    }
}

impl PipelineStep for AnalyzeStep {
    fn name(&self) -> &str {
        "Analyze"
    }

    fn description(&self) -> &str {
        "Run content analysis for each clip"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger.section("Content Analysis");

        let clips = state
            .clips
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Discovery has not run"))?;

        let cache = AnalysisCache::open(&ctx.analysis_dir)
            .map_err(|e| StepError::io_error("opening analysis cache", e))?;

        ctx.logger.info(&format!(
            "Analyzing {} clip(s), {} at a time",
            clips.len(),
            ctx.settings.analysis.max_concurrent
        ));

        let batch = self.adapter.analyze_batch(clips, Some(&cache));

        for warning in &batch.warnings {
            ctx.logger.warn(&format!(
                "Analysis failed for '{}': {}",
                warning.clip_id, warning.message
            ));
        }

        ctx.logger.info(&format!(
            "Analysis finished: {} ok, {} failed",
            batch.results.len(),
            batch.warnings.len()
        ));

        state.analysis = Some(AnalysisStageOutput {
            results: batch.results,
            warnings: batch.warnings,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if !state.has_analysis() {
            return Err(StepError::invalid_output("Analysis results not recorded"));
        }
        Ok(())
    }
}
