//! BuildPlan step - selects and orders segments into the edit plan.

use crate::logging::JobLogger;
use crate::models::{EditPlan, ExcludedClip};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, PlanStageOutput, RunState, StepOutcome};
use crate::plan::{build_plan, save_plan, PLAN_FILE_NAME};

/// BuildPlan step: duration-budgeted selection and ordering.
pub struct BuildPlanStep;

impl BuildPlanStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuildPlanStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for BuildPlanStep {
    fn name(&self) -> &str {
        "BuildPlan"
    }

    fn description(&self) -> &str {
        "Select, trim and order segments under the duration budget"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger.section("Plan Construction");

        let clips = state
            .clips
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Discovery has not run"))?;
        let analysis = state
            .analysis
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Analysis has not run"))?;
        let cuts = state
            .cuts
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Cut detection has not run"))?;

        // Analysis failures become recorded exclusions so the final report
        // never silently drops a clip.
        let prior_exclusions: Vec<ExcludedClip> = analysis
            .warnings
            .iter()
            .map(|w| ExcludedClip {
                clip_id: w.clip_id.clone(),
                reason: format!("analysis failed: {}", w.message),
            })
            .collect();

        let plan = build_plan(
            clips,
            &analysis.results,
            &cuts.cuts,
            &ctx.constraints,
            ctx.request.target_duration_secs,
            prior_exclusions,
        )?;

        let artifact_path = ctx.analysis_dir.join(PLAN_FILE_NAME);
        save_plan(&plan, &artifact_path)?;

        log_plan_summary(&ctx.logger, &plan);
        ctx.logger
            .info(&format!("Plan saved to {}", artifact_path.display()));

        state.plan = Some(PlanStageOutput {
            plan,
            artifact_path,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let plan = state
            .plan
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Plan not recorded"))?;

        if plan.plan.is_empty() {
            return Err(StepError::invalid_output("Built plan has no segments"));
        }
        if !plan.artifact_path.exists() {
            return Err(StepError::invalid_output(format!(
                "Plan artifact not written: {}",
                plan.artifact_path.display()
            )));
        }
        Ok(())
    }
}

/// Log a human-readable plan summary to the run log.
pub(crate) fn log_plan_summary(logger: &JobLogger, plan: &EditPlan) {
    logger.section("Edit Plan Preview");
    logger.info(&format!(
        "Style: {} | planned duration: {:.1}s | {} segment(s)",
        plan.style,
        plan.total_output_ms as f64 / 1000.0,
        plan.segment_count()
    ));

    for (i, segment) in plan.segments.iter().enumerate() {
        logger.info(&format!(
            "  {:>2}. {:<20} {}ms - {}ms  {:<8} {:.2}x  -> {}",
            i + 1,
            segment.clip_id,
            segment.start_ms,
            segment.end_ms,
            segment.role.to_string(),
            segment.speed_factor,
            segment.transition_to_next
        ));
    }

    if !plan.excluded.is_empty() {
        logger.info("Excluded clips:");
        for excluded in &plan.excluded {
            logger.info(&format!("  - {}: {}", excluded.clip_id, excluded.reason));
        }
    }
}
