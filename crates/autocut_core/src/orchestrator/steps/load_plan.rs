//! LoadPlan step - reloads a saved plan for execute-only runs.
//!
//! The artifact must round-trip losslessly: rendering the loaded plan
//! behaves exactly like rendering the freshly built one. Loaded plans are
//! validated against the current style constraints before use.

use super::plan::log_plan_summary;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, PlanStageOutput, RunState, StepOutcome};
use crate::plan::{load_plan, validate_plan, PLAN_FILE_NAME};

/// LoadPlan step: deserialize and validate a previously saved plan.
pub struct LoadPlanStep;

impl LoadPlanStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoadPlanStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for LoadPlanStep {
    fn name(&self) -> &str {
        "LoadPlan"
    }

    fn description(&self) -> &str {
        "Load a previously saved edit plan"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let artifact = ctx.analysis_dir.join(PLAN_FILE_NAME);
        if !artifact.exists() {
            return Err(StepError::invalid_input(format!(
                "no saved edit plan at {}; run analysis first",
                artifact.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger.section("Loading Edit Plan");

        let artifact_path = ctx.analysis_dir.join(PLAN_FILE_NAME);
        let plan = load_plan(&artifact_path)?;
        validate_plan(&plan, &ctx.constraints)?;

        ctx.logger.info(&format!(
            "Loaded plan from {} (created {})",
            artifact_path.display(),
            plan.created_at
        ));
        log_plan_summary(&ctx.logger, &plan);

        state.plan = Some(PlanStageOutput {
            plan,
            artifact_path,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if !state.has_plan() {
            return Err(StepError::invalid_output("Plan not recorded"));
        }
        Ok(())
    }
}
