//! Render step - executes the approved plan against the media engine.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RenderStageOutput, RunState, StepOutcome};
use crate::render::RenderExecutor;

/// Render step: strict in-order execution of the frozen plan.
pub struct RenderStep {
    executor: RenderExecutor,
}

impl RenderStep {
    pub fn new(executor: RenderExecutor) -> Self {
        Self { executor }
    }
}

impl PipelineStep for RenderStep {
    fn name(&self) -> &str {
        "Render"
    }

    fn description(&self) -> &str {
        "Render the approved plan into the output file"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.request.output_name.trim().is_empty() {
            return Err(StepError::invalid_input("output file name is empty"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger.section("Render");

        let plan_stage = state
            .plan
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No approved plan to render"))?;

        let output_path = ctx.output_path();
        ctx.logger
            .info(&format!("Output: {}", output_path.display()));

        let outcome = self
            .executor
            .render(&plan_stage.plan, &ctx.work_dir, &output_path)?;

        let tolerance = ctx.settings.render.duration_tolerance_ms;
        if outcome.duration_within(tolerance) {
            ctx.logger.info(&format!(
                "Realized duration {:.1}s matches the plan (within {}ms)",
                outcome.realized_duration_ms as f64 / 1000.0,
                tolerance
            ));
        } else {
            ctx.logger.warn(&format!(
                "Realized duration {:.1}s deviates from planned {:.1}s",
                outcome.realized_duration_ms as f64 / 1000.0,
                outcome.expected_duration_ms as f64 / 1000.0
            ));
        }

        ctx.logger.success(&format!(
            "Rendered {} segment(s) to {}",
            outcome.segments_rendered,
            output_path.display()
        ));

        state.render = Some(RenderStageOutput { outcome });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let render = state
            .render
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Render results not recorded"))?;

        if !render.outcome.output_path.exists() {
            return Err(StepError::invalid_output(format!(
                "Output file not created: {}",
                render.outcome.output_path.display()
            )));
        }
        Ok(())
    }
}
