//! Confirm step - the human gate between planning and rendering.

use crate::orchestrator::confirm::{ConfirmationGate, GateDecision};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// Confirm step: resolves the confirmation gate before any render resource
/// is committed.
///
/// Approval comes from the skip-confirmation flag or from the injected
/// confirmation callback. With neither, the gate rejects: a non-interactive
/// run must opt in explicitly rather than render by accident.
pub struct ConfirmStep;

impl ConfirmStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConfirmStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ConfirmStep {
    fn name(&self) -> &str {
        "Confirm"
    }

    fn description(&self) -> &str {
        "Await plan approval before rendering"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let plan = state
            .plan
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No plan to confirm"))?;

        let mut gate = ConfirmationGate::new();

        if ctx.request.skip_confirmation {
            gate.resolve(GateDecision::Approve);
            ctx.logger.info("Confirmation skipped by flag");
            return Ok(StepOutcome::Success);
        }

        match ctx.confirm(&plan.plan) {
            Some(true) => {
                gate.resolve(GateDecision::Approve);
                ctx.logger.info("Plan approved");
                Ok(StepOutcome::Success)
            }
            Some(false) => {
                gate.resolve(GateDecision::Reject);
                Err(StepError::Aborted)
            }
            None => {
                gate.resolve(GateDecision::Reject);
                ctx.logger.warn(
                    "No confirmation channel available; pass the skip-confirmation flag \
                     to render non-interactively",
                );
                Err(StepError::Aborted)
            }
        }
    }

    fn validate_output(&self, _ctx: &Context, _state: &RunState) -> StepResult<()> {
        Ok(())
    }
}
