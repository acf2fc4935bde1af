//! DetectCuts step - derives precision cuts from analysis results.
//!
//! Pure computation over the keyed analysis map; results are written through
//! the content-addressed cache so a later run can skip straight to planning.

use std::collections::BTreeMap;

use crate::analysis::AnalysisCache;
use crate::clips::signature_for;
use crate::cutting::{detect_cuts, CutPolicy};
use crate::models::PrecisionCut;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, CutsStageOutput, RunState, StepOutcome};

/// DetectCuts step: millisecond-accurate cut boundaries per clip.
pub struct DetectCutsStep {
    policy: CutPolicy,
}

impl DetectCutsStep {
    pub fn new(policy: CutPolicy) -> Self {
        Self { policy }
    }
}

impl Default for DetectCutsStep {
    fn default() -> Self {
        Self::new(CutPolicy::default())
    }
}

impl PipelineStep for DetectCutsStep {
    fn name(&self) -> &str {
        "DetectCuts"
    }

    fn description(&self) -> &str {
        "Refine analysis signals into precision cuts"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger.section("Precision Cut Detection");

        let clips = state
            .clips
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Discovery has not run"))?;
        let analysis = state
            .analysis
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("Analysis has not run"))?;

        let cache = AnalysisCache::open(&ctx.analysis_dir)
            .map_err(|e| StepError::io_error("opening analysis cache", e))?;

        let mut cuts: BTreeMap<String, PrecisionCut> = BTreeMap::new();
        let mut empty_clips: Vec<String> = Vec::new();

        for clip in clips {
            let Some(result) = analysis.results.get(&clip.id) else {
                // Analysis already recorded the failure; nothing to cut.
                continue;
            };

            let signature = signature_for(&clip.path).ok();

            let cut = signature
                .as_ref()
                .and_then(|sig| cache.load_cuts(&clip.id, sig))
                .unwrap_or_else(|| {
                    let cut = detect_cuts(clip, result, &self.policy);
                    if let Some(sig) = signature.as_ref() {
                        if let Err(e) = cache.store_cuts(&clip.id, sig, &cut) {
                            tracing::warn!("Failed to cache cuts for '{}': {}", clip.id, e);
                        }
                    }
                    cut
                });

            if cut.is_empty() {
                ctx.logger.warn(&format!(
                    "'{}': trims consume the whole clip, excluding it",
                    clip.id
                ));
                empty_clips.push(clip.id.clone());
            } else {
                ctx.logger.info(&format!(
                    "'{}': {} span(s), {:.1}s of usable footage",
                    clip.id,
                    cut.entries.len(),
                    cut.total_source_ms() as f64 / 1000.0
                ));
            }

            cuts.insert(clip.id.clone(), cut);
        }

        state.cuts = Some(CutsStageOutput { cuts, empty_clips });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if state.cuts.is_none() {
            return Err(StepError::invalid_output("Cut results not recorded"));
        }
        Ok(())
    }
}
