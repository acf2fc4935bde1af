//! Discover step - scans the clip directory and probes each file.

use std::sync::Arc;

use crate::analysis::ClipProber;
use crate::clips::scan_video_files;
use crate::models::Clip;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, StepOutcome};

/// Discover step: find video files and build their clip records.
pub struct DiscoverStep {
    prober: Arc<dyn ClipProber>,
}

impl DiscoverStep {
    pub fn new(prober: Arc<dyn ClipProber>) -> Self {
        Self { prober }
    }
}

impl PipelineStep for DiscoverStep {
    fn name(&self) -> &str {
        "Discover"
    }

    fn description(&self) -> &str {
        "Scan the clip directory and probe media metadata"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if !ctx.request.clip_dir.is_dir() {
            return Err(StepError::invalid_input(format!(
                "clip directory does not exist: {}",
                ctx.request.clip_dir.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger.section("Clip Discovery");

        let paths = scan_video_files(&ctx.request.clip_dir)?;
        ctx.logger
            .info(&format!("Found {} video file(s)", paths.len()));

        let mut clips: Vec<Clip> = Vec::with_capacity(paths.len());
        for path in &paths {
            match self.prober.probe(path) {
                Ok(clip) => {
                    ctx.logger.info(&format!(
                        "  {} ({:.1}s)",
                        clip.file_name(),
                        clip.duration_secs()
                    ));
                    clips.push(clip);
                }
                Err(e) => {
                    // An unreadable file should not sink the batch.
                    ctx.logger
                        .warn(&format!("Skipping unprobeable file {}: {}", path.display(), e));
                }
            }
        }

        if clips.is_empty() {
            return Err(StepError::invalid_input(
                "none of the discovered files could be probed",
            ));
        }

        state.clips = Some(clips);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        if !state.has_clips() {
            return Err(StepError::invalid_output("No clips recorded"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_step_has_correct_name() {
        struct NoopProber;
        impl ClipProber for NoopProber {
            fn probe(&self, path: &std::path::Path) -> crate::analysis::ProbeResult<Clip> {
                Ok(Clip::new(path, 1000))
            }
        }

        let step = DiscoverStep::new(Arc::new(NoopProber));
        assert_eq!(step.name(), "Discover");
    }
}
