//! Render execution.
//!
//! Translates a frozen edit plan into a strict sequence of trim /
//! speed-remap / concatenate operations against the media engine. Segments
//! render strictly in plan order - segment i+1 never starts before segment i
//! completes - so a failure always attributes to an unambiguous segment
//! index. On failure, already-produced intermediates are kept for
//! diagnostics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{EditPlan, Segment};

use super::engine::{
    ConcatRequest, EngineError, MediaEngine, SpeedRemapRequest, SpeedSpan, TrimRequest,
};
use super::presets::EncodeSettings;

/// Errors raised during render execution.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Plan has no segments to render")]
    EmptyPlan,

    #[error("Rendering segment {index} ('{clip_id}') failed: {source}")]
    SegmentFailed {
        index: usize,
        clip_id: String,
        #[source]
        source: EngineError,
    },

    #[error("Concatenating segments failed: {source}")]
    ConcatFailed {
        #[source]
        source: EngineError,
    },

    #[error("Failed to prepare work directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Probing rendered output failed: {source}")]
    OutputProbe {
        #[source]
        source: EngineError,
    },
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Successful render summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutcome {
    /// Final output file.
    pub output_path: PathBuf,
    /// Duration the plan computed.
    pub expected_duration_ms: u64,
    /// Duration measured from the rendered file.
    pub realized_duration_ms: u64,
    /// Number of plan segments rendered.
    pub segments_rendered: usize,
}

impl RenderOutcome {
    /// Whether the realized duration matches the plan within a tolerance.
    pub fn duration_within(&self, tolerance_ms: u64) -> bool {
        self.realized_duration_ms.abs_diff(self.expected_duration_ms) <= tolerance_ms
    }
}

/// Executes frozen edit plans against a media engine.
pub struct RenderExecutor {
    engine: Arc<dyn MediaEngine>,
    encode: EncodeSettings,
    keep_intermediates: bool,
    duration_tolerance_ms: u64,
}

impl RenderExecutor {
    pub fn new(engine: Arc<dyn MediaEngine>, encode: EncodeSettings) -> Self {
        Self {
            engine,
            encode,
            keep_intermediates: false,
            duration_tolerance_ms: 150,
        }
    }

    /// Keep per-segment intermediates after a successful render.
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    /// Tolerance for the output-duration verification.
    pub fn duration_tolerance_ms(mut self, tolerance: u64) -> Self {
        self.duration_tolerance_ms = tolerance;
        self
    }

    /// Render the plan into `output_path`, staging intermediates under
    /// `work_dir`.
    pub fn render(
        &self,
        plan: &EditPlan,
        work_dir: &Path,
        output_path: &Path,
    ) -> RenderResult<RenderOutcome> {
        if plan.is_empty() {
            return Err(RenderError::EmptyPlan);
        }

        fs::create_dir_all(work_dir).map_err(|source| RenderError::Workspace {
            path: work_dir.to_path_buf(),
            source,
        })?;
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|source| RenderError::Workspace {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Contiguous segments from the same clip render as one engine call
        // with a factor curve (variable-rate); everything else renders
        // constant-rate.
        let groups = group_segments(&plan.segments);
        let mut intermediates: Vec<PathBuf> = Vec::new();

        for group in &groups {
            let intermediate = work_dir.join(format!("part_{:03}.mp4", group.first_index));
            self.render_group(group, &intermediate)?;
            intermediates.push(intermediate);
        }

        let concat = ConcatRequest {
            inputs: &intermediates,
            output: output_path,
            encode: &self.encode,
        };
        self.engine
            .concatenate(&concat)
            .map_err(|source| RenderError::ConcatFailed { source })?;

        let realized_duration_ms = self
            .engine
            .probe_duration_ms(output_path)
            .map_err(|source| RenderError::OutputProbe { source })?;

        let outcome = RenderOutcome {
            output_path: output_path.to_path_buf(),
            expected_duration_ms: plan.total_output_ms,
            realized_duration_ms,
            segments_rendered: plan.segment_count(),
        };

        if !outcome.duration_within(self.duration_tolerance_ms) {
            tracing::warn!(
                "Rendered duration {}ms deviates from planned {}ms by more than {}ms",
                outcome.realized_duration_ms,
                outcome.expected_duration_ms,
                self.duration_tolerance_ms
            );
        }

        if !self.keep_intermediates {
            for path in &intermediates {
                if path.exists() {
                    let _ = fs::remove_file(path);
                }
            }
        }

        Ok(outcome)
    }

    fn render_group(&self, group: &SegmentGroup<'_>, output: &Path) -> RenderResult<()> {
        let first = group.segments[0];

        let constant_unity = group.segments.len() == 1 && (first.speed_factor - 1.0).abs() < 1e-9;

        let result = if constant_unity {
            self.engine.trim(&TrimRequest {
                source: &first.source,
                start_ms: first.start_ms,
                end_ms: first.end_ms,
                output,
                encode: &self.encode,
            })
        } else {
            let spans: Vec<SpeedSpan> = group
                .segments
                .iter()
                .map(|s| SpeedSpan {
                    start_ms: s.start_ms,
                    end_ms: s.end_ms,
                    factor: s.speed_factor,
                })
                .collect();
            self.engine.speed_remap(&SpeedRemapRequest {
                source: &first.source,
                spans: &spans,
                output,
                encode: &self.encode,
            })
        };

        result.map_err(|source| RenderError::SegmentFailed {
            index: group.first_index,
            clip_id: first.clip_id.clone(),
            source,
        })
    }
}

/// A run of contiguous segments from one clip.
struct SegmentGroup<'a> {
    /// Plan index of the first segment in the run.
    first_index: usize,
    segments: Vec<&'a Segment>,
}

/// Group consecutive segments that came from one continuous span of the
/// same clip.
fn group_segments(segments: &[Segment]) -> Vec<SegmentGroup<'_>> {
    let mut groups: Vec<SegmentGroup<'_>> = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        if let Some(group) = groups.last_mut() {
            if let Some(last) = group.segments.last() {
                if last.clip_id == segment.clip_id && last.end_ms == segment.start_ms {
                    group.segments.push(segment);
                    continue;
                }
            }
        }

        groups.push(SegmentGroup {
            first_index: index,
            segments: vec![segment],
        });
    }

    groups
}
