//! Edit plan structures (segments, exclusions, the frozen plan).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::{ActionClass, ClipRole, TransitionKind};

/// Plan artifact format version.
pub const PLAN_VERSION: &str = "2.0";

/// One plan-level unit: a trimmed, speed-assigned span of a source clip.
///
/// Owned exclusively by the plan that contains it; never shared across plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Source clip identifier.
    pub clip_id: String,
    /// Source file path.
    pub source: PathBuf,
    /// Trim in-point (clip-local, milliseconds).
    pub start_ms: u64,
    /// Trim out-point (clip-local, milliseconds, exclusive).
    pub end_ms: u64,
    /// Playback speed factor after clamping to the style's ramp range.
    pub speed_factor: f64,
    /// Action classification carried over from the precision cut.
    pub action: ActionClass,
    /// Transition into the following segment.
    pub transition_to_next: TransitionKind,
    /// Narrative role in the assembled sequence.
    #[serde(default)]
    pub role: ClipRole,
}

impl Segment {
    /// Source-side span length.
    pub fn source_duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Output length after the speed remap.
    pub fn output_duration_ms(&self) -> u64 {
        if self.speed_factor <= 0.0 {
            return self.source_duration_ms();
        }
        (self.source_duration_ms() as f64 / self.speed_factor).round() as u64
    }
}

/// A clip left out of the plan, with the reason recorded for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedClip {
    pub clip_id: String,
    pub reason: String,
}

/// The frozen, ordered set of trim/speed/transition operations that fully
/// determines the rendered output.
///
/// Immutable once built. Persisted as the unit of human review and of
/// execute-only re-runs; must round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    /// Artifact format version.
    pub version: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Style name the plan was built under.
    pub style: String,
    /// Requested target duration, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration_ms: Option<u64>,
    /// Ordered segments.
    pub segments: Vec<Segment>,
    /// Clips excluded from selection, with reasons.
    #[serde(default)]
    pub excluded: Vec<ExcludedClip>,
    /// Computed total output duration.
    pub total_output_ms: u64,
}

impl EditPlan {
    /// Recompute the total output duration from the segments.
    ///
    /// Matches `total_output_ms` on any plan built by the builder; used to
    /// verify loaded artifacts.
    pub fn computed_output_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.output_duration_ms()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: u64, end: u64, speed: f64) -> Segment {
        Segment {
            clip_id: "clip".to_string(),
            source: PathBuf::from("/videos/clip.mp4"),
            start_ms: start,
            end_ms: end,
            speed_factor: speed,
            action: ActionClass::Neutral,
            transition_to_next: TransitionKind::Cut,
            role: ClipRole::Buildup,
        }
    }

    #[test]
    fn segment_output_duration_divides_by_speed() {
        assert_eq!(segment(0, 3000, 1.5).output_duration_ms(), 2000);
        assert_eq!(segment(500, 1500, 0.5).output_duration_ms(), 2000);
    }

    #[test]
    fn plan_total_matches_segment_sum() {
        let plan = EditPlan {
            version: PLAN_VERSION.to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            style: "default".to_string(),
            target_duration_ms: Some(30_000),
            segments: vec![segment(0, 2000, 1.0), segment(0, 3000, 1.5)],
            excluded: Vec::new(),
            total_output_ms: 4000,
        };
        assert_eq!(plan.computed_output_ms(), 4000);
        assert_eq!(plan.segment_count(), 2);
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = EditPlan {
            version: PLAN_VERSION.to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            style: "kpop_story".to_string(),
            target_duration_ms: None,
            segments: vec![segment(100, 4100, 2.0)],
            excluded: vec![ExcludedClip {
                clip_id: "clip_007".to_string(),
                reason: "quality score below floor: 3".to_string(),
            }],
            total_output_ms: 2000,
        };
        let json = serde_json::to_string_pretty(&plan).unwrap();
        let parsed: EditPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }
}
