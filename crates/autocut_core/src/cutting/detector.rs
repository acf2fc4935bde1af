//! Precision cut detection.
//!
//! Refines a clip's coarse analysis signals into millisecond-accurate,
//! action-classified cut spans. Deterministic given identical inputs, with
//! no side effects.

use crate::models::{ActionClass, AnalysisResult, Clip, CutEntry, PrecisionCut};

/// Policy constants for cut detection.
///
/// Empirically chosen, not structurally required; callers may override any
/// of them.
#[derive(Debug, Clone, Copy)]
pub struct CutPolicy {
    /// A dead-air window starting within this distance of the clip start is
    /// treated as leading dead air.
    pub dead_air_start_tolerance_ms: u64,
    /// A morph window ending within this distance of the clip tail is
    /// treated as trailing instability.
    pub morph_tail_tolerance_ms: u64,
    /// Slow-down factor for impact/highlight spans, inside [0.5, 0.8].
    pub impact_speed: f64,
    /// Speed-up factor for motion/transition spans, inside [1.2, 2.0].
    pub motion_speed: f64,
    /// Factor for everything else.
    pub neutral_speed: f64,
}

impl Default for CutPolicy {
    fn default() -> Self {
        Self {
            dead_air_start_tolerance_ms: 250,
            morph_tail_tolerance_ms: 500,
            impact_speed: 0.7,
            motion_speed: 1.5,
            neutral_speed: 1.0,
        }
    }
}

impl CutPolicy {
    /// Suggested speed factor for an action class.
    pub fn speed_for(&self, action: ActionClass) -> f64 {
        match action {
            ActionClass::Impact => self.impact_speed,
            ActionClass::Motion => self.motion_speed,
            ActionClass::Emotion | ActionClass::Neutral => self.neutral_speed,
        }
    }
}

/// Derive precision cuts for one clip from its analysis result.
///
/// A clip whose dead-air and morph windows overlap or jointly consume the
/// whole timeline yields zero entries; the caller excludes it from selection.
pub fn detect_cuts(clip: &Clip, analysis: &AnalysisResult, policy: &CutPolicy) -> PrecisionCut {
    let duration = clip.duration_ms;

    // Dead-air trim: shift the effective in-point forward.
    let mut in_point = 0u64;
    if let Some(dead_air) = &analysis.dead_air {
        if dead_air.is_valid() && dead_air.start_ms <= policy.dead_air_start_tolerance_ms {
            in_point = dead_air.end_ms.min(duration);
        }
    }

    // Morph trim: pull the effective out-point backward.
    let mut out_point = duration;
    if let Some(morph) = &analysis.morph {
        if morph.is_valid() && morph.end_ms + policy.morph_tail_tolerance_ms >= duration {
            out_point = morph.start_ms.min(duration);
        }
    }

    if in_point >= out_point {
        tracing::debug!(
            "Clip '{}' has no usable footage (in={}ms, out={}ms)",
            clip.id,
            in_point,
            out_point
        );
        return PrecisionCut::new(&clip.id, Vec::new());
    }

    // Action segmentation over the effective span. Hints are clamped to the
    // span; gaps between them become neutral spans.
    let mut entries: Vec<CutEntry> = Vec::new();
    let mut cursor = in_point;

    let mut hints = analysis.action_hints.clone();
    hints.sort_by_key(|h| h.span.start_ms);

    for hint in &hints {
        let start = hint.span.start_ms.max(cursor);
        let end = hint.span.end_ms.min(out_point);
        if end <= start {
            continue;
        }

        if start > cursor {
            entries.push(CutEntry {
                start_ms: cursor,
                end_ms: start,
                action: ActionClass::Neutral,
                suggested_speed: policy.neutral_speed,
            });
        }

        entries.push(CutEntry {
            start_ms: start,
            end_ms: end,
            action: hint.action,
            suggested_speed: policy.speed_for(hint.action),
        });
        cursor = end;
    }

    if cursor < out_point {
        entries.push(CutEntry {
            start_ms: cursor,
            end_ms: out_point,
            action: ActionClass::Neutral,
            suggested_speed: policy.neutral_speed,
        });
    }

    PrecisionCut::new(&clip.id, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionHint, TimeWindow};

    fn clip(duration_ms: u64) -> Clip {
        Clip::new("/videos/clip_002.mp4", duration_ms)
    }

    fn analysis(clip_id: &str) -> AnalysisResult {
        AnalysisResult::empty(clip_id)
    }

    #[test]
    fn no_signals_yields_whole_clip_neutral() {
        let clip = clip(8000);
        let cut = detect_cuts(&clip, &analysis(&clip.id), &CutPolicy::default());

        assert_eq!(cut.entries.len(), 1);
        assert_eq!(cut.entries[0].start_ms, 0);
        assert_eq!(cut.entries[0].end_ms, 8000);
        assert_eq!(cut.entries[0].action, ActionClass::Neutral);
        assert!(cut.validate(8000).is_ok());
    }

    #[test]
    fn trims_dead_air_and_morph() {
        // 8s clip: 1.5s dead air at start, morph in the last 0.5s.
        // One cut of about 6.0s must come out.
        let clip = clip(8000);
        let mut a = analysis(&clip.id);
        a.dead_air = Some(TimeWindow::new(0, 1500));
        a.morph = Some(TimeWindow::new(7500, 8000));

        let cut = detect_cuts(&clip, &a, &CutPolicy::default());
        assert_eq!(cut.entries.len(), 1);
        assert_eq!(cut.entries[0].start_ms, 1500);
        assert_eq!(cut.entries[0].end_ms, 7500);
        assert_eq!(cut.entries[0].source_duration_ms(), 6000);
    }

    #[test]
    fn overlapping_windows_consume_clip() {
        let clip = clip(4000);
        let mut a = analysis(&clip.id);
        a.dead_air = Some(TimeWindow::new(0, 2500));
        a.morph = Some(TimeWindow::new(2000, 4000));

        let cut = detect_cuts(&clip, &a, &CutPolicy::default());
        assert!(cut.is_empty());
    }

    #[test]
    fn windows_covering_everything_consume_clip() {
        let clip = clip(3000);
        let mut a = analysis(&clip.id);
        a.dead_air = Some(TimeWindow::new(0, 3000));

        let cut = detect_cuts(&clip, &a, &CutPolicy::default());
        assert!(cut.is_empty());
    }

    #[test]
    fn late_dead_air_is_not_a_leading_trim() {
        let clip = clip(8000);
        let mut a = analysis(&clip.id);
        // Starts 2s in: not leading dead air, no trim.
        a.dead_air = Some(TimeWindow::new(2000, 3000));

        let cut = detect_cuts(&clip, &a, &CutPolicy::default());
        assert_eq!(cut.entries[0].start_ms, 0);
    }

    #[test]
    fn hints_partition_span_with_policy_speeds() {
        let clip = clip(8000);
        let policy = CutPolicy::default();
        let mut a = analysis(&clip.id);
        a.dead_air = Some(TimeWindow::new(0, 1200));
        a.morph = Some(TimeWindow::new(6800, 8000));
        a.action_hints = vec![
            ActionHint {
                span: TimeWindow::new(1200, 3500),
                action: ActionClass::Motion,
            },
            ActionHint {
                span: TimeWindow::new(3500, 5500),
                action: ActionClass::Impact,
            },
        ];

        let cut = detect_cuts(&clip, &a, &policy);
        assert!(cut.validate(8000).is_ok());
        assert_eq!(cut.entries.len(), 3);

        assert_eq!(cut.entries[0].action, ActionClass::Motion);
        assert!((cut.entries[0].suggested_speed - policy.motion_speed).abs() < 1e-9);

        assert_eq!(cut.entries[1].action, ActionClass::Impact);
        assert!((cut.entries[1].suggested_speed - policy.impact_speed).abs() < 1e-9);

        // Gap up to the out-point becomes a neutral tail span
        assert_eq!(cut.entries[2].action, ActionClass::Neutral);
        assert_eq!(cut.entries[2].start_ms, 5500);
        assert_eq!(cut.entries[2].end_ms, 6800);
    }

    #[test]
    fn hints_outside_effective_span_are_clamped_away() {
        let clip = clip(6000);
        let mut a = analysis(&clip.id);
        a.dead_air = Some(TimeWindow::new(0, 2000));
        a.action_hints = vec![ActionHint {
            span: TimeWindow::new(0, 1500),
            action: ActionClass::Impact,
        }];

        let cut = detect_cuts(&clip, &a, &CutPolicy::default());
        // The hint lies wholly inside the trimmed dead air
        assert_eq!(cut.entries.len(), 1);
        assert_eq!(cut.entries[0].start_ms, 2000);
        assert_eq!(cut.entries[0].action, ActionClass::Neutral);
    }

    #[test]
    fn detection_is_deterministic() {
        let clip = clip(8000);
        let mut a = analysis(&clip.id);
        a.dead_air = Some(TimeWindow::new(0, 800));
        a.action_hints = vec![ActionHint {
            span: TimeWindow::new(900, 4000),
            action: ActionClass::Motion,
        }];

        let first = detect_cuts(&clip, &a, &CutPolicy::default());
        let second = detect_cuts(&clip, &a, &CutPolicy::default());
        assert_eq!(first, second);
    }
}
