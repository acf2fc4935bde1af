//! Edit plan construction.
//!
//! Selects, trims, orders and assigns speed/transition metadata to segments
//! under the resolved duration budget. Pure: no side effects beyond the
//! returned plan, no external calls.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::StyleConstraints;
use crate::models::{
    ActionClass, AnalysisResult, Clip, ClipRole, EditPlan, ExcludedClip, PrecisionCut, Segment,
    PLAN_VERSION,
};

/// Errors raised during plan construction.
#[derive(Error, Debug)]
pub enum PlanError {
    /// Nothing usable across all clips after cut detection and bounds
    /// enforcement.
    #[error("No usable cuts across any clip; nothing to select from")]
    NoUsableCuts,
}

/// A selectable span: one bounded cut entry tagged with its clip's quality.
#[derive(Debug, Clone)]
struct Candidate {
    clip_index: usize,
    clip_id: String,
    source: std::path::PathBuf,
    start_ms: u64,
    end_ms: u64,
    action: ActionClass,
    /// Already clamped to the active speed-ramp range.
    speed_factor: f64,
    quality: u8,
}

impl Candidate {
    fn output_ms(&self) -> u64 {
        let source = self.end_ms.saturating_sub(self.start_ms);
        if self.speed_factor <= 0.0 {
            return source;
        }
        (source as f64 / self.speed_factor).round() as u64
    }
}

/// Build an edit plan from detected cuts under the given constraints.
///
/// `clips` must be in discovery order - that order is the stable tie-break
/// for selection and the cross-clip ordering rule. `prior_exclusions`
/// carries clips already dropped upstream (analysis failures); they are
/// reported in the plan but never re-litigated here.
pub fn build_plan(
    clips: &[Clip],
    analyses: &BTreeMap<String, AnalysisResult>,
    cuts: &BTreeMap<String, PrecisionCut>,
    constraints: &StyleConstraints,
    target_duration_secs: Option<f64>,
    prior_exclusions: Vec<ExcludedClip>,
) -> Result<EditPlan, PlanError> {
    let mut excluded = prior_exclusions;
    let candidates = collect_candidates(clips, analyses, cuts, constraints, &mut excluded);

    if candidates.is_empty() {
        return Err(PlanError::NoUsableCuts);
    }

    let selected = select_candidates(&candidates, constraints, target_duration_secs);
    let segments = order_and_annotate(selected, constraints);
    let total_output_ms = segments.iter().map(|s| s.output_duration_ms()).sum();

    Ok(EditPlan {
        version: PLAN_VERSION.to_string(),
        created_at: chrono::Local::now().to_rfc3339(),
        style: constraints.style_name.clone(),
        target_duration_ms: target_duration_secs.map(|secs| (secs * 1000.0).round() as u64),
        segments,
        excluded,
        total_output_ms,
    })
}

/// Flatten cut entries into bounded candidates, recording exclusions.
fn collect_candidates(
    clips: &[Clip],
    analyses: &BTreeMap<String, AnalysisResult>,
    cuts: &BTreeMap<String, PrecisionCut>,
    constraints: &StyleConstraints,
    excluded: &mut Vec<ExcludedClip>,
) -> Vec<Candidate> {
    let min_ms = (constraints.clip_duration.min_secs * 1000.0).round() as u64;
    let max_ms = ((constraints.clip_duration.max_secs * 1000.0).round() as u64).max(1);

    let mut candidates = Vec::new();

    for (clip_index, clip) in clips.iter().enumerate() {
        if excluded.iter().any(|e| e.clip_id == clip.id) {
            continue;
        }

        let Some(analysis) = analyses.get(&clip.id) else {
            excluded.push(ExcludedClip {
                clip_id: clip.id.clone(),
                reason: "analysis result missing".to_string(),
            });
            continue;
        };

        if analysis.quality_score < constraints.min_quality_score {
            excluded.push(ExcludedClip {
                clip_id: clip.id.clone(),
                reason: format!("quality score below floor: {}", analysis.quality_score),
            });
            continue;
        }

        let Some(cut) = cuts.get(&clip.id) else {
            excluded.push(ExcludedClip {
                clip_id: clip.id.clone(),
                reason: "cut detection result missing".to_string(),
            });
            continue;
        };

        if cut.is_empty() {
            excluded.push(ExcludedClip {
                clip_id: clip.id.clone(),
                reason: "no usable footage after trimming".to_string(),
            });
            continue;
        }

        let before = candidates.len();

        for entry in &cut.entries {
            let speed = constraints.speed_ramp.clamp(entry.suggested_speed);

            // Split overlong spans at the max length; discard undersized
            // remainders.
            let mut start = entry.start_ms;
            while start < entry.end_ms {
                let end = (start + max_ms).min(entry.end_ms);
                if end - start >= min_ms {
                    candidates.push(Candidate {
                        clip_index,
                        clip_id: clip.id.clone(),
                        source: clip.path.clone(),
                        start_ms: start,
                        end_ms: end,
                        action: entry.action,
                        speed_factor: speed,
                        quality: analysis.quality_score,
                    });
                }
                start = end;
            }
        }

        if candidates.len() == before {
            excluded.push(ExcludedClip {
                clip_id: clip.id.clone(),
                reason: format!(
                    "all spans shorter than the {:.1}s minimum",
                    constraints.clip_duration.min_secs
                ),
            });
        }
    }

    candidates
}

/// Greedy quality-first selection under the duration budget.
fn select_candidates(
    candidates: &[Candidate],
    constraints: &StyleConstraints,
    target_duration_secs: Option<f64>,
) -> Vec<Candidate> {
    let platform_ms = (constraints.platform_max_secs * 1000.0).round() as u64;
    let budget_ms = match target_duration_secs {
        Some(secs) => ((secs * 1000.0).round() as u64).min(platform_ms),
        None => platform_ms,
    };
    let tolerance_ms = (constraints.clip_duration.avg_secs * 1000.0).round() as u64;

    // Quality descending; ties broken by clip discovery order, then by
    // position inside the clip, so selection is deterministic.
    let mut order: Vec<&Candidate> = candidates.iter().collect();
    order.sort_by(|a, b| {
        b.quality
            .cmp(&a.quality)
            .then(a.clip_index.cmp(&b.clip_index))
            .then(a.start_ms.cmp(&b.start_ms))
    });

    let mut selected: Vec<Candidate> = Vec::new();
    let mut total_ms = 0u64;

    for candidate in order.iter() {
        if total_ms >= budget_ms {
            break;
        }
        let duration = candidate.output_ms();
        // Overshooting the budget by more than one average clip length is
        // too much; skip and let a shorter span fill the gap.
        if total_ms + duration > budget_ms + tolerance_ms {
            continue;
        }
        selected.push((*candidate).clone());
        total_ms += duration;
    }

    // A budget smaller than every candidate must still yield a plan: fall
    // back to the single best span.
    if selected.is_empty() {
        if let Some(best) = order.first() {
            selected.push((*best).clone());
        }
    }

    selected
}

/// Order the selection and attach transitions and narrative roles.
fn order_and_annotate(mut selected: Vec<Candidate>, constraints: &StyleConstraints) -> Vec<Segment> {
    // Segments from one clip keep their internal chronological order;
    // across clips the stable rule is earliest-discovered-clip-first.
    selected.sort_by(|a, b| {
        a.clip_index
            .cmp(&b.clip_index)
            .then(a.start_ms.cmp(&b.start_ms))
    });

    let count = selected.len();
    selected
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| {
            let transition = candidate
                .action
                .transition_hint()
                .unwrap_or(constraints.default_transition);

            let role = if i == 0 {
                ClipRole::Opener
            } else if i == count - 1 {
                ClipRole::Closer
            } else if candidate.action == ActionClass::Impact {
                ClipRole::Peak
            } else {
                ClipRole::Buildup
            };

            Segment {
                clip_id: candidate.clip_id,
                source: candidate.source,
                start_ms: candidate.start_ms,
                end_ms: candidate.end_ms,
                speed_factor: candidate.speed_factor,
                action: candidate.action,
                transition_to_next: transition,
                role,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClipDurationRange, SpeedRampRange};
    use crate::models::{CutEntry, TransitionKind};

    fn clip(id: &str, duration_ms: u64) -> Clip {
        let mut clip = Clip::new(format!("/videos/{}.mp4", id), duration_ms);
        clip.id = id.to_string();
        clip
    }

    fn analysis(id: &str, quality: u8) -> AnalysisResult {
        let mut a = AnalysisResult::empty(id);
        a.quality_score = quality;
        a
    }

    fn single_cut(id: &str, start: u64, end: u64, speed: f64) -> PrecisionCut {
        PrecisionCut::new(
            id,
            vec![CutEntry {
                start_ms: start,
                end_ms: end,
                action: ActionClass::Neutral,
                suggested_speed: speed,
            }],
        )
    }

    fn wide_constraints() -> StyleConstraints {
        StyleConstraints {
            clip_duration: ClipDurationRange {
                min_secs: 1.5,
                max_secs: 20.0,
                avg_secs: 3.0,
            },
            ..StyleConstraints::default()
        }
    }

    struct Fixture {
        clips: Vec<Clip>,
        analyses: BTreeMap<String, AnalysisResult>,
        cuts: BTreeMap<String, PrecisionCut>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clips: Vec::new(),
                analyses: BTreeMap::new(),
                cuts: BTreeMap::new(),
            }
        }

        fn with(mut self, id: &str, duration_ms: u64, quality: u8, cut: PrecisionCut) -> Self {
            self.clips.push(clip(id, duration_ms));
            self.analyses.insert(id.to_string(), analysis(id, quality));
            self.cuts.insert(id.to_string(), cut);
            self
        }

        fn build(
            &self,
            constraints: &StyleConstraints,
            target: Option<f64>,
        ) -> Result<EditPlan, PlanError> {
            build_plan(
                &self.clips,
                &self.analyses,
                &self.cuts,
                constraints,
                target,
                Vec::new(),
            )
        }
    }

    #[test]
    fn selects_by_quality_until_budget_reached() {
        // Three 15s candidates, quality 9/7/5; target 30s, platform 60s.
        // Selection takes the quality-9 and quality-7 spans and stops.
        let fixture = Fixture::new()
            .with("clip_a", 15_000, 9, single_cut("clip_a", 0, 15_000, 1.0))
            .with("clip_b", 15_000, 7, single_cut("clip_b", 0, 15_000, 1.0))
            .with("clip_c", 15_000, 5, single_cut("clip_c", 0, 15_000, 1.0));

        let plan = fixture.build(&wide_constraints(), Some(30.0)).unwrap();

        assert_eq!(plan.segment_count(), 2);
        let ids: Vec<&str> = plan.segments.iter().map(|s| s.clip_id.as_str()).collect();
        assert!(ids.contains(&"clip_a"));
        assert!(ids.contains(&"clip_b"));
        assert!(!ids.contains(&"clip_c"));
        assert_eq!(plan.total_output_ms, 30_000);
    }

    #[test]
    fn total_stays_within_budget_plus_average_tolerance() {
        let constraints = wide_constraints();
        let fixture = Fixture::new()
            .with("clip_a", 12_000, 9, single_cut("clip_a", 0, 12_000, 1.0))
            .with("clip_b", 12_000, 8, single_cut("clip_b", 0, 12_000, 1.0))
            .with("clip_c", 12_000, 7, single_cut("clip_c", 0, 12_000, 1.0));

        let plan = fixture.build(&constraints, Some(20.0)).unwrap();

        let budget_ms = 20_000u64;
        let tolerance_ms = (constraints.clip_duration.avg_secs * 1000.0) as u64;
        assert!(plan.total_output_ms <= budget_ms + tolerance_ms);
    }

    #[test]
    fn platform_ceiling_caps_the_target() {
        let mut constraints = wide_constraints();
        constraints.platform_max_secs = 20.0;

        let fixture = Fixture::new()
            .with("clip_a", 15_000, 9, single_cut("clip_a", 0, 15_000, 1.0))
            .with("clip_b", 15_000, 8, single_cut("clip_b", 0, 15_000, 1.0))
            .with("clip_c", 15_000, 7, single_cut("clip_c", 0, 15_000, 1.0));

        // Target beyond the platform ceiling: the ceiling wins.
        let plan = fixture.build(&constraints, Some(90.0)).unwrap();
        assert!(plan.total_output_ms <= 20_000 + 3_000);
    }

    #[test]
    fn disabled_speed_ramp_forces_unity() {
        let mut constraints = wide_constraints();
        constraints.speed_ramp.enabled = false;

        let fixture = Fixture::new().with(
            "clip_a",
            10_000,
            8,
            single_cut("clip_a", 0, 10_000, 1.7),
        );

        let plan = fixture.build(&constraints, None).unwrap();
        assert!(plan
            .segments
            .iter()
            .all(|s| (s.speed_factor - 1.0).abs() < 1e-9));
    }

    #[test]
    fn speed_suggestions_are_clamped_to_ramp_range() {
        let mut constraints = wide_constraints();
        constraints.speed_ramp = SpeedRampRange {
            enabled: true,
            min_factor: 0.5,
            max_factor: 2.0,
        };

        let fixture = Fixture::new().with(
            "clip_a",
            10_000,
            8,
            single_cut("clip_a", 0, 10_000, 5.0),
        );

        let plan = fixture.build(&constraints, None).unwrap();
        assert!((plan.segments[0].speed_factor - 2.0).abs() < 1e-9);
    }

    #[test]
    fn overlong_spans_are_split_and_undersized_dropped() {
        let mut constraints = wide_constraints();
        constraints.clip_duration.max_secs = 6.0;

        // 14s span splits into 6s + 6s + 2s; all three survive the 1.5s
        // minimum.
        let fixture = Fixture::new().with(
            "clip_a",
            14_000,
            8,
            single_cut("clip_a", 0, 14_000, 1.0),
        );

        let plan = fixture.build(&constraints, None).unwrap();
        assert_eq!(plan.segment_count(), 3);
        assert_eq!(plan.segments[0].end_ms, 6_000);
        assert_eq!(plan.segments[1].end_ms, 12_000);
        assert_eq!(plan.segments[2].end_ms, 14_000);
    }

    #[test]
    fn clip_with_only_undersized_spans_is_excluded() {
        let fixture = Fixture::new()
            .with("clip_a", 10_000, 8, single_cut("clip_a", 0, 10_000, 1.0))
            .with("clip_b", 1_000, 9, single_cut("clip_b", 0, 1_000, 1.0));

        let plan = fixture.build(&wide_constraints(), None).unwrap();
        assert!(plan
            .excluded
            .iter()
            .any(|e| e.clip_id == "clip_b" && e.reason.contains("minimum")));
    }

    #[test]
    fn low_quality_clips_are_excluded_with_reason() {
        let fixture = Fixture::new()
            .with("clip_a", 10_000, 8, single_cut("clip_a", 0, 10_000, 1.0))
            .with("clip_b", 10_000, 3, single_cut("clip_b", 0, 10_000, 1.0));

        let plan = fixture.build(&wide_constraints(), None).unwrap();
        assert!(plan.segments.iter().all(|s| s.clip_id != "clip_b"));
        assert!(plan
            .excluded
            .iter()
            .any(|e| e.clip_id == "clip_b" && e.reason.contains("quality")));
    }

    #[test]
    fn zero_usable_cuts_is_infeasible() {
        let fixture = Fixture::new().with(
            "clip_a",
            5_000,
            8,
            PrecisionCut::new("clip_a", Vec::new()),
        );

        let result = fixture.build(&wide_constraints(), Some(30.0));
        assert!(matches!(result, Err(PlanError::NoUsableCuts)));
    }

    #[test]
    fn plan_is_non_empty_when_any_cut_is_usable() {
        // Budget far below the only candidate: the best span is still taken.
        let mut constraints = wide_constraints();
        constraints.platform_max_secs = 2.0;

        let fixture = Fixture::new().with(
            "clip_a",
            15_000,
            8,
            single_cut("clip_a", 0, 15_000, 1.0),
        );

        let plan = fixture.build(&constraints, Some(1.0)).unwrap();
        assert_eq!(plan.segment_count(), 1);
    }

    #[test]
    fn ordering_keeps_clip_chronology_and_discovery_order() {
        let cut_two_spans = |id: &str| {
            PrecisionCut::new(
                id,
                vec![
                    CutEntry {
                        start_ms: 0,
                        end_ms: 4_000,
                        action: ActionClass::Neutral,
                        suggested_speed: 1.0,
                    },
                    CutEntry {
                        start_ms: 4_000,
                        end_ms: 8_000,
                        action: ActionClass::Neutral,
                        suggested_speed: 1.0,
                    },
                ],
            )
        };

        let fixture = Fixture::new()
            .with("clip_a", 8_000, 7, cut_two_spans("clip_a"))
            .with("clip_b", 8_000, 9, cut_two_spans("clip_b"));

        let plan = fixture.build(&wide_constraints(), None).unwrap();

        let order: Vec<(String, u64)> = plan
            .segments
            .iter()
            .map(|s| (s.clip_id.clone(), s.start_ms))
            .collect();

        // clip_a was discovered first, so its segments come first even
        // though clip_b scored higher; within each clip the spans stay
        // chronological.
        assert_eq!(
            order,
            vec![
                ("clip_a".to_string(), 0),
                ("clip_a".to_string(), 4_000),
                ("clip_b".to_string(), 0),
                ("clip_b".to_string(), 4_000),
            ]
        );
    }

    #[test]
    fn transitions_use_hint_or_style_default() {
        let mut constraints = wide_constraints();
        constraints.default_transition = TransitionKind::Fade;

        let cut = PrecisionCut::new(
            "clip_a",
            vec![
                CutEntry {
                    start_ms: 0,
                    end_ms: 4_000,
                    action: ActionClass::Motion,
                    suggested_speed: 1.5,
                },
                CutEntry {
                    start_ms: 4_000,
                    end_ms: 8_000,
                    action: ActionClass::Neutral,
                    suggested_speed: 1.0,
                },
            ],
        );

        let fixture = Fixture::new().with("clip_a", 8_000, 8, cut);
        let plan = fixture.build(&constraints, None).unwrap();

        // Motion carries its own hint; neutral falls back to the style.
        assert_eq!(plan.segments[0].transition_to_next, TransitionKind::Dissolve);
        assert_eq!(plan.segments[1].transition_to_next, TransitionKind::Fade);
    }

    #[test]
    fn roles_mark_opener_and_closer() {
        let fixture = Fixture::new()
            .with("clip_a", 6_000, 8, single_cut("clip_a", 0, 6_000, 1.0))
            .with("clip_b", 6_000, 8, single_cut("clip_b", 0, 6_000, 1.0))
            .with("clip_c", 6_000, 8, single_cut("clip_c", 0, 6_000, 1.0));

        let plan = fixture.build(&wide_constraints(), None).unwrap();
        assert_eq!(plan.segments.first().unwrap().role, ClipRole::Opener);
        assert_eq!(plan.segments.last().unwrap().role, ClipRole::Closer);
    }

    #[test]
    fn prior_exclusions_survive_into_the_plan() {
        let fixture = Fixture::new().with(
            "clip_a",
            10_000,
            8,
            single_cut("clip_a", 0, 10_000, 1.0),
        );

        let plan = build_plan(
            &fixture.clips,
            &fixture.analyses,
            &fixture.cuts,
            &wide_constraints(),
            None,
            vec![ExcludedClip {
                clip_id: "clip_broken".to_string(),
                reason: "analysis failed: service unavailable".to_string(),
            }],
        )
        .unwrap();

        assert!(plan
            .excluded
            .iter()
            .any(|e| e.clip_id == "clip_broken"));
    }
}
