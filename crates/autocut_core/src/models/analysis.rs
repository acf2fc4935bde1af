//! Normalized content analysis results.
//!
//! Produced once per clip by the analysis adapter; never mutated afterward.
//! Re-analysis supersedes the whole record rather than editing it in place.

use serde::{Deserialize, Serialize};

use super::enums::ActionClass;

/// Half-open time window `[start_ms, end_ms)` in a clip's own timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeWindow {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Window length in milliseconds (0 for inverted windows).
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// A window is usable only when start < end.
    pub fn is_valid(&self) -> bool {
        self.start_ms < self.end_ms
    }
}

/// An action-classified span suggested by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionHint {
    pub span: TimeWindow,
    pub action: ActionClass,
}

/// Normalized per-clip analysis output.
///
/// Every field survives normalization even when the raw response is partially
/// malformed: missing pieces degrade to "unknown"/defaults instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Clip this result belongs to.
    pub clip_id: String,
    /// Scene and subject tags (sorted, deduplicated).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Mood tag ("unknown" when the service omitted it).
    #[serde(default = "unknown_tag")]
    pub mood: String,
    /// Quality score, clamped to 1..=10.
    pub quality_score: u8,
    /// Leading dead-air window, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_air: Option<TimeWindow>,
    /// Trailing morph/instability window, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morph: Option<TimeWindow>,
    /// Ordered action hints across the clip timeline.
    #[serde(default)]
    pub action_hints: Vec<ActionHint>,
}

fn unknown_tag() -> String {
    "unknown".to_string()
}

impl AnalysisResult {
    /// Create an empty result with a neutral score.
    ///
    /// Used as the normalization base; fields are filled from the raw
    /// response where present.
    pub fn empty(clip_id: impl Into<String>) -> Self {
        Self {
            clip_id: clip_id.into(),
            tags: Vec::new(),
            mood: unknown_tag(),
            quality_score: 5,
            dead_air: None,
            morph: None,
            action_hints: Vec::new(),
        }
    }
}

/// A recorded per-clip analysis failure.
///
/// Analysis failures are absorbed (the batch continues with the remaining
/// clips) but never dropped from the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    pub clip_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_duration_and_validity() {
        let w = TimeWindow::new(1200, 6800);
        assert_eq!(w.duration_ms(), 5600);
        assert!(w.is_valid());

        let inverted = TimeWindow::new(5000, 5000);
        assert_eq!(inverted.duration_ms(), 0);
        assert!(!inverted.is_valid());
    }

    #[test]
    fn empty_result_has_unknown_mood() {
        let result = AnalysisResult::empty("clip_001");
        assert_eq!(result.mood, "unknown");
        assert_eq!(result.quality_score, 5);
        assert!(result.dead_air.is_none());
    }
}
