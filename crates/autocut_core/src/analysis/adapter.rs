//! Adapter between the external analysis service and the pipeline.
//!
//! Owns everything the service boundary needs but the pipeline should not
//! see: bounded concurrency, retry with exponential backoff, response
//! normalization, and the partial-failure policy (a clip whose analysis
//! exhausts its attempt budget becomes a warning, not an abort).

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::analysis::cache::AnalysisCache;
use crate::analysis::service::{AnalysisError, AnalysisRequest, ContentAnalyzer};
use crate::clips::signature_for;
use crate::models::{ActionClass, ActionHint, AnalysisResult, AnalysisWarning, Clip, TimeWindow};

/// Retry policy for a single clip's analysis.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempt budget (first try included).
    pub max_attempts: u32,
    /// Base delay; attempt n waits `base * 2^(n-1)`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

/// Outcome of analyzing a batch of clips.
///
/// Results are keyed by clip id, so downstream stages reassemble
/// deterministically regardless of completion order.
#[derive(Debug, Default)]
pub struct BatchAnalysis {
    pub results: BTreeMap<String, AnalysisResult>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Normalizing, retrying front-end over a `ContentAnalyzer`.
pub struct ContentAnalysisAdapter {
    analyzer: Arc<dyn ContentAnalyzer>,
    retry: RetryPolicy,
    max_concurrent: usize,
    style_hint: Option<String>,
}

impl ContentAnalysisAdapter {
    pub fn new(analyzer: Arc<dyn ContentAnalyzer>, retry: RetryPolicy, max_concurrent: u32) -> Self {
        Self {
            analyzer,
            retry,
            max_concurrent: max_concurrent.max(1) as usize,
            style_hint: None,
        }
    }

    /// Forward a style description to the service with each request.
    pub fn with_style_hint(mut self, hint: impl Into<String>) -> Self {
        self.style_hint = Some(hint.into());
        self
    }

    /// Analyze one clip with retries.
    pub fn analyze_clip(&self, clip: &Clip) -> Result<AnalysisResult, AnalysisError> {
        let mut last_error: Option<AnalysisError> = None;

        for attempt in 1..=self.retry.max_attempts {
            let request = AnalysisRequest {
                clip,
                style_hint: self.style_hint.as_deref(),
            };

            match self.analyzer.analyze(&request) {
                Ok(raw) => return normalize(clip, &raw),
                Err(e) => {
                    if attempt < self.retry.max_attempts {
                        let delay = self.retry.base_delay * 2u32.saturating_pow(attempt - 1);
                        tracing::warn!(
                            "Analysis attempt {}/{} for '{}' failed ({}); retrying in {:?}",
                            attempt,
                            self.retry.max_attempts,
                            clip.id,
                            e,
                            delay
                        );
                        std::thread::sleep(delay);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AnalysisError::Service {
            clip_id: clip.id.clone(),
            message: "no attempts were made".to_string(),
        }))
    }

    /// Analyze a batch of clips under the concurrency bound.
    ///
    /// Cached results (keyed by clip id + content signature) short-circuit
    /// the service call; fresh results are written through. Per-clip
    /// failures are recorded as warnings and the batch continues.
    pub fn analyze_batch(&self, clips: &[Clip], cache: Option<&AnalysisCache>) -> BatchAnalysis {
        let results: Mutex<BTreeMap<String, AnalysisResult>> = Mutex::new(BTreeMap::new());
        let warnings: Mutex<Vec<AnalysisWarning>> = Mutex::new(Vec::new());
        let queue: Mutex<VecDeque<&Clip>> = Mutex::new(clips.iter().collect());

        let workers = self.max_concurrent.min(clips.len().max(1));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    // Pop under the lock, then release it before any
                    // external call.
                    let clip = { queue.lock().pop_front() };
                    let Some(clip) = clip else { break };

                    let signature = signature_for(&clip.path).ok();

                    if let (Some(cache), Some(sig)) = (cache, signature.as_ref()) {
                        if let Some(hit) = cache.load_analysis(&clip.id, sig) {
                            tracing::debug!("Analysis cache hit for '{}'", clip.id);
                            results.lock().insert(clip.id.clone(), hit);
                            continue;
                        }
                    }

                    match self.analyze_clip(clip) {
                        Ok(result) => {
                            if let (Some(cache), Some(sig)) = (cache, signature.as_ref()) {
                                if let Err(e) = cache.store_analysis(&clip.id, sig, &result) {
                                    tracing::warn!(
                                        "Failed to cache analysis for '{}': {}",
                                        clip.id,
                                        e
                                    );
                                }
                            }
                            results.lock().insert(clip.id.clone(), result);
                        }
                        Err(e) => {
                            tracing::warn!("Skipping '{}': {}", clip.id, e);
                            warnings.lock().push(AnalysisWarning {
                                clip_id: clip.id.clone(),
                                message: e.to_string(),
                            });
                        }
                    }
                });
            }
        });

        BatchAnalysis {
            results: results.into_inner(),
            warnings: warnings.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a raw service response into the fixed `AnalysisResult` shape.
///
/// Individual missing or malformed fields degrade to "unknown"/defaults; only
/// a document that is not a JSON object at all is rejected.
pub fn normalize(clip: &Clip, raw: &Value) -> Result<AnalysisResult, AnalysisError> {
    let object = raw.as_object().ok_or_else(|| AnalysisError::Malformed {
        clip_id: clip.id.clone(),
        detail: "response is not a JSON object".to_string(),
    })?;

    let mut result = AnalysisResult::empty(&clip.id);

    // Tags from any of the shapes analyzers emit
    let mut tags: Vec<String> = Vec::new();
    for key in ["scene_tags", "subjects", "tags"] {
        if let Some(values) = object.get(key).and_then(|v| v.as_array()) {
            tags.extend(
                values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string()),
            );
        }
    }
    tags.sort();
    tags.dedup();
    result.tags = tags;

    if let Some(mood) = object.get("mood").and_then(|m| m.as_str()) {
        if !mood.is_empty() {
            result.mood = mood.to_string();
        }
    }

    if let Some(score) = object.get("quality_score").and_then(|q| q.as_i64()) {
        result.quality_score = score.clamp(1, 10) as u8;
    }

    let artifacts = object.get("ai_artifacts");

    result.dead_air = artifacts
        .and_then(|a| a.get("dead_air"))
        .and_then(|d| parse_window(d, "end_ms", 0, clip.duration_ms, WindowAnchor::Start));

    result.morph = artifacts
        .and_then(|a| a.get("morphing"))
        .and_then(|m| parse_window(m, "start_ms", 0, clip.duration_ms, WindowAnchor::End));

    if let Some(segments) = object.get("segments").and_then(|s| s.as_array()) {
        let mut hints: Vec<ActionHint> = segments
            .iter()
            .filter_map(|segment| {
                let start = segment.get("start_ms")?.as_u64()?;
                let end = segment.get("end_ms")?.as_u64()?;
                if start >= end {
                    return None;
                }
                let action = segment
                    .get("action_type")
                    .and_then(|a| a.as_str())
                    .map(ActionClass::from_hint)
                    .unwrap_or_default();
                Some(ActionHint {
                    span: TimeWindow::new(start, end),
                    action,
                })
            })
            .collect();
        hints.sort_by_key(|h| h.span.start_ms);
        result.action_hints = hints;
    }

    Ok(result)
}

enum WindowAnchor {
    /// Window runs from the clip start to the reported boundary.
    Start,
    /// Window runs from the reported boundary to the clip end.
    End,
}

/// Parse a `{detected, <boundary_ms>}` artifact object into a window.
fn parse_window(
    value: &Value,
    boundary_key: &str,
    clip_start: u64,
    clip_end: u64,
    anchor: WindowAnchor,
) -> Option<TimeWindow> {
    let detected = value.get("detected").and_then(|d| d.as_bool()).unwrap_or(false);
    if !detected {
        return None;
    }
    let boundary = value.get(boundary_key).and_then(|b| b.as_u64())?;

    let window = match anchor {
        WindowAnchor::Start => TimeWindow::new(clip_start, boundary.min(clip_end)),
        WindowAnchor::End => TimeWindow::new(boundary, clip_end),
    };

    window.is_valid().then_some(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clip(id: &str, duration_ms: u64) -> Clip {
        let mut clip = Clip::new(format!("/videos/{}.mp4", id), duration_ms);
        clip.id = id.to_string();
        clip
    }

    struct FakeAnalyzer {
        responses: BTreeMap<String, Value>,
        calls: AtomicUsize,
    }

    impl FakeAnalyzer {
        fn new(responses: BTreeMap<String, Value>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ContentAnalyzer for FakeAnalyzer {
        fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<Value, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(&request.clip.id)
                .cloned()
                .ok_or_else(|| AnalysisError::Service {
                    clip_id: request.clip.id.clone(),
                    message: "service unavailable".to_string(),
                })
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn normalize_full_response() {
        let c = clip("clip_001", 8000);
        let raw = json!({
            "scene_tags": ["city", "night"],
            "subjects": ["car"],
            "mood": "tense",
            "quality_score": 8,
            "ai_artifacts": {
                "dead_air": {"detected": true, "end_ms": 1200},
                "morphing": {"detected": true, "start_ms": 6800}
            },
            "segments": [
                {"start_ms": 1200, "end_ms": 3500, "action_type": "displacement"},
                {"start_ms": 3500, "end_ms": 5500, "action_type": "impact/highlight"}
            ]
        });

        let result = normalize(&c, &raw).unwrap();
        assert_eq!(result.tags, vec!["car", "city", "night"]);
        assert_eq!(result.mood, "tense");
        assert_eq!(result.quality_score, 8);
        assert_eq!(result.dead_air, Some(TimeWindow::new(0, 1200)));
        assert_eq!(result.morph, Some(TimeWindow::new(6800, 8000)));
        assert_eq!(result.action_hints.len(), 2);
        assert_eq!(result.action_hints[0].action, ActionClass::Motion);
        assert_eq!(result.action_hints[1].action, ActionClass::Impact);
    }

    #[test]
    fn normalize_degrades_missing_fields() {
        let c = clip("clip_002", 5000);
        let raw = json!({"quality_score": 99, "mood": 42});

        let result = normalize(&c, &raw).unwrap();
        assert_eq!(result.mood, "unknown");
        assert_eq!(result.quality_score, 10); // clamped
        assert!(result.tags.is_empty());
        assert!(result.dead_air.is_none());
        assert!(result.action_hints.is_empty());
    }

    #[test]
    fn normalize_rejects_non_object() {
        let c = clip("clip_003", 5000);
        let raw = json!("not an analysis");
        assert!(matches!(
            normalize(&c, &raw),
            Err(AnalysisError::Malformed { .. })
        ));
    }

    #[test]
    fn undetected_windows_are_dropped() {
        let c = clip("clip_004", 5000);
        let raw = json!({
            "ai_artifacts": {
                "dead_air": {"detected": false, "end_ms": 1200},
                "morphing": {"detected": true}
            }
        });
        let result = normalize(&c, &raw).unwrap();
        assert!(result.dead_air.is_none());
        assert!(result.morph.is_none());
    }

    #[test]
    fn retry_exhaustion_becomes_error() {
        let analyzer = Arc::new(FakeAnalyzer::new(BTreeMap::new()));
        let adapter = ContentAnalysisAdapter::new(analyzer.clone(), fast_retry(), 1);

        let result = adapter.analyze_clip(&clip("clip_x", 4000));
        assert!(result.is_err());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn batch_continues_past_failing_clip() {
        let mut responses = BTreeMap::new();
        for id in ["a", "b", "d", "e"] {
            responses.insert(id.to_string(), json!({"quality_score": 7}));
        }
        // "c" has no response: the analyzer errors on it every time.
        let analyzer = Arc::new(FakeAnalyzer::new(responses));
        let adapter = ContentAnalysisAdapter::new(analyzer, fast_retry(), 3);

        let clips: Vec<Clip> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| clip(id, 6000))
            .collect();

        let batch = adapter.analyze_batch(&clips, None);
        assert_eq!(batch.results.len(), 4);
        assert_eq!(batch.warnings.len(), 1);
        assert_eq!(batch.warnings[0].clip_id, "c");
    }
}
