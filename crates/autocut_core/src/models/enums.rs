//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Action classification for a span of footage.
///
/// Assigned by the precision cut detector from the analysis service's
/// action hints. Drives the speed policy and transition hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// Impact or highlight moment (explosion, collision, visual punch).
    Impact,
    /// Displacement, camera move, or scene transition.
    Motion,
    /// Expression close-up or character reaction.
    Emotion,
    /// Nothing notable; plays at normal speed.
    #[default]
    Neutral,
}

impl ActionClass {
    /// Parse a free-form hint string from the analysis service.
    ///
    /// Unrecognized values fall back to `Neutral` rather than failing,
    /// since hints are advisory.
    pub fn from_hint(hint: &str) -> Self {
        let lower = hint.to_lowercase();
        if lower.contains("impact") || lower.contains("highlight") {
            ActionClass::Impact
        } else if lower.contains("motion")
            || lower.contains("transition")
            || lower.contains("displacement")
        {
            ActionClass::Motion
        } else if lower.contains("emotion") || lower.contains("reaction") {
            ActionClass::Emotion
        } else {
            ActionClass::Neutral
        }
    }

    /// Transition this action suggests for the boundary to the next segment.
    ///
    /// Returns `None` when the class carries no opinion and the style
    /// default should be used.
    pub fn transition_hint(&self) -> Option<TransitionKind> {
        match self {
            // A motion/transition span already reads as movement, so a
            // dissolve into the next segment lands naturally.
            ActionClass::Motion => Some(TransitionKind::Dissolve),
            // Impact moments want the abruptness of a hard cut.
            ActionClass::Impact => Some(TransitionKind::Cut),
            ActionClass::Emotion | ActionClass::Neutral => None,
        }
    }
}

impl std::fmt::Display for ActionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionClass::Impact => write!(f, "impact"),
            ActionClass::Motion => write!(f, "motion"),
            ActionClass::Emotion => write!(f, "emotion"),
            ActionClass::Neutral => write!(f, "neutral"),
        }
    }
}

/// Transition applied between two consecutive segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Hard cut, no blending.
    #[default]
    Cut,
    /// Fade through black.
    Fade,
    /// Cross dissolve.
    Dissolve,
}

impl TransitionKind {
    /// Parse a transition name from a style profile.
    ///
    /// Unknown names fall back to `Cut` (profiles are externally authored
    /// and unknown values must not be fatal).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "fade" | "fade_in_out" => TransitionKind::Fade,
            "dissolve" | "cross_dissolve" | "crossfade" => TransitionKind::Dissolve,
            _ => TransitionKind::Cut,
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionKind::Cut => write!(f, "cut"),
            TransitionKind::Fade => write!(f, "fade"),
            TransitionKind::Dissolve => write!(f, "dissolve"),
        }
    }
}

/// Narrative role a segment plays in the assembled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipRole {
    /// First segment; must grab attention.
    Opener,
    /// Connective tissue between peaks.
    #[default]
    Buildup,
    /// High point of the sequence.
    Peak,
    /// Final segment.
    Closer,
}

impl std::fmt::Display for ClipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipRole::Opener => write!(f, "opener"),
            ClipRole::Buildup => write!(f, "buildup"),
            ClipRole::Peak => write!(f, "peak"),
            ClipRole::Closer => write!(f, "closer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_class_from_hint_matches_variants() {
        assert_eq!(ActionClass::from_hint("impact/highlight"), ActionClass::Impact);
        assert_eq!(ActionClass::from_hint("Displacement"), ActionClass::Motion);
        assert_eq!(ActionClass::from_hint("emotion/reaction"), ActionClass::Emotion);
        assert_eq!(ActionClass::from_hint("something else"), ActionClass::Neutral);
    }

    #[test]
    fn transition_parses_with_fallback() {
        assert_eq!(TransitionKind::from_name("fade"), TransitionKind::Fade);
        assert_eq!(TransitionKind::from_name("cross_dissolve"), TransitionKind::Dissolve);
        assert_eq!(TransitionKind::from_name("wipe-left"), TransitionKind::Cut);
    }

    #[test]
    fn action_class_serializes_snake_case() {
        let json = serde_json::to_string(&ActionClass::Impact).unwrap();
        assert_eq!(json, "\"impact\"");
    }
}
