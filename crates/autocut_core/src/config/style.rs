//! Style constraint resolution.
//!
//! Merges built-in defaults, an optional named style profile (an externally
//! authored YAML document), and explicit overrides into one resolved,
//! read-only constraint set. Precedence is strict and field-by-field:
//! overrides > profile > defaults. A missing field in a higher-precedence
//! source never blanks a lower one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TransitionKind;

/// Errors raised during style resolution.
///
/// All of these are fatal and surface before any external call is made.
#[derive(Error, Debug)]
pub enum StyleError {
    #[error("Style profile '{name}' not found (searched {count} directories)", count = .searched.len())]
    ProfileNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Failed to read style profile {path}: {source}")]
    ProfileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse style profile {path}: {source}")]
    ProfileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid {field} range: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("platform.max_duration must be positive, got {0}")]
    NonPositivePlatformDuration(f64),
}

/// Per-segment duration bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipDurationRange {
    pub min_secs: f64,
    pub max_secs: f64,
    /// Average clip length; also the selection overshoot tolerance.
    pub avg_secs: f64,
}

impl Default for ClipDurationRange {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_CLIP_MIN_SECS,
            max_secs: DEFAULT_CLIP_MAX_SECS,
            avg_secs: DEFAULT_CLIP_AVG_SECS,
        }
    }
}

/// Speed-ramp policy bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRampRange {
    pub enabled: bool,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl SpeedRampRange {
    /// Clamp a detector suggestion to this range.
    ///
    /// With the ramp disabled every factor collapses to 1.0, regardless of
    /// the suggestion.
    pub fn clamp(&self, factor: f64) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        factor.clamp(self.min_factor, self.max_factor)
    }
}

impl Default for SpeedRampRange {
    fn default() -> Self {
        Self {
            enabled: true,
            min_factor: DEFAULT_SPEED_MIN,
            max_factor: DEFAULT_SPEED_MAX,
        }
    }
}

// Built-in defaults. Empirically chosen policy, not structural invariants;
// profiles and overrides may replace any of them.
pub const DEFAULT_CLIP_MIN_SECS: f64 = 1.5;
pub const DEFAULT_CLIP_MAX_SECS: f64 = 6.0;
pub const DEFAULT_CLIP_AVG_SECS: f64 = 3.0;
pub const DEFAULT_SPEED_MIN: f64 = 0.5;
pub const DEFAULT_SPEED_MAX: f64 = 2.0;
pub const DEFAULT_PLATFORM_MAX_SECS: f64 = 60.0;
pub const DEFAULT_MIN_QUALITY: u8 = 4;

/// Resolved, read-only constraint set for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConstraints {
    /// Display name of the style in force.
    pub style_name: String,
    /// Per-segment duration bounds.
    pub clip_duration: ClipDurationRange,
    /// Speed-ramp policy.
    pub speed_ramp: SpeedRampRange,
    /// Transition applied when no stronger hint exists.
    pub default_transition: TransitionKind,
    /// Platform ceiling on total output duration, seconds.
    pub platform_max_secs: f64,
    /// Clips scoring below this are excluded from selection.
    pub min_quality_score: u8,
}

impl Default for StyleConstraints {
    fn default() -> Self {
        Self {
            style_name: "default".to_string(),
            clip_duration: ClipDurationRange::default(),
            speed_ramp: SpeedRampRange::default(),
            default_transition: TransitionKind::Cut,
            platform_max_secs: DEFAULT_PLATFORM_MAX_SECS,
            min_quality_score: DEFAULT_MIN_QUALITY,
        }
    }
}

impl StyleConstraints {
    /// Validate range invariants.
    fn validate(&self) -> Result<(), StyleError> {
        if self.clip_duration.min_secs > self.clip_duration.max_secs {
            return Err(StyleError::InvertedRange {
                field: "clip_duration",
                min: self.clip_duration.min_secs,
                max: self.clip_duration.max_secs,
            });
        }
        if self.speed_ramp.min_factor > self.speed_ramp.max_factor {
            return Err(StyleError::InvertedRange {
                field: "speed_ramp",
                min: self.speed_ramp.min_factor,
                max: self.speed_ramp.max_factor,
            });
        }
        if self.platform_max_secs <= 0.0 {
            return Err(StyleError::NonPositivePlatformDuration(
                self.platform_max_secs,
            ));
        }
        Ok(())
    }
}

/// Explicit per-field overrides (highest precedence).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOverrides {
    pub clip_min_secs: Option<f64>,
    pub clip_max_secs: Option<f64>,
    pub clip_avg_secs: Option<f64>,
    pub speed_ramp_enabled: Option<bool>,
    pub speed_min_factor: Option<f64>,
    pub speed_max_factor: Option<f64>,
    pub default_transition: Option<TransitionKind>,
    pub platform_max_secs: Option<f64>,
    pub min_quality_score: Option<u8>,
}

// ---------------------------------------------------------------------------
// Profile document (YAML, externally authored)
// ---------------------------------------------------------------------------

/// A named style profile as authored on disk.
///
/// Every field is optional; unknown fields are ignored. The `speed_ramp`
/// technique accepts either a bare boolean or a `{enabled, min, max}` table,
/// since both forms appear in authored profiles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StyleProfile {
    pub meta: ProfileMeta,
    pub rhythm: ProfileRhythm,
    pub techniques: ProfileTechniques,
    pub transitions: ProfileTransitions,
    pub platform: ProfilePlatform,
    pub selection: ProfileSelection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileMeta {
    pub style_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileRhythm {
    pub clip_duration: ProfileClipDuration,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileClipDuration {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileTechniques {
    pub speed_ramp: Option<SpeedRampField>,
}

/// `techniques.speed_ramp` as either `true`/`false` or a full table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SpeedRampField {
    Flag(bool),
    Range {
        enabled: Option<bool>,
        min: Option<f64>,
        max: Option<f64>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileTransitions {
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePlatform {
    pub max_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileSelection {
    pub min_quality: Option<u8>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the constraint set for one invocation.
///
/// Applies profile fields over the defaults, then overrides over both, and
/// validates the result. No side effects beyond validation.
pub fn resolve(
    defaults: StyleConstraints,
    profile: Option<&StyleProfile>,
    overrides: &StyleOverrides,
) -> Result<StyleConstraints, StyleError> {
    let mut resolved = defaults;

    if let Some(profile) = profile {
        apply_profile(&mut resolved, profile);
    }
    apply_overrides(&mut resolved, overrides);

    resolved.validate()?;
    Ok(resolved)
}

fn apply_profile(constraints: &mut StyleConstraints, profile: &StyleProfile) {
    if let Some(name) = &profile.meta.style_name {
        constraints.style_name = name.clone();
    }

    let duration = &profile.rhythm.clip_duration;
    if let Some(min) = duration.min {
        constraints.clip_duration.min_secs = min;
    }
    if let Some(max) = duration.max {
        constraints.clip_duration.max_secs = max;
    }
    if let Some(avg) = duration.avg {
        constraints.clip_duration.avg_secs = avg;
    }

    match &profile.techniques.speed_ramp {
        Some(SpeedRampField::Flag(enabled)) => {
            constraints.speed_ramp.enabled = *enabled;
        }
        Some(SpeedRampField::Range { enabled, min, max }) => {
            if let Some(enabled) = enabled {
                constraints.speed_ramp.enabled = *enabled;
            }
            if let Some(min) = min {
                constraints.speed_ramp.min_factor = *min;
            }
            if let Some(max) = max {
                constraints.speed_ramp.max_factor = *max;
            }
        }
        None => {}
    }

    if let Some(transition) = &profile.transitions.default {
        constraints.default_transition = TransitionKind::from_name(transition);
    }

    if let Some(max_duration) = profile.platform.max_duration {
        constraints.platform_max_secs = max_duration;
    }

    if let Some(min_quality) = profile.selection.min_quality {
        constraints.min_quality_score = min_quality;
    }
}

fn apply_overrides(constraints: &mut StyleConstraints, overrides: &StyleOverrides) {
    if let Some(v) = overrides.clip_min_secs {
        constraints.clip_duration.min_secs = v;
    }
    if let Some(v) = overrides.clip_max_secs {
        constraints.clip_duration.max_secs = v;
    }
    if let Some(v) = overrides.clip_avg_secs {
        constraints.clip_duration.avg_secs = v;
    }
    if let Some(v) = overrides.speed_ramp_enabled {
        constraints.speed_ramp.enabled = v;
    }
    if let Some(v) = overrides.speed_min_factor {
        constraints.speed_ramp.min_factor = v;
    }
    if let Some(v) = overrides.speed_max_factor {
        constraints.speed_ramp.max_factor = v;
    }
    if let Some(v) = overrides.default_transition {
        constraints.default_transition = v;
    }
    if let Some(v) = overrides.platform_max_secs {
        constraints.platform_max_secs = v;
    }
    if let Some(v) = overrides.min_quality_score {
        constraints.min_quality_score = v;
    }
}

/// Load a style profile by literal path or by name.
///
/// A value ending in `.yaml`/`.yml` that exists is read directly; otherwise
/// `<name>.yaml` and `<name>.yml` are tried in each search directory in
/// order. A profile that cannot be located or parsed is an error, not a
/// silent fallback.
pub fn load_profile(
    name_or_path: &str,
    search_dirs: &[PathBuf],
) -> Result<StyleProfile, StyleError> {
    let direct = Path::new(name_or_path);
    if direct.exists()
        && matches!(
            direct.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
    {
        return read_profile(direct);
    }

    let stem = name_or_path
        .trim_end_matches(".yaml")
        .trim_end_matches(".yml");

    for dir in search_dirs {
        for suffix in ["yaml", "yml"] {
            let candidate = dir.join(format!("{}.{}", stem, suffix));
            if candidate.exists() {
                return read_profile(&candidate);
            }
        }
    }

    Err(StyleError::ProfileNotFound {
        name: name_or_path.to_string(),
        searched: search_dirs.to_vec(),
    })
}

fn read_profile(path: &Path) -> Result<StyleProfile, StyleError> {
    let content = fs::read_to_string(path).map_err(|source| StyleError::ProfileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let profile: StyleProfile =
        serde_yaml::from_str(&content).map_err(|source| StyleError::ProfileParse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Loaded style profile from {}", path.display());
    Ok(profile)
}
