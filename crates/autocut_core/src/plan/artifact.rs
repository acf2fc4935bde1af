//! Persisted edit-plan artifact.
//!
//! The saved plan is the contract between an analyze-only run and a later
//! execute-only run: loading it and rendering must behave exactly like
//! rendering the freshly built plan. Loaded plans are validated against the
//! current style constraints before use.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::StyleConstraints;
use crate::models::EditPlan;

/// Default artifact file name under the analysis directory.
pub const PLAN_FILE_NAME: &str = "edit_plan.json";

/// Errors raised while persisting or loading a plan artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Edit plan not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read edit plan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse edit plan {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Edit plan failed validation: {0}")]
    Invalid(String),
}

/// Result type for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Save a plan atomically (temp file, then rename).
pub fn save_plan(plan: &EditPlan, path: &Path) -> ArtifactResult<()> {
    let content = serde_json::to_string_pretty(plan).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)
    };

    write().map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a plan from disk.
pub fn load_plan(path: &Path) -> ArtifactResult<EditPlan> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate a loaded plan against the current style constraints.
///
/// Checks the structural invariants a freshly built plan always satisfies:
/// non-empty, well-formed spans, speed factors inside the active ramp range,
/// a self-consistent total, and a total under the platform ceiling (with the
/// one-average-clip overshoot tolerance selection allows).
pub fn validate_plan(plan: &EditPlan, constraints: &StyleConstraints) -> ArtifactResult<()> {
    if plan.segments.is_empty() {
        return Err(ArtifactError::Invalid("plan has no segments".to_string()));
    }

    for (i, segment) in plan.segments.iter().enumerate() {
        if segment.start_ms >= segment.end_ms {
            return Err(ArtifactError::Invalid(format!(
                "segment {} has inverted span {}..{}",
                i, segment.start_ms, segment.end_ms
            )));
        }

        let ramp = &constraints.speed_ramp;
        let in_range = if ramp.enabled {
            segment.speed_factor >= ramp.min_factor - 1e-9
                && segment.speed_factor <= ramp.max_factor + 1e-9
        } else {
            (segment.speed_factor - 1.0).abs() < 1e-9
        };
        if !in_range {
            return Err(ArtifactError::Invalid(format!(
                "segment {} speed factor {} outside the active speed-ramp range",
                i, segment.speed_factor
            )));
        }
    }

    let computed = plan.computed_output_ms();
    if computed != plan.total_output_ms {
        return Err(ArtifactError::Invalid(format!(
            "stored total {}ms does not match computed {}ms",
            plan.total_output_ms, computed
        )));
    }

    let ceiling_ms = (constraints.platform_max_secs * 1000.0).round() as u64
        + (constraints.clip_duration.avg_secs * 1000.0).round() as u64;
    if plan.total_output_ms > ceiling_ms && plan.segments.len() > 1 {
        return Err(ArtifactError::Invalid(format!(
            "total output {}ms exceeds the platform ceiling",
            plan.total_output_ms
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionClass, ClipRole, Segment, TransitionKind, PLAN_VERSION};
    use tempfile::tempdir;

    fn plan_with(segments: Vec<Segment>) -> EditPlan {
        let total = segments.iter().map(|s| s.output_duration_ms()).sum();
        EditPlan {
            version: PLAN_VERSION.to_string(),
            created_at: "2026-02-01T12:00:00+00:00".to_string(),
            style: "default".to_string(),
            target_duration_ms: Some(30_000),
            segments,
            excluded: Vec::new(),
            total_output_ms: total,
        }
    }

    fn segment(start: u64, end: u64, speed: f64) -> Segment {
        Segment {
            clip_id: "clip_001".to_string(),
            source: PathBuf::from("/videos/clip_001.mp4"),
            start_ms: start,
            end_ms: end,
            speed_factor: speed,
            action: ActionClass::Neutral,
            transition_to_next: TransitionKind::Cut,
            role: ClipRole::Opener,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis").join(PLAN_FILE_NAME);

        let plan = plan_with(vec![segment(500, 5_500, 1.5)]);
        save_plan(&plan, &path).unwrap();

        let loaded = load_plan(&path).unwrap();
        assert_eq!(loaded, plan);

        // Atomic write leaves no temp file behind
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_missing_plan_fails() {
        let result = load_plan(Path::new("/nonexistent/edit_plan.json"));
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn load_corrupt_plan_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PLAN_FILE_NAME);
        fs::write(&path, b"{ truncated").unwrap();

        let result = load_plan(&path);
        assert!(matches!(result, Err(ArtifactError::Parse { .. })));
    }

    #[test]
    fn validate_accepts_well_formed_plan() {
        let plan = plan_with(vec![segment(0, 4_000, 1.0), segment(4_000, 8_000, 2.0)]);
        assert!(validate_plan(&plan, &StyleConstraints::default()).is_ok());
    }

    #[test]
    fn validate_rejects_empty_plan() {
        let plan = plan_with(Vec::new());
        let err = validate_plan(&plan, &StyleConstraints::default()).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid(_)));
    }

    #[test]
    fn validate_rejects_out_of_range_speed() {
        let plan = plan_with(vec![segment(0, 4_000, 4.0)]);
        let err = validate_plan(&plan, &StyleConstraints::default()).unwrap_err();
        assert!(err.to_string().contains("speed factor"));
    }

    #[test]
    fn validate_enforces_unity_when_ramp_disabled() {
        let mut constraints = StyleConstraints::default();
        constraints.speed_ramp.enabled = false;

        let plan = plan_with(vec![segment(0, 4_000, 1.5)]);
        assert!(validate_plan(&plan, &constraints).is_err());

        let plain = plan_with(vec![segment(0, 4_000, 1.0)]);
        assert!(validate_plan(&plain, &constraints).is_ok());
    }

    #[test]
    fn validate_rejects_inconsistent_total() {
        let mut plan = plan_with(vec![segment(0, 4_000, 1.0)]);
        plan.total_output_ms += 777;
        let err = validate_plan(&plan, &StyleConstraints::default()).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
