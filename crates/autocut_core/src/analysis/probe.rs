//! Clip probing using ffprobe.
//!
//! Reads container duration and basic video stream properties to build the
//! immutable `Clip` record for a discovered file.

use std::path::Path;
use std::process::Command;
use std::time::UNIX_EPOCH;

use serde_json::Value;
use thiserror::Error;

use crate::models::Clip;

/// Errors raised while probing a clip.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Clip file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("Failed to run {tool}: {message}")]
    SpawnFailed { tool: String, message: String },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to parse probe output: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Probe output for {0} is missing a duration")]
    MissingDuration(std::path::PathBuf),
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Capability for probing clip files.
///
/// Injectable so discovery can be exercised in tests without ffprobe.
pub trait ClipProber: Send + Sync {
    fn probe(&self, path: &Path) -> ProbeResult<Clip>;
}

/// ffprobe-backed prober.
pub struct FfprobeProber {
    ffprobe: String,
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Use a specific ffprobe executable instead of the one on PATH.
    pub fn with_executable(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !path.is_empty() {
            self.ffprobe = path;
        }
        self
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipProber for FfprobeProber {
    fn probe(&self, path: &Path) -> ProbeResult<Clip> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        tracing::debug!("Probing clip: {}", path.display());

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ProbeError::SpawnFailed {
                tool: self.ffprobe.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                tool: self.ffprobe.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        parse_probe_json(&json, path)
    }
}

/// Parse the JSON output from ffprobe into a `Clip`.
fn parse_probe_json(json: &Value, path: &Path) -> ProbeResult<Clip> {
    let duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ProbeError::MissingDuration(path.to_path_buf()))?;

    let mut clip = Clip::new(path, (duration_secs * 1000.0).round() as u64);

    // First video stream carries fps and resolution
    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        if let Some(video) = streams
            .iter()
            .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"))
        {
            clip.width = video.get("width").and_then(|w| w.as_u64()).map(|w| w as u32);
            clip.height = video.get("height").and_then(|h| h.as_u64()).map(|h| h as u32);
            clip.fps = video
                .get("r_frame_rate")
                .and_then(|r| r.as_str())
                .and_then(parse_frame_rate);
        }
    }

    if let Ok(metadata) = std::fs::metadata(path) {
        clip.size_bytes = metadata.len();
        clip.modified_unix = metadata
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
    }

    Ok(clip)
}

/// Parse a frame rate string like "24000/1001" into a float.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let parts: Vec<&str> = rate.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
    }
    rate.parse().ok()
}
