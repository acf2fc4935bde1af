//! Source clip identity and media metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A source clip discovered in the input directory.
///
/// Immutable once discovered. Identity is the file stem; derived artifacts
/// (analysis results, precision cuts) are keyed by it together with the
/// content signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Stable identifier (file stem).
    pub id: String,
    /// Absolute or directory-relative source path.
    pub path: PathBuf,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Frame rate, if the container reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Pixel width of the video stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height of the video stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// File size in bytes at discovery time.
    pub size_bytes: u64,
    /// Modification time (unix seconds) at discovery time.
    pub modified_unix: i64,
}

impl Clip {
    /// Create a clip with the given identity and duration.
    ///
    /// Media properties default to unknown; probing fills them in.
    pub fn new(path: impl Into<PathBuf>, duration_ms: u64) -> Self {
        let path = path.into();
        let id = clip_id_for(&path);
        Self {
            id,
            path,
            duration_ms,
            fps: None,
            width: None,
            height: None,
            size_bytes: 0,
            modified_unix: 0,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// File name for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Derive the clip identifier from a source path.
pub fn clip_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_id_is_file_stem() {
        let clip = Clip::new("/videos/clip_001.mp4", 8000);
        assert_eq!(clip.id, "clip_001");
        assert_eq!(clip.file_name(), "clip_001.mp4");
    }

    #[test]
    fn duration_converts_to_seconds() {
        let clip = Clip::new("/videos/a.mp4", 6500);
        assert!((clip.duration_secs() - 6.5).abs() < f64::EPSILON);
    }
}
