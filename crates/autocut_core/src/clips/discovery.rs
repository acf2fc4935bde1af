//! Clip discovery from the input directory.
//!
//! Scans a directory for video files and returns them in a deterministic
//! order. Discovery order is the tie-break used throughout selection, so it
//! must be stable across runs: case-sensitive sort by file name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Video file extensions considered during discovery (case-insensitive).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "m4v"];

/// Errors raised during clip discovery.
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Clip directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read clip directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No video files found in {0}")]
    NoVideoFiles(PathBuf),
}

/// Result type for discovery operations.
pub type ClipResult<T> = Result<T, ClipError>;

/// Scan a directory for video files, sorted by file name.
///
/// Subdirectories are not descended into; derived-artifact directories
/// living alongside the clips are therefore never picked up.
pub fn scan_video_files(dir: &Path) -> ClipResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ClipError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| ClipError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut videos: Vec<PathBuf> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let lower = e.to_lowercase();
                VIDEO_EXTENSIONS.contains(&lower.as_str())
            })
            .unwrap_or(false);
        if is_video {
            videos.push(path);
        }
    }

    if videos.is_empty() {
        return Err(ClipError::NoVideoFiles(dir.to_path_buf()));
    }

    videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    tracing::info!("Discovered {} video file(s) in {}", videos.len(), dir.display());

    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip_002.mp4"), b"x").unwrap();
        fs::write(dir.path().join("clip_001.MOV"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("clips.mp4.d")).unwrap();

        let videos = scan_video_files(dir.path()).unwrap();
        let names: Vec<String> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["clip_001.MOV", "clip_002.mp4"]);
    }

    #[test]
    fn scan_rejects_missing_directory() {
        let result = scan_video_files(Path::new("/nonexistent/clips"));
        assert!(matches!(result, Err(ClipError::DirectoryNotFound(_))));
    }

    #[test]
    fn scan_rejects_empty_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();

        let result = scan_video_files(dir.path());
        assert!(matches!(result, Err(ClipError::NoVideoFiles(_))));
    }
}
