//! Content-addressed cache for derived per-clip artifacts.
//!
//! Analysis results and precision cuts are stored as JSON files named by
//! clip id plus the short content signature. A changed source file produces
//! a different signature, so stale artifacts never match; they are pruned
//! the next time a fresh artifact for the same clip is written.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clips::ClipSignature;
use crate::models::{AnalysisResult, PrecisionCut};

/// On-disk cache of derived artifacts under the analysis directory.
pub struct AnalysisCache {
    dir: PathBuf,
}

impl AnalysisCache {
    /// Open (and create) a cache rooted at the given directory.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a cached analysis result, if one matches the signature.
    pub fn load_analysis(&self, clip_id: &str, sig: &ClipSignature) -> Option<AnalysisResult> {
        self.load(&self.artifact_path(clip_id, sig, "analysis"))
    }

    /// Store an analysis result, pruning stale entries for the clip.
    pub fn store_analysis(
        &self,
        clip_id: &str,
        sig: &ClipSignature,
        result: &AnalysisResult,
    ) -> io::Result<()> {
        self.prune_stale(clip_id, sig, "analysis");
        self.store(&self.artifact_path(clip_id, sig, "analysis"), result)
    }

    /// Load cached precision cuts, if they match the signature.
    pub fn load_cuts(&self, clip_id: &str, sig: &ClipSignature) -> Option<PrecisionCut> {
        self.load(&self.artifact_path(clip_id, sig, "cuts"))
    }

    /// Store precision cuts, pruning stale entries for the clip.
    pub fn store_cuts(
        &self,
        clip_id: &str,
        sig: &ClipSignature,
        cuts: &PrecisionCut,
    ) -> io::Result<()> {
        self.prune_stale(clip_id, sig, "cuts");
        self.store(&self.artifact_path(clip_id, sig, "cuts"), cuts)
    }

    fn artifact_path(&self, clip_id: &str, sig: &ClipSignature, kind: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}.json", clip_id, sig.short(), kind))
    }

    fn load<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                // A corrupt artifact is a miss, not a failure.
                tracing::warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn store<T: Serialize>(&self, path: &Path, value: &T) -> io::Result<()> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Atomic write: temp file in the same directory, then rename.
        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)
    }

    /// Remove artifacts of the given kind for this clip that carry a
    /// different signature.
    fn prune_stale(&self, clip_id: &str, sig: &ClipSignature, kind: &str) {
        let keep = format!("{}.{}.{}.json", clip_id, sig.short(), kind);
        let prefix = format!("{}.", clip_id);
        let suffix = format!(".{}.json", kind);

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(&suffix) && name != keep {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clips::signature_for;
    use tempfile::tempdir;

    fn write_clip(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"footage").unwrap();
        path
    }

    #[test]
    fn round_trips_analysis_results() {
        let dir = tempdir().unwrap();
        let clip_path = write_clip(dir.path(), "clip_001.mp4");
        let sig = signature_for(&clip_path).unwrap();

        let cache = AnalysisCache::open(dir.path().join("cache")).unwrap();
        let result = AnalysisResult::empty("clip_001");

        assert!(cache.load_analysis("clip_001", &sig).is_none());
        cache.store_analysis("clip_001", &sig, &result).unwrap();
        assert_eq!(cache.load_analysis("clip_001", &sig), Some(result));
    }

    #[test]
    fn changed_signature_misses_and_prunes() {
        let dir = tempdir().unwrap();
        let clip_path = write_clip(dir.path(), "clip_001.mp4");
        let old_sig = signature_for(&clip_path).unwrap();

        let cache = AnalysisCache::open(dir.path().join("cache")).unwrap();
        cache
            .store_analysis("clip_001", &old_sig, &AnalysisResult::empty("clip_001"))
            .unwrap();

        // Grow the file so its signature changes
        let mut file = fs::OpenOptions::new().append(true).open(&clip_path).unwrap();
        file.write_all(b" extended").unwrap();
        drop(file);
        let new_sig = signature_for(&clip_path).unwrap();
        assert_ne!(old_sig, new_sig);

        // New signature is a miss
        assert!(cache.load_analysis("clip_001", &new_sig).is_none());

        // Writing under the new signature prunes the stale artifact
        cache
            .store_analysis("clip_001", &new_sig, &AnalysisResult::empty("clip_001"))
            .unwrap();
        assert!(cache.load_analysis("clip_001", &old_sig).is_none());
        assert!(cache.load_analysis("clip_001", &new_sig).is_some());
    }

    #[test]
    fn corrupt_artifact_is_a_miss() {
        let dir = tempdir().unwrap();
        let clip_path = write_clip(dir.path(), "clip_001.mp4");
        let sig = signature_for(&clip_path).unwrap();

        let cache = AnalysisCache::open(dir.path().join("cache")).unwrap();
        let artifact = cache.dir().join(format!("clip_001.{}.analysis.json", sig.short()));
        fs::write(&artifact, b"{ not json").unwrap();

        assert!(cache.load_analysis("clip_001", &sig).is_none());
    }
}
