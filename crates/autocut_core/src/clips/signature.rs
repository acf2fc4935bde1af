//! Content signatures for cache invalidation.
//!
//! Derived artifacts (analysis results, precision cuts) are keyed by a hash
//! of the source clip's (path, size, mtime). When the file changes, the
//! signature changes, and the stale artifacts simply stop matching - there
//! is never an in-place update to go wrong.

use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

/// Content signature of a source clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSignature {
    hash: String,
}

impl ClipSignature {
    /// Full hex digest.
    pub fn hex(&self) -> &str {
        &self.hash
    }

    /// Short form used in cache file names.
    pub fn short(&self) -> &str {
        &self.hash[..12]
    }
}

/// Compute the signature for a clip file from its filesystem metadata.
pub fn signature_for(path: &Path) -> io::Result<ClipSignature> {
    let metadata = fs::metadata(path)?;
    let size = metadata.len();
    let mtime = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(b"|");
    hasher.update(size.to_le_bytes());
    hasher.update(b"|");
    hasher.update(mtime.to_le_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Ok(ClipSignature { hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn signature_is_stable_for_unchanged_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"footage").unwrap();

        let first = signature_for(&path).unwrap();
        let second = signature_for(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.short().len(), 12);
    }

    #[test]
    fn signature_changes_when_content_grows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"footage").unwrap();
        let before = signature_for(&path).unwrap();

        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b" and more footage").unwrap();
        drop(file);

        let after = signature_for(&path).unwrap();
        assert_ne!(before, after);
    }
}
