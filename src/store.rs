//! Artifact store: the output directory and everything written into it.

use crate::error::Result;
use crate::media::{validate_destination_name, MediaReference};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Manages the output directory for generated audio and video.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. Nothing is created on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `path` and its parents. Succeeds if it already exists.
    pub fn ensure_directory(path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    /// Create the output root.
    pub fn ensure_root(&self) -> Result<()> {
        Self::ensure_directory(&self.root)
    }

    /// Join the output root with a destination file name.
    ///
    /// Names containing separators or `..` are rejected.
    pub fn resolve_output_path(&self, name: &str) -> Result<PathBuf> {
        validate_destination_name(name)?;
        Ok(self.root.join(name))
    }

    /// Whether `path` lies inside the output root (lexically).
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Both local inputs exist and are non-empty.
    ///
    /// Remote references are not checked here; they are the remote backend's concern.
    pub fn inputs_exist(audio: &MediaReference, face: &MediaReference) -> bool {
        [audio, face].into_iter().all(|media| match media {
            MediaReference::Local(path) => is_non_empty_file(path),
            MediaReference::Remote(_) => true,
        })
    }

    /// Remove every entry directly under the output root.
    ///
    /// Entries that cannot be removed are logged and skipped. Returns the
    /// number of entries removed.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn clear_outputs(&self) -> usize {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!("Cannot read output directory: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let result = if is_dir {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };

            match result {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        removed
    }
}

/// A regular file with at least one byte.
pub(crate) fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, bytes: &[u8]) {
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_ensure_directory_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        ArtifactStore::ensure_directory(&nested).unwrap();
        ArtifactStore::ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_resolve_output_path() {
        let store = ArtifactStore::new("/srv/outputs");
        assert_eq!(
            store.resolve_output_path("out.mp4").unwrap(),
            PathBuf::from("/srv/outputs/out.mp4")
        );
        assert!(store.resolve_output_path("../out.mp4").is_err());
    }

    #[test]
    fn test_inputs_exist() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.wav");
        let face = dir.path().join("f.jpg");
        let empty = dir.path().join("empty.wav");
        write(&audio, &[0u8; 5 * 1024]);
        write(&face, b"jpeg");
        write(&empty, b"");

        let audio_ref = MediaReference::local(&audio);
        let face_ref = MediaReference::local(&face);

        assert!(ArtifactStore::inputs_exist(&audio_ref, &face_ref));
        assert!(!ArtifactStore::inputs_exist(
            &MediaReference::local(dir.path().join("missing.wav")),
            &face_ref
        ));
        assert!(!ArtifactStore::inputs_exist(
            &audio_ref,
            &MediaReference::local(dir.path().join("missing.jpg"))
        ));
        assert!(!ArtifactStore::inputs_exist(
            &MediaReference::local(&empty),
            &face_ref
        ));
        // A directory is not an input file.
        assert!(!ArtifactStore::inputs_exist(
            &MediaReference::local(dir.path()),
            &face_ref
        ));
    }

    #[test]
    fn test_clear_outputs_removes_files_and_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        write(&dir.path().join("old.mp4"), b"video");
        std::fs::create_dir_all(dir.path().join("frames").join("deep")).unwrap();
        write(&dir.path().join("frames").join("deep").join("0001.png"), b"png");

        assert_eq!(store.clear_outputs(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(dir.path().exists());
    }

    #[test]
    fn test_clear_outputs_twice_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert_eq!(store.clear_outputs(), 0);
        assert_eq!(store.clear_outputs(), 0);
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_clear_outputs_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("never-created"));
        assert_eq!(store.clear_outputs(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_outputs_skips_unremovable_entries() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        write(&dir.path().join("old.mp4"), b"video");
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        write(&locked.join("frame.png"), b"png");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind root.
        if std::fs::write(locked.join("root-check"), b"").is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let removed = store.clear_outputs();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("old.mp4").exists());
        assert!(locked.join("frame.png").exists());
    }
}

