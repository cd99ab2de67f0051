//! Filesystem-backed implementation of [`ArtifactStore`].
//!
//! Each container is a subdirectory of the store root; each artifact is a
//! file inside it. Writes go to a hidden temporary file first and are
//! renamed into place, so readers never observe a partial artifact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::artifact::{validate_flat_name, ArtifactStore};
use crate::error::{self, StoreError};

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the root directory can't be created.
    pub fn open(root: impl Into<PathBuf>) -> error::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StoreError::Unavailable(format!("cannot create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> error::Result<PathBuf> {
        validate_flat_name(container)?;
        Ok(self.root.join(container))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, container: &str, name: &str, bytes: &[u8], overwrite: bool) -> error::Result<()> {
        validate_flat_name(name)?;
        let dir = self.container_dir(container)?;
        std::fs::create_dir_all(&dir)?;

        let target = dir.join(name);
        if !overwrite && target.exists() {
            return Err(StoreError::AlreadyExists {
                container: container.to_string(),
                name: name.to_string(),
            });
        }

        let partial = dir.join(format!(".{name}.partial"));
        std::fs::write(&partial, bytes)?;
        std::fs::rename(&partial, &target)?;
        tracing::debug!(container, name, bytes = bytes.len(), "Stored artifact");
        Ok(())
    }

    fn get(&self, container: &str, name: &str) -> error::Result<Vec<u8>> {
        validate_flat_name(name)?;
        let path = self.container_dir(container)?.join(name);
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            },
            _ => StoreError::Io(e),
        })
    }

    fn list(&self, container: &str) -> error::Result<Vec<String>> {
        let dir = self.container_dir(container)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::open(dir.path().join("artifacts")).unwrap();
        (dir, store)
    }

    #[test]
    fn put_then_get_roundtrip() {
        let (_dir, store) = store();
        store.put("rejects", "jobs.csv", b"1,x\n", false).unwrap();
        assert_eq!(store.get("rejects", "jobs.csv").unwrap(), b"1,x\n");
    }

    #[test]
    fn put_without_overwrite_refuses_existing() {
        let (_dir, store) = store();
        store.put("backups", "a.arrow", b"one", false).unwrap();
        let err = store.put("backups", "a.arrow", b"two", false).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.get("backups", "a.arrow").unwrap(), b"one");
    }

    #[test]
    fn put_with_overwrite_replaces() {
        let (_dir, store) = store();
        store.put("backups", "a.arrow", b"one", true).unwrap();
        store.put("backups", "a.arrow", b"two", true).unwrap();
        assert_eq!(store.get("backups", "a.arrow").unwrap(), b"two");
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.get("backups", "nope.arrow").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn list_is_sorted_and_skips_partials() {
        let (_dir, store) = store();
        assert!(store.list("backups").unwrap().is_empty());
        store.put("backups", "b.arrow", b"", true).unwrap();
        store.put("backups", "a.arrow", b"", true).unwrap();
        std::fs::write(store.root().join("backups/.c.arrow.partial"), b"").unwrap();
        assert_eq!(store.list("backups").unwrap(), ["a.arrow", "b.arrow"]);
    }

    #[test]
    fn traversal_is_rejected() {
        let (_dir, store) = store();
        let err = store.put("..", "x", b"", true).unwrap_err();
        assert!(matches!(err, StoreError::InvalidName { .. }));
    }
}
