//! Artifact store trait definition.

use crate::error::{self, StoreError};

/// Flat blob storage addressed by `(container, name)`.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn ArtifactStore>`.
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `name` in `container`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the artifact exists and
    /// `overwrite` is false, or another [`StoreError`] on storage failure.
    fn put(&self, container: &str, name: &str, bytes: &[u8], overwrite: bool) -> error::Result<()>;

    /// Fetch the bytes stored under `name` in `container`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such artifact exists.
    fn get(&self, container: &str, name: &str) -> error::Result<Vec<u8>>;

    /// List artifact names in `container`, sorted. A missing container is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn list(&self, container: &str) -> error::Result<Vec<String>>;
}

/// Reject names that could escape a flat namespace.
pub(crate) fn validate_flat_name(name: &str) -> error::Result<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_name(name, "must not be empty"));
    }
    if name.starts_with('.') {
        return Err(StoreError::invalid_name(name, "must not start with '.'"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(StoreError::invalid_name(name, "must not contain path separators"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn ArtifactStore) {}
    }

    #[test]
    fn flat_names() {
        assert!(validate_flat_name("jobs_20240101T000000Z.arrow").is_ok());
        assert!(validate_flat_name("").is_err());
        assert!(validate_flat_name("..").is_err());
        assert!(validate_flat_name("../etc/passwd").is_err());
        assert!(validate_flat_name("a\\b").is_err());
    }
}
