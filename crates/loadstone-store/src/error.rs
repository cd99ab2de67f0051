//! Store error types.

/// Errors produced by [`Destination`](crate::Destination) and
/// [`ArtifactStore`](crate::ArtifactStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or opened at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact '{container}/{name}' not found")]
    NotFound { container: String, name: String },

    #[error("artifact '{container}/{name}' already exists")]
    AlreadyExists { container: String, name: String },

    /// Table, column, container, or artifact name rejected before use.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A record's value count disagrees with the table's field list.
    #[error("record {index} has {found} values, table '{table}' has {expected} columns")]
    Arity {
        table: String,
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Internal mutex was poisoned by a panicked thread.
    #[error("destination lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` if the store as a whole is unreachable, as opposed to
    /// one operation failing.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::LockPoisoned)
    }

    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StoreError>;
