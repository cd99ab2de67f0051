//! Pipeline error model and failure classification.

use loadstone_store::StoreError;
use loadstone_types::ErrorClass;

use crate::codec::CodecError;
use crate::source::SourceError;

/// Failure of one dataset load, table backup, or table restore.
///
/// Row-level problems never appear here; they become rejected records.
/// Use [`PipelineError::class`] to decide whether siblings may still run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("no backup schema registered for table '{0}'")]
    MissingBackupSchema(String),

    #[error("source '{name}' could not be opened: {cause}")]
    SourceOpen {
        name: String,
        #[source]
        cause: SourceError,
    },

    #[error("source for table '{table}' failed mid-stream: {cause}")]
    SourceRead {
        table: String,
        #[source]
        cause: SourceError,
    },

    #[error("table '{table}' could not be created: {cause}")]
    Prepare {
        table: String,
        #[source]
        cause: StoreError,
    },

    #[error("truncate of table '{table}' failed: {cause}")]
    Truncate {
        table: String,
        #[source]
        cause: StoreError,
    },

    #[error("bulk insert into '{table}' failed at batch {batch} ({rows} rows): {cause}")]
    BatchInsert {
        table: String,
        batch: u64,
        rows: usize,
        #[source]
        cause: StoreError,
    },

    #[error("reading table '{table}' failed: {cause}")]
    Query {
        table: String,
        #[source]
        cause: StoreError,
    },

    #[error("artifact '{container}/{name}' could not be accessed: {cause}")]
    Artifact {
        container: String,
        name: String,
        #[source]
        cause: StoreError,
    },

    #[error("backup of table '{table}' could not be encoded: {cause}")]
    Encode {
        table: String,
        #[source]
        cause: CodecError,
    },

    #[error("backup artifact '{name}' is malformed: {cause}")]
    MalformedArtifact {
        name: String,
        #[source]
        cause: CodecError,
    },

    #[error("backup artifact '{name}' does not match table '{table}': {reason}")]
    ArtifactMismatch {
        name: String,
        table: String,
        reason: String,
    },

    #[error("reject log for dataset '{dataset}' could not be written: {reason}")]
    RejectLog { dataset: String, reason: String },

    #[error("valid rows of dataset '{dataset}' could not be written: {reason}")]
    ValidLog { dataset: String, reason: String },
}

impl PipelineError {
    /// Blast radius of this failure.
    ///
    /// Any store reporting itself unreachable escalates to
    /// [`ErrorClass::Fatal`], whatever operation hit it.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if self.store_unavailable() {
            return ErrorClass::Fatal;
        }
        match self {
            Self::UnknownDataset(_)
            | Self::SourceOpen { .. }
            | Self::SourceRead { .. }
            | Self::Prepare { .. }
            | Self::Truncate { .. }
            | Self::Query { .. } => ErrorClass::Dataset,
            Self::BatchInsert { .. } => ErrorClass::Batch,
            Self::MissingBackupSchema(_)
            | Self::Artifact { .. }
            | Self::Encode { .. }
            | Self::MalformedArtifact { .. }
            | Self::ArtifactMismatch { .. }
            | Self::RejectLog { .. }
            | Self::ValidLog { .. } => ErrorClass::Artifact,
        }
    }

    fn store_unavailable(&self) -> bool {
        match self {
            Self::Prepare { cause, .. }
            | Self::Truncate { cause, .. }
            | Self::BatchInsert { cause, .. }
            | Self::Query { cause, .. }
            | Self::Artifact { cause, .. } => cause.is_unavailable(),
            Self::SourceOpen { cause, .. } | Self::SourceRead { cause, .. } => {
                cause.is_unavailable()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_failure() -> StoreError {
        StoreError::InvalidName {
            name: "x".into(),
            reason: "test".into(),
        }
    }

    #[test]
    fn batch_insert_is_batch_class() {
        let err = PipelineError::BatchInsert {
            table: "jobs".into(),
            batch: 2,
            rows: 1000,
            cause: store_failure(),
        };
        assert_eq!(err.class(), ErrorClass::Batch);
        let msg = err.to_string();
        assert!(msg.contains("'jobs'"), "got: {msg}");
        assert!(msg.contains("batch 2"), "got: {msg}");
    }

    #[test]
    fn truncate_failure_is_dataset_class() {
        let err = PipelineError::Truncate {
            table: "jobs".into(),
            cause: store_failure(),
        };
        assert_eq!(err.class(), ErrorClass::Dataset);
    }

    #[test]
    fn unavailable_store_escalates_to_fatal() {
        let err = PipelineError::Truncate {
            table: "jobs".into(),
            cause: StoreError::Unavailable("connection refused".into()),
        };
        assert_eq!(err.class(), ErrorClass::Fatal);

        let err = PipelineError::Artifact {
            container: "rejects".into(),
            name: "jobs.csv".into(),
            cause: StoreError::Unavailable("disk gone".into()),
        };
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn missing_backup_schema_is_artifact_class() {
        let err = PipelineError::MissingBackupSchema("audit".into());
        assert_eq!(err.class(), ErrorClass::Artifact);
        assert_eq!(
            err.to_string(),
            "no backup schema registered for table 'audit'"
        );
    }

    #[test]
    fn wrapped_store_error_is_reported_in_display() {
        let err = PipelineError::Query {
            table: "jobs".into(),
            cause: store_failure(),
        };
        assert!(err.to_string().contains("invalid name 'x'"));
    }
}
