//! Failure classification shared by the engine and its reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Blast radius of a failure.
///
/// Determines whether the engine recovers locally, abandons one dataset
/// or table, or stops the whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// A single malformed row. Becomes a rejected record, never propagates.
    Row,
    /// A bulk insert of one flushed batch failed. Aborts the dataset.
    Batch,
    /// Source unreachable, schema missing, or truncate failed. Aborts the dataset.
    Dataset,
    /// Missing backup schema or malformed backup artifact. Aborts that table.
    Artifact,
    /// Destination or artifact store unavailable. Aborts the invocation.
    Fatal,
}

impl ErrorClass {
    /// Returns `true` if sibling datasets/tables must not be attempted.
    #[must_use]
    pub fn aborts_invocation(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Row => "row",
            Self::Batch => "batch",
            Self::Dataset => "dataset",
            Self::Artifact => "artifact",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fatal_aborts_invocation() {
        for class in [
            ErrorClass::Row,
            ErrorClass::Batch,
            ErrorClass::Dataset,
            ErrorClass::Artifact,
        ] {
            assert!(!class.aborts_invocation(), "{class}");
        }
        assert!(ErrorClass::Fatal.aborts_invocation());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&ErrorClass::Artifact).unwrap();
        assert_eq!(json, "\"artifact\"");
    }
}
