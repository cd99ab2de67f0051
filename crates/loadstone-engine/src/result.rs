//! Run, backup and restore result types.

use chrono::{DateTime, Utc};
use loadstone_types::ErrorClass;

use crate::errors::PipelineError;

/// Valid/rejected counts for one dataset load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub valid_count: u64,
    pub rejected_count: u64,
    /// Bulk inserts issued.
    pub batches: u64,
}

/// A classified failure, detached from its error chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub class: ErrorClass,
    pub message: String,
}

impl From<&PipelineError> for Failure {
    fn from(err: &PipelineError) -> Self {
        Self {
            class: err.class(),
            message: err.to_string(),
        }
    }
}

/// Successful load of one dataset.
#[derive(Debug, Clone)]
pub struct DatasetLoad {
    pub summary: LoadSummary,
    /// Name of the reject artifact, if any row was rejected.
    pub reject_artifact: Option<String>,
    /// Name of the valid-partition artifact. Only a dry run writes one.
    pub valid_artifact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub table: String,
    pub result: Result<DatasetLoad, Failure>,
}

/// Result of one ingestion run over all configured datasets.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<DatasetOutcome>,
    /// Set when a fatal failure stopped the run early.
    pub aborted: Option<Failure>,
    /// Datasets never attempted because the run was aborted.
    pub skipped: Vec<String>,
}

impl RunReport {
    /// `true` only if every dataset loaded and nothing was skipped.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
            && self.skipped.is_empty()
            && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Failure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|f| (o.dataset.as_str(), f)))
    }

    #[must_use]
    pub fn total_valid(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|l| l.summary.valid_count)
            .sum()
    }

    #[must_use]
    pub fn total_rejected(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|l| l.summary.rejected_count)
            .sum()
    }
}

/// One table written to a backup artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub artifact: String,
    pub rows: u64,
}

#[derive(Debug, Clone)]
pub struct TableBackup {
    pub table: String,
    pub result: Result<BackupSummary, Failure>,
}

/// Result of backing up every table with a backup schema.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub started_at: DateTime<Utc>,
    pub tables: Vec<TableBackup>,
    pub aborted: Option<Failure>,
    pub skipped: Vec<String>,
}

impl BackupReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
            && self.skipped.is_empty()
            && self.tables.iter().all(|t| t.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Failure)> {
        self.tables
            .iter()
            .filter_map(|t| t.result.as_ref().err().map(|f| (t.table.as_str(), f)))
    }
}

/// Result of restoring one table from one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub table: String,
    pub artifact: String,
    pub rows: u64,
    pub batches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(dataset: &str, result: Result<DatasetLoad, Failure>) -> DatasetOutcome {
        DatasetOutcome {
            dataset: dataset.into(),
            table: dataset.into(),
            result,
        }
    }

    fn loaded(valid: u64, rejected: u64) -> Result<DatasetLoad, Failure> {
        Ok(DatasetLoad {
            summary: LoadSummary {
                valid_count: valid,
                rejected_count: rejected,
                batches: 1,
            },
            reject_artifact: None,
            valid_artifact: None,
        })
    }

    #[test]
    fn report_fails_if_any_dataset_failed() {
        let failure = Failure::from(&PipelineError::UnknownDataset("jobs".into()));
        let report = RunReport {
            started_at: Utc::now(),
            outcomes: vec![outcome("departments", loaded(3, 0)), outcome("jobs", Err(failure))],
            aborted: None,
            skipped: vec![],
        };
        assert!(!report.is_success());
        let failed: Vec<&str> = report.failures().map(|(name, _)| name).collect();
        assert_eq!(failed, ["jobs"]);
        assert_eq!(report.total_valid(), 3);
    }

    #[test]
    fn report_totals_sum_loaded_datasets() {
        let report = RunReport {
            started_at: Utc::now(),
            outcomes: vec![
                outcome("departments", loaded(3, 1)),
                outcome("jobs", loaded(5, 2)),
            ],
            aborted: None,
            skipped: vec![],
        };
        assert!(report.is_success());
        assert_eq!(report.total_valid(), 8);
        assert_eq!(report.total_rejected(), 3);
    }

    #[test]
    fn skipped_tables_fail_backup_report() {
        let report = BackupReport {
            started_at: Utc::now(),
            tables: vec![],
            aborted: None,
            skipped: vec!["jobs".into()],
        };
        assert!(!report.is_success());
    }
}
