//! Explicit pipeline context and trigger surface.
//!
//! A [`Pipeline`] owns every collaborator one invocation needs: schema
//! registry, dataset list, raw source, destination and artifact store.
//! Nothing is process-global; build one from configuration with
//! [`Pipeline::from_config`] or assemble it by hand with [`Pipeline::new`].

use std::sync::Arc;

use anyhow::{Context, Result};
use loadstone_store::{
    ArtifactStore, Destination, FsArtifactStore, SqliteDestination, StoreError,
};
use loadstone_types::{FieldRule, ValidRecord, Value};
use serde::Serialize;

use crate::backup;
use crate::config::types::{PipelineConfig, SourceConfig};
use crate::dry_run;
use crate::errors::PipelineError;
use crate::loader::DEFAULT_BATCH_SIZE;
use crate::orchestrator;
use crate::registry::{builtin, SchemaRegistry};
use crate::result::{BackupReport, Failure, RestoreSummary, RunReport};
use crate::source::{ArtifactCsvSource, LocalCsvSource, Source};

/// Success message of a fully successful ingestion.
pub const INGEST_SUCCESS_MESSAGE: &str = "Data uploaded and migrated successfully.";

/// Success message of a fully successful dry run.
pub const DRY_RUN_SUCCESS_MESSAGE: &str = "Data validated successfully.";

/// One dataset to ingest: registry name, source identifier, destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub name: String,
    pub source: String,
    pub table: String,
}

impl DatasetDescriptor {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            table: table.into(),
        }
    }

    /// The three built-in datasets, each loaded into a table of its own name.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        builtin::datasets()
            .into_iter()
            .map(|(name, file, _)| Self::new(name, file, name))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub rejects_container: String,
    pub backups_container: String,
    pub validated_container: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            rejects_container: "rejects".to_string(),
            backups_container: "backups".to_string(),
            validated_container: "validated".to_string(),
        }
    }
}

/// Outcome of one trigger, in the shape an external caller consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    pub message: String,
    pub failed: bool,
}

impl TriggerResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            failed: false,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            failed: true,
        }
    }
}

fn failure_message<'a>(
    what: &str,
    failures: impl Iterator<Item = (&'a str, &'a Failure)>,
    aborted: Option<&Failure>,
    skipped: &[String],
) -> String {
    let mut parts: Vec<String> = failures
        .map(|(name, failure)| format!("{name}: {}", failure.message))
        .collect();
    if let Some(cause) = aborted {
        parts.push(format!("aborted: {}", cause.message));
    }
    if !skipped.is_empty() {
        parts.push(format!("skipped: {}", skipped.join(", ")));
    }
    format!("{what} failed. {}", parts.join("; "))
}

impl TriggerResponse {
    fn from_run(report: &RunReport, what: &str, success: &str) -> Self {
        if report.is_success() {
            Self::ok(success)
        } else {
            Self::failed(failure_message(
                what,
                report.failures(),
                report.aborted.as_ref(),
                &report.skipped,
            ))
        }
    }

    /// Response for a dry run, which validates but loads nothing.
    #[must_use]
    pub fn from_dry_run(report: &RunReport) -> Self {
        Self::from_run(report, "Validation", DRY_RUN_SUCCESS_MESSAGE)
    }
}

impl From<&RunReport> for TriggerResponse {
    fn from(report: &RunReport) -> Self {
        Self::from_run(report, "Ingestion", INGEST_SUCCESS_MESSAGE)
    }
}

impl From<&BackupReport> for TriggerResponse {
    fn from(report: &BackupReport) -> Self {
        if report.is_success() {
            Self::ok(format!(
                "Backed up {} table(s) successfully.",
                report.tables.len()
            ))
        } else {
            Self::failed(failure_message(
                "Backup",
                report.failures(),
                report.aborted.as_ref(),
                &report.skipped,
            ))
        }
    }
}

impl From<&Result<RestoreSummary, PipelineError>> for TriggerResponse {
    fn from(result: &Result<RestoreSummary, PipelineError>) -> Self {
        match result {
            Ok(summary) => Self::ok(format!(
                "Restored {} row(s) into '{}' from '{}'.",
                summary.rows, summary.table, summary.artifact
            )),
            Err(err) => Self::failed(format!("Restore failed. {err}")),
        }
    }
}

/// Schema registry and dataset list declared by `config`.
///
/// With no `datasets` configured the built-in datasets and their backup
/// schemas are used. Otherwise only the configured datasets and the
/// explicit `backup_schemas` are registered.
#[must_use]
pub fn resolve_datasets(config: &PipelineConfig) -> (SchemaRegistry, Vec<DatasetDescriptor>) {
    if config.datasets.is_empty() {
        return (SchemaRegistry::builtin(), DatasetDescriptor::builtin());
    }
    let mut registry = SchemaRegistry::new();
    let mut datasets = Vec::with_capacity(config.datasets.len());
    for dataset in &config.datasets {
        let name = dataset.dataset_name();
        registry.register_dataset(name, dataset.schema());
        datasets.push(DatasetDescriptor::new(name, &dataset.source, &dataset.table));
    }
    for (table, fields) in &config.backup_schemas {
        registry.register_backup(table, fields.clone().into());
    }
    (registry, datasets)
}

/// Stands in for the destination of a dry run.
struct DetachedDestination;

impl DetachedDestination {
    fn refuse() -> StoreError {
        StoreError::Unavailable("destination is detached for a dry run".to_string())
    }
}

impl Destination for DetachedDestination {
    fn execute(&self, _sql: &str) -> Result<(), StoreError> {
        Err(Self::refuse())
    }

    fn truncate(&self, _table: &str) -> Result<(), StoreError> {
        Err(Self::refuse())
    }

    fn bulk_insert(
        &self,
        _table: &str,
        _fields: &[FieldRule],
        _records: &[ValidRecord],
    ) -> Result<u64, StoreError> {
        Err(Self::refuse())
    }

    fn query_all(&self, _table: &str, _fields: &[FieldRule]) -> Result<Vec<Vec<Value>>, StoreError> {
        Err(Self::refuse())
    }
}

/// Everything one ingestion, backup or restore invocation works against.
pub struct Pipeline {
    registry: SchemaRegistry,
    datasets: Vec<DatasetDescriptor>,
    source: Box<dyn Source>,
    destination: Arc<dyn Destination>,
    artifacts: Arc<dyn ArtifactStore>,
    settings: PipelineSettings,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        registry: SchemaRegistry,
        datasets: Vec<DatasetDescriptor>,
        source: Box<dyn Source>,
        destination: Arc<dyn Destination>,
        artifacts: Arc<dyn ArtifactStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            datasets,
            source,
            destination,
            artifacts,
            settings,
        }
    }

    /// Open the configured destination, artifact store and source, with
    /// datasets as resolved by [`resolve_datasets`].
    ///
    /// # Errors
    ///
    /// Returns an error if the destination database or artifact root cannot
    /// be opened.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let destination = SqliteDestination::open(&config.destination.path).with_context(|| {
            format!(
                "Failed to open destination database: {}",
                config.destination.path.display()
            )
        })?;
        Self::assemble(config, Arc::new(destination))
    }

    /// Like [`Pipeline::from_config`], but the destination database is never
    /// opened. Only [`Pipeline::dry_run`] is meaningful on the result; any
    /// load, backup or restore fails as destination-unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact root cannot be opened.
    pub fn for_dry_run(config: &PipelineConfig) -> Result<Self> {
        Self::assemble(config, Arc::new(DetachedDestination))
    }

    fn assemble(config: &PipelineConfig, destination: Arc<dyn Destination>) -> Result<Self> {
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(
            FsArtifactStore::open(&config.artifacts.root).with_context(|| {
                format!(
                    "Failed to open artifact store: {}",
                    config.artifacts.root.display()
                )
            })?,
        );

        let source: Box<dyn Source> = match &config.source {
            SourceConfig::Local { path } => Box::new(LocalCsvSource::new(path)),
            SourceConfig::Artifact { container } => Box::new(ArtifactCsvSource::new(
                Arc::clone(&artifacts),
                container.clone(),
            )),
        };

        let (registry, datasets) = resolve_datasets(config);

        tracing::debug!(
            datasets = datasets.len(),
            batch_size = config.batch_size,
            "Pipeline assembled from configuration"
        );

        Ok(Self::new(
            registry,
            datasets,
            source,
            destination,
            artifacts,
            PipelineSettings {
                batch_size: config.batch_size,
                rejects_container: config.artifacts.rejects_container.clone(),
                backups_container: config.artifacts.backups_container.clone(),
                validated_container: config.artifacts.validated_container.clone(),
            },
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub fn datasets(&self) -> &[DatasetDescriptor] {
        &self.datasets
    }

    #[must_use]
    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    #[must_use]
    pub fn destination(&self) -> &dyn Destination {
        self.destination.as_ref()
    }

    #[must_use]
    pub fn artifacts(&self) -> &dyn ArtifactStore {
        self.artifacts.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Ingest every configured dataset.
    #[must_use]
    pub fn run(&self) -> RunReport {
        orchestrator::run_all(self, &self.datasets)
    }

    /// Validate every configured dataset without touching the destination.
    #[must_use]
    pub fn dry_run(&self) -> RunReport {
        dry_run::dry_run_all(self, &self.datasets)
    }

    /// Back up every table with a registered backup schema.
    #[must_use]
    pub fn backup_all(&self) -> BackupReport {
        backup::backup_all(self)
    }

    /// Full-replace `table` with the contents of backup `artifact`.
    ///
    /// # Errors
    ///
    /// See [`backup::restore_table`].
    pub fn restore_table(
        &self,
        table: &str,
        artifact: &str,
    ) -> Result<RestoreSummary, PipelineError> {
        backup::restore_table(self, table, artifact)
    }

    /// Backup artifact names in the backups container, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Artifact`] if the container can't be listed.
    pub fn list_backups(&self) -> Result<Vec<String>, PipelineError> {
        let container = &self.settings.backups_container;
        self.artifacts
            .list(container)
            .map_err(|cause| PipelineError::Artifact {
                container: container.clone(),
                name: String::new(),
                cause,
            })
    }

    #[must_use]
    pub fn ingest(&self) -> TriggerResponse {
        TriggerResponse::from(&self.run())
    }

    #[must_use]
    pub fn validate(&self) -> TriggerResponse {
        TriggerResponse::from_dry_run(&self.dry_run())
    }

    #[must_use]
    pub fn backup(&self) -> TriggerResponse {
        TriggerResponse::from(&self.backup_all())
    }

    #[must_use]
    pub fn restore(&self, table: &str, artifact: &str) -> TriggerResponse {
        TriggerResponse::from(&self.restore_table(table, artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_pipeline_str;
    use crate::result::{DatasetLoad, DatasetOutcome, LoadSummary};
    use chrono::Utc;
    use loadstone_types::ErrorClass;

    #[test]
    fn builtin_descriptors_load_into_same_named_tables() {
        let datasets = DatasetDescriptor::builtin();
        assert_eq!(datasets.len(), 3);
        assert_eq!(
            datasets[0],
            DatasetDescriptor::new("hired_employees", "hired_employees.csv", "hired_employees")
        );
    }

    #[test]
    fn successful_run_maps_to_fixed_message() {
        let report = RunReport {
            started_at: Utc::now(),
            outcomes: vec![DatasetOutcome {
                dataset: "jobs".into(),
                table: "jobs".into(),
                result: Ok(DatasetLoad {
                    summary: LoadSummary::default(),
                    reject_artifact: None,
                    valid_artifact: None,
                }),
            }],
            aborted: None,
            skipped: vec![],
        };
        let response = TriggerResponse::from(&report);
        assert!(!response.failed);
        assert_eq!(response.message, INGEST_SUCCESS_MESSAGE);
    }

    #[test]
    fn failed_run_names_dataset_and_skipped() {
        let failure = Failure {
            class: ErrorClass::Fatal,
            message: "store unavailable: gone".into(),
        };
        let report = RunReport {
            started_at: Utc::now(),
            outcomes: vec![DatasetOutcome {
                dataset: "hired_employees".into(),
                table: "hired_employees".into(),
                result: Err(failure.clone()),
            }],
            aborted: Some(failure),
            skipped: vec!["departments".into(), "jobs".into()],
        };
        let response = TriggerResponse::from(&report);
        assert!(response.failed);
        assert!(response.message.contains("hired_employees: store unavailable"));
        assert!(response.message.contains("skipped: departments, jobs"));
    }

    #[test]
    fn from_config_uses_builtins_without_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
version: "1.0"
source:
  kind: local
  path: {root}/raw
destination:
  path: {root}/db/loadstone.db
artifacts:
  root: {root}/artifacts
"#,
            root = dir.path().display()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let pipeline = Pipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.datasets(), DatasetDescriptor::builtin());
        assert_eq!(pipeline.registry().backup_tables().count(), 3);
        assert_eq!(pipeline.settings(), &PipelineSettings::default());
    }

    #[test]
    fn from_config_registers_explicit_datasets_only() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
version: "1.0"
source:
  kind: artifact
  container: raw
destination:
  path: {root}/loadstone.db
artifacts:
  root: {root}/artifacts
  rejects_container: quarantine
batch_size: 250
datasets:
  - source: regions.csv
    table: regions
    fields:
      - {{ name: id, type: int }}
      - {{ name: region, type: text }}
"#,
            root = dir.path().display()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let pipeline = Pipeline::from_config(&config).unwrap();
        assert_eq!(
            pipeline.datasets(),
            [DatasetDescriptor::new("regions", "regions.csv", "regions")]
        );
        assert!(pipeline.registry().schema_for("regions").is_ok());
        assert!(pipeline.registry().backup_schema_for("regions").is_err());
        assert_eq!(pipeline.settings().batch_size, 250);
        assert_eq!(pipeline.settings().rejects_container, "quarantine");
    }

    #[test]
    fn dry_run_pipeline_never_opens_destination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join("jobs.csv"), "1,Recruiter\nx,Clerk\n").unwrap();
        let yaml = format!(
            r#"
version: "1.0"
source:
  kind: local
  path: {root}/data
destination:
  path: {root}/loadstone.db
artifacts:
  root: {root}/artifacts
datasets:
  - source: jobs.csv
    table: jobs
    fields:
      - {{ name: id, type: int }}
      - {{ name: job, type: text }}
"#,
            root = dir.path().display()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let pipeline = Pipeline::for_dry_run(&config).unwrap();

        let response = pipeline.validate();
        assert!(!response.failed, "{response:?}");
        assert_eq!(response.message, DRY_RUN_SUCCESS_MESSAGE);
        assert!(!dir.path().join("loadstone.db").exists());

        let err = pipeline.destination().truncate("jobs").unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn failed_dry_run_names_validation() {
        let failure = Failure {
            class: ErrorClass::Dataset,
            message: "source 'jobs.csv' could not be opened".into(),
        };
        let report = RunReport {
            started_at: Utc::now(),
            outcomes: vec![DatasetOutcome {
                dataset: "jobs".into(),
                table: "jobs".into(),
                result: Err(failure),
            }],
            aborted: None,
            skipped: vec![],
        };
        let response = TriggerResponse::from_dry_run(&report);
        assert!(response.failed);
        assert!(response.message.starts_with("Validation failed."), "{}", response.message);
    }
}
