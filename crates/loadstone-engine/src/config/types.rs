//! Pipeline YAML configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use loadstone_types::{DatasetSchema, FieldRule};
use serde::{Deserialize, Serialize};

use crate::loader::DEFAULT_BATCH_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: String,
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Explicit datasets. Empty means the built-in datasets.
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
    /// Table name to backup field list.
    #[serde(default)]
    pub backup_schemas: BTreeMap<String, Vec<FieldRule>>,
}

/// Where raw CSV files are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A local directory.
    Local { path: PathBuf },
    /// A container in the artifact store.
    Artifact { container: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// `SQLite` database file, created if missing.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    pub root: PathBuf,
    #[serde(default = "default_rejects_container")]
    pub rejects_container: String,
    #[serde(default = "default_backups_container")]
    pub backups_container: String,
    /// Receives valid partitions written by a dry run.
    #[serde(default = "default_validated_container")]
    pub validated_container: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Registry name; defaults to the table name.
    #[serde(default)]
    pub name: Option<String>,
    /// Source identifier (file name or artifact name).
    pub source: String,
    pub table: String,
    pub fields: Vec<FieldRule>,
}

impl DatasetConfig {
    #[must_use]
    pub fn dataset_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.table)
    }

    #[must_use]
    pub fn schema(&self) -> DatasetSchema {
        DatasetSchema::new(self.fields.clone())
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_rejects_container() -> String {
    "rejects".to_string()
}

fn default_backups_container() -> String {
    "backups".to_string()
}

fn default_validated_container() -> String {
    "validated".to_string()
}
