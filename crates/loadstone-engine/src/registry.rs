//! Dataset and backup schema lookup.

use std::collections::BTreeMap;

use loadstone_types::{BackupSchema, DatasetSchema};

use crate::errors::PipelineError;

/// Built-in schemas for the three standard datasets.
pub mod builtin {
    use loadstone_types::{DatasetSchema, FieldRule};

    #[must_use]
    pub fn hired_employees() -> DatasetSchema {
        DatasetSchema::new(vec![
            FieldRule::int("id"),
            FieldRule::text("name"),
            FieldRule::text("datetime"),
            FieldRule::int("department_id"),
            FieldRule::int("job_id"),
        ])
    }

    #[must_use]
    pub fn departments() -> DatasetSchema {
        DatasetSchema::new(vec![FieldRule::int("id"), FieldRule::text("department")])
    }

    #[must_use]
    pub fn jobs() -> DatasetSchema {
        DatasetSchema::new(vec![FieldRule::int("id"), FieldRule::text("job")])
    }

    /// `(dataset name, source file, schema)` in processing order.
    #[must_use]
    pub fn datasets() -> Vec<(&'static str, &'static str, DatasetSchema)> {
        vec![
            ("hired_employees", "hired_employees.csv", hired_employees()),
            ("departments", "departments.csv", departments()),
            ("jobs", "jobs.csv", jobs()),
        ]
    }
}

/// Maps dataset names to positional schemas and table names to backup schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    datasets: BTreeMap<String, DatasetSchema>,
    backups: BTreeMap<String, BackupSchema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in datasets, each also registered for backup
    /// under its own name.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, _, schema) in builtin::datasets() {
            registry.register_backup(name, schema.clone());
            registry.register_dataset(name, schema);
        }
        registry
    }

    pub fn register_dataset(&mut self, name: impl Into<String>, schema: DatasetSchema) {
        self.datasets.insert(name.into(), schema);
    }

    pub fn register_backup(&mut self, table: impl Into<String>, schema: BackupSchema) {
        self.backups.insert(table.into(), schema);
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownDataset`] if `name` is not registered.
    pub fn schema_for(&self, name: &str) -> Result<&DatasetSchema, PipelineError> {
        self.datasets
            .get(name)
            .ok_or_else(|| PipelineError::UnknownDataset(name.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::MissingBackupSchema`] if `table` has no
    /// declared backup schema.
    pub fn backup_schema_for(&self, table: &str) -> Result<&BackupSchema, PipelineError> {
        self.backups
            .get(table)
            .ok_or_else(|| PipelineError::MissingBackupSchema(table.to_string()))
    }

    /// Tables with a registered backup schema, sorted by name.
    pub fn backup_tables(&self) -> impl Iterator<Item = &str> {
        self.backups.keys().map(String::as_str)
    }
}
