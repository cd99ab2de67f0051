//! Table backup to, and restore from, columnar artifacts.

use chrono::Utc;
use loadstone_types::{BackupRecord, ValidRecord};

use crate::codec::{self, CodecError};
use crate::errors::PipelineError;
use crate::loader::BatchLoader;
use crate::naming;
use crate::pipeline::Pipeline;
use crate::result::{BackupReport, BackupSummary, Failure, RestoreSummary, TableBackup};

/// Snapshot `table` into `{table}_{stamp}.arrow` in the backups container.
///
/// # Errors
///
/// Fails for this table alone if it has no backup schema, can't be read,
/// or can't be encoded or uploaded.
pub fn backup_table(
    pipeline: &Pipeline,
    table: &str,
    stamp: &str,
) -> Result<BackupSummary, PipelineError> {
    let schema = pipeline.registry().backup_schema_for(table)?;
    let rows = pipeline
        .destination()
        .query_all(table, schema.fields())
        .map_err(|cause| PipelineError::Query {
            table: table.to_string(),
            cause,
        })?;

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            BackupRecord::from_row(schema, row).map_err(|cause| PipelineError::Encode {
                table: table.to_string(),
                cause: CodecError::Record { index, cause },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let bytes = codec::encode(table, schema, &records).map_err(|cause| PipelineError::Encode {
        table: table.to_string(),
        cause,
    })?;

    let container = &pipeline.settings().backups_container;
    let name = naming::backup_artifact_name(table, stamp);
    pipeline
        .artifacts()
        .put(container, &name, &bytes, true)
        .map_err(|cause| PipelineError::Artifact {
            container: container.clone(),
            name: name.clone(),
            cause,
        })?;

    tracing::info!(
        table,
        artifact = %name,
        rows = records.len(),
        bytes = bytes.len(),
        "Backed up table"
    );
    Ok(BackupSummary {
        artifact: name,
        rows: records.len() as u64,
    })
}

/// Back up every table with a registered backup schema, in name order.
///
/// A table failure is recorded and the next table proceeds, unless the
/// failure is fatal, in which case the remaining tables are skipped.
#[must_use]
pub fn backup_all(pipeline: &Pipeline) -> BackupReport {
    let started_at = Utc::now();
    let stamp = naming::run_stamp(started_at);
    let tables: Vec<String> = pipeline
        .registry()
        .backup_tables()
        .map(str::to_string)
        .collect();

    let mut report = BackupReport {
        started_at,
        tables: Vec::with_capacity(tables.len()),
        aborted: None,
        skipped: Vec::new(),
    };

    for (position, table) in tables.iter().enumerate() {
        match backup_table(pipeline, table, &stamp) {
            Ok(summary) => report.tables.push(TableBackup {
                table: table.clone(),
                result: Ok(summary),
            }),
            Err(err) => {
                let failure = Failure::from(&err);
                tracing::error!(
                    table = %table,
                    class = %failure.class,
                    error = %err,
                    "Table backup failed"
                );
                report.tables.push(TableBackup {
                    table: table.clone(),
                    result: Err(failure.clone()),
                });
                if failure.class.aborts_invocation() {
                    report.skipped = tables[position + 1..].to_vec();
                    report.aborted = Some(failure);
                    break;
                }
            }
        }
    }
    report
}

/// Full-replace `table` with the contents of backup `artifact`.
///
/// The artifact is fully decoded and checked against the registered backup
/// schema before the table is touched; a malformed or mismatched artifact
/// leaves the table as it was.
///
/// # Errors
///
/// Returns [`PipelineError::MissingBackupSchema`],
/// [`PipelineError::Artifact`], [`PipelineError::MalformedArtifact`] or
/// [`PipelineError::ArtifactMismatch`] before any write, or a load error
/// from the truncate-then-insert phase.
pub fn restore_table(
    pipeline: &Pipeline,
    table: &str,
    artifact: &str,
) -> Result<RestoreSummary, PipelineError> {
    let schema = pipeline.registry().backup_schema_for(table)?;
    let container = &pipeline.settings().backups_container;
    let bytes = pipeline
        .artifacts()
        .get(container, artifact)
        .map_err(|cause| PipelineError::Artifact {
            container: container.clone(),
            name: artifact.to_string(),
            cause,
        })?;

    let decoded = codec::decode(&bytes).map_err(|cause| PipelineError::MalformedArtifact {
        name: artifact.to_string(),
        cause,
    })?;

    let mismatch = |reason: String| PipelineError::ArtifactMismatch {
        name: artifact.to_string(),
        table: table.to_string(),
        reason,
    };
    if decoded.table != table {
        return Err(mismatch(format!(
            "artifact holds table '{}'",
            decoded.table
        )));
    }
    if decoded.schema != *schema {
        return Err(mismatch(format!(
            "embedded fields [{}] differ from registered fields [{}]",
            describe(&decoded.schema),
            describe(schema)
        )));
    }

    let rows = decoded
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_row(schema)
                .map(ValidRecord::new)
                .map_err(|cause| PipelineError::MalformedArtifact {
                    name: artifact.to_string(),
                    cause: CodecError::Record { index, cause },
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let loader = BatchLoader::new(pipeline.destination(), pipeline.settings().batch_size);
    let summary = loader.replace(table, schema, rows)?;

    tracing::info!(
        table,
        artifact,
        rows = summary.valid_count,
        batches = summary.batches,
        "Restored table"
    );
    Ok(RestoreSummary {
        table: table.to_string(),
        artifact: artifact.to_string(),
        rows: summary.valid_count,
        batches: summary.batches,
    })
}

fn describe(schema: &loadstone_types::BackupSchema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("{}:{}", f.name, f.field_type))
        .collect::<Vec<_>>()
        .join(", ")
}
