//! Validation without a destination.
//!
//! A dry run reads and validates every dataset the way an ingestion run
//! does, but never touches the destination. Instead of loading the table it
//! writes the valid partition as a headerless CSV of coerced values to the
//! validated container, and persists rejects exactly as ingestion would.

use chrono::Utc;
use csv::WriterBuilder;
use loadstone_types::ValidRecord;

use crate::errors::PipelineError;
use crate::naming;
use crate::orchestrator::{self, RunMode};
use crate::pipeline::{DatasetDescriptor, Pipeline};
use crate::reject::RejectSink;
use crate::result::{DatasetLoad, LoadSummary, RunReport};
use crate::validation;

/// Validate `datasets` one after another without loading any of them.
///
/// Failure isolation matches [`orchestrator::run_all`]: a failing dataset is
/// recorded and the next proceeds; a fatal failure skips the rest.
#[must_use]
pub fn dry_run_all(pipeline: &Pipeline, datasets: &[DatasetDescriptor]) -> RunReport {
    let started_at = Utc::now();
    let stamp = naming::run_stamp(started_at);
    let settings = pipeline.settings();
    let rejects = RejectSink::new(
        pipeline.artifacts(),
        &settings.rejects_container,
        stamp.clone(),
    );

    orchestrator::drive(RunMode::DryRun, started_at, datasets, |dataset| {
        dry_run_dataset(pipeline, &rejects, &stamp, dataset)
    })
}

fn dry_run_dataset(
    pipeline: &Pipeline,
    rejects: &RejectSink<'_>,
    stamp: &str,
    dataset: &DatasetDescriptor,
) -> Result<DatasetLoad, PipelineError> {
    let schema = pipeline.registry().schema_for(&dataset.name)?;
    let rows = pipeline
        .source()
        .open(&dataset.source)
        .map_err(|cause| PipelineError::SourceOpen {
            name: dataset.source.clone(),
            cause,
        })?;

    let mut valid = valid_writer();
    let mut summary = LoadSummary::default();
    let mut rejected = Vec::new();
    for row in rows {
        let raw = row.map_err(|cause| PipelineError::SourceRead {
            table: dataset.table.clone(),
            cause,
        })?;
        match validation::validate(raw, schema) {
            Ok(record) => {
                write_valid(&mut valid, &record).map_err(|e| valid_log_error(dataset, &e))?;
                summary.valid_count += 1;
            }
            Err(rejection) => {
                summary.rejected_count += 1;
                rejected.push(rejection);
            }
        }
    }

    let bytes = valid
        .into_inner()
        .map_err(|e| valid_log_error(dataset, &e.into_error()))?;
    let container = &pipeline.settings().validated_container;
    let name = naming::valid_artifact_name(&dataset.name, stamp);
    pipeline
        .artifacts()
        .put(container, &name, &bytes, true)
        .map_err(|cause| PipelineError::Artifact {
            container: container.clone(),
            name: name.clone(),
            cause,
        })?;
    tracing::info!(
        dataset = %dataset.name,
        artifact = %name,
        valid = summary.valid_count,
        "Persisted valid rows"
    );

    let reject_artifact = rejects.persist(&dataset.name, &rejected)?;
    Ok(DatasetLoad {
        summary,
        reject_artifact,
        valid_artifact: Some(name),
    })
}

fn valid_writer() -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

fn write_valid(writer: &mut csv::Writer<Vec<u8>>, record: &ValidRecord) -> csv::Result<()> {
    writer.write_record(record.values().iter().map(ToString::to_string))
}

fn valid_log_error(dataset: &DatasetDescriptor, err: &dyn std::fmt::Display) -> PipelineError {
    PipelineError::ValidLog {
        dataset: dataset.name.clone(),
        reason: err.to_string(),
    }
}
