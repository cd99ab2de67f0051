//! Sequential ingestion of configured datasets.

use chrono::{DateTime, Utc};

use crate::errors::PipelineError;
use crate::loader::BatchLoader;
use crate::naming;
use crate::pipeline::{DatasetDescriptor, Pipeline};
use crate::reject::RejectSink;
use crate::result::{DatasetLoad, DatasetOutcome, Failure, RunReport};

/// Ingest `datasets` one after another.
///
/// Each dataset is resolved, sourced, validated, loaded and has its rejects
/// persisted before the next starts. A failing dataset is recorded and the
/// run moves on. A fatal failure stops the run; the datasets not yet
/// attempted are listed as skipped.
#[must_use]
pub fn run_all(pipeline: &Pipeline, datasets: &[DatasetDescriptor]) -> RunReport {
    let started_at = Utc::now();
    let settings = pipeline.settings();
    let loader = BatchLoader::new(pipeline.destination(), settings.batch_size);
    let rejects = RejectSink::new(
        pipeline.artifacts(),
        &settings.rejects_container,
        naming::run_stamp(started_at),
    );

    drive(RunMode::Ingest, started_at, datasets, |dataset| {
        run_dataset(pipeline, &loader, &rejects, dataset)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    Ingest,
    DryRun,
}

impl RunMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::DryRun => "dry_run",
        }
    }
}

/// Apply `step` to each dataset in order, recording outcomes and stopping at
/// the first fatal failure.
pub(crate) fn drive<F>(
    mode: RunMode,
    started_at: DateTime<Utc>,
    datasets: &[DatasetDescriptor],
    mut step: F,
) -> RunReport
where
    F: FnMut(&DatasetDescriptor) -> Result<DatasetLoad, PipelineError>,
{
    tracing::info!(mode = mode.as_str(), datasets = datasets.len(), "Starting run");

    let mut report = RunReport {
        started_at,
        outcomes: Vec::with_capacity(datasets.len()),
        aborted: None,
        skipped: Vec::new(),
    };

    for (position, dataset) in datasets.iter().enumerate() {
        match step(dataset) {
            Ok(load) => {
                tracing::info!(
                    mode = mode.as_str(),
                    dataset = %dataset.name,
                    table = %dataset.table,
                    valid = load.summary.valid_count,
                    rejected = load.summary.rejected_count,
                    "Dataset processed"
                );
                report.outcomes.push(DatasetOutcome {
                    dataset: dataset.name.clone(),
                    table: dataset.table.clone(),
                    result: Ok(load),
                });
            }
            Err(err) => {
                let failure = Failure::from(&err);
                tracing::error!(
                    mode = mode.as_str(),
                    dataset = %dataset.name,
                    table = %dataset.table,
                    class = %failure.class,
                    error = %err,
                    "Dataset failed"
                );
                report.outcomes.push(DatasetOutcome {
                    dataset: dataset.name.clone(),
                    table: dataset.table.clone(),
                    result: Err(failure.clone()),
                });
                if failure.class.aborts_invocation() {
                    report.skipped = datasets[position + 1..]
                        .iter()
                        .map(|d| d.name.clone())
                        .collect();
                    report.aborted = Some(failure);
                    break;
                }
            }
        }
    }

    tracing::info!(
        mode = mode.as_str(),
        success = report.is_success(),
        valid = report.total_valid(),
        rejected = report.total_rejected(),
        "Run finished"
    );
    report
}

fn run_dataset(
    pipeline: &Pipeline,
    loader: &BatchLoader<'_>,
    rejects: &RejectSink<'_>,
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

    let outcome = loader.load(rows, schema, &dataset.table)?;
    let reject_artifact = rejects.persist(&dataset.name, &outcome.rejected)?;

    Ok(DatasetLoad {
        summary: outcome.summary,
        reject_artifact,
        valid_artifact: None,
    })
}
