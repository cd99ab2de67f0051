use std::path::PathBuf;

use anyhow::Result;
use loadstone_engine::{Pipeline, RunReport, TriggerResponse};

use super::{blocking, finish, load_config, open_pipeline};

/// Execute the `ingest` command: validate and full-replace load every dataset.
/// With `dry_run`, validate only and write the partitions as artifacts.
pub async fn execute(config_path: PathBuf, dry_run: bool, json: bool) -> Result<()> {
    let report = blocking("ingest", move || {
        if dry_run {
            let config = load_config(&config_path)?;
            Ok(Pipeline::for_dry_run(&config)?.dry_run())
        } else {
            Ok(open_pipeline(&config_path)?.run())
        }
    })
    .await?;

    if !json {
        print_report(&report, dry_run);
    }
    let response = if dry_run {
        TriggerResponse::from_dry_run(&report)
    } else {
        TriggerResponse::from(&report)
    };
    finish(&response, json)
}

fn print_report(report: &RunReport, dry_run: bool) {
    let last = if dry_run { "VALID / REJECTS" } else { "REJECTS" };
    println!(
        "{:<20} {:<20} {:>8} {:>9} {:>8}  {last}",
        "DATASET", "TABLE", "VALID", "REJECTED", "BATCHES"
    );
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(load) => {
                let rejects = load.reject_artifact.as_deref().unwrap_or("-");
                let artifacts = match &load.valid_artifact {
                    Some(valid) => format!("{valid} / {rejects}"),
                    None => rejects.to_string(),
                };
                println!(
                    "{:<20} {:<20} {:>8} {:>9} {:>8}  {artifacts}",
                    outcome.dataset,
                    outcome.table,
                    load.summary.valid_count,
                    load.summary.rejected_count,
                    load.summary.batches,
                );
            }
            Err(failure) => println!(
                "{:<20} {:<20} FAILED ({}): {}",
                outcome.dataset, outcome.table, failure.class, failure.message
            ),
        }
    }
    for name in &report.skipped {
        println!("{name:<20} {:<20} SKIPPED", "-");
    }
}
