use std::path::PathBuf;

use anyhow::Result;
use loadstone_engine::{BackupReport, TriggerResponse};

use super::{blocking, finish, open_pipeline};

/// Execute the `backup` command: snapshot every table with a backup schema.
pub async fn execute(config_path: PathBuf, json: bool) -> Result<()> {
    let report =
        blocking("backup", move || Ok(open_pipeline(&config_path)?.backup_all())).await?;

    if !json {
        print_report(&report);
    }
    finish(&TriggerResponse::from(&report), json)
}

fn print_report(report: &BackupReport) {
    for table in &report.tables {
        match &table.result {
            Ok(summary) => println!(
                "{:<20} {:>8} rows  {}",
                table.table, summary.rows, summary.artifact
            ),
            Err(failure) => println!(
                "{:<20} FAILED ({}): {}",
                table.table, failure.class, failure.message
            ),
        }
    }
    for name in &report.skipped {
        println!("{name:<20} SKIPPED");
    }
}
