use std::path::PathBuf;

use anyhow::Result;
use loadstone_engine::TriggerResponse;

use super::{blocking, finish, open_pipeline};

/// Execute the `restore` command: full-replace one table from one artifact.
pub async fn execute(
    config_path: PathBuf,
    table: String,
    artifact: String,
    json: bool,
) -> Result<()> {
    let result = blocking("restore", move || {
        let pipeline = open_pipeline(&config_path)?;
        Ok(pipeline.restore_table(&table, &artifact))
    })
    .await?;

    if let Err(err) = &result {
        tracing::error!(class = %err.class(), error = %err, "Restore failed");
    }
    finish(&TriggerResponse::from(&result), json)
}
