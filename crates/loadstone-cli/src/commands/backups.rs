use std::path::PathBuf;

use anyhow::Result;

use super::{blocking, open_pipeline};

/// Execute the `backups` command: list backup artifacts by name.
pub async fn execute(config_path: PathBuf) -> Result<()> {
    let names = blocking("backups", move || {
        let pipeline = open_pipeline(&config_path)?;
        Ok(pipeline.list_backups()?)
    })
    .await?;

    if names.is_empty() {
        println!("No backups found.");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
