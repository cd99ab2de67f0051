pub mod backup;
pub mod backups;
pub mod datasets;
pub mod ingest;
pub mod restore;

use std::path::Path;

use anyhow::{Context, Result};
use loadstone_engine::config::{parse_pipeline, validate_pipeline, PipelineConfig};
use loadstone_engine::{Pipeline, TriggerResponse};

/// Parse and validate the pipeline YAML at `path`.
pub(crate) fn load_config(path: &Path) -> Result<PipelineConfig> {
    let config = parse_pipeline(path)
        .with_context(|| format!("Failed to parse pipeline: {}", path.display()))?;
    validate_pipeline(&config)?;
    Ok(config)
}

/// Parse, validate, and open every store the pipeline at `path` needs.
pub(crate) fn open_pipeline(path: &Path) -> Result<Pipeline> {
    let config = load_config(path)?;
    Pipeline::from_config(&config)
}

/// Run synchronous engine work off the async runtime.
pub(crate) async fn blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("{what} task panicked: {e}"))?
}

/// Print `response` and turn a failed trigger into a non-zero exit.
pub(crate) fn finish(response: &TriggerResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(response)?);
    } else {
        println!("{}", response.message);
    }
    if response.failed {
        anyhow::bail!("command failed");
    }
    Ok(())
}
