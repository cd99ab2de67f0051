//! Core ingestion and backup engine for loadstone.
//!
//! Raw CSV rows flow through the row validator into either the batch
//! loader (valid records, truncate-then-bulk-insert) or the reject sink
//! (rejected records, CSV side artifact). Tables are backed up to and
//! restored from self-describing Arrow IPC artifacts.

pub mod backup;
pub mod codec;
pub mod config;
pub mod dry_run;
pub mod errors;
pub mod loader;
pub(crate) mod naming;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod reject;
pub mod result;
pub mod source;
pub mod validation;

// Re-export public API for convenience
pub use errors::PipelineError;
pub use dry_run::dry_run_all;
pub use orchestrator::run_all;
pub use pipeline::{DatasetDescriptor, Pipeline, PipelineSettings, TriggerResponse};
pub use registry::SchemaRegistry;
pub use result::{BackupReport, LoadSummary, RestoreSummary, RunReport};
