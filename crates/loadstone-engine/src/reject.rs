//! Reject log persistence.

use chrono::SecondsFormat;
use csv::WriterBuilder;
use loadstone_store::ArtifactStore;
use loadstone_types::RejectedRecord;

use crate::errors::PipelineError;
use crate::naming;

/// Writes rejected rows of one run to the rejects container.
///
/// Each dataset gets one headerless CSV artifact: the original raw values,
/// then the error message, then the rejection time in RFC 3339. A rerun
/// within the same second overwrites the earlier artifact.
pub struct RejectSink<'a> {
    store: &'a dyn ArtifactStore,
    container: &'a str,
    stamp: String,
}

impl<'a> RejectSink<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ArtifactStore, container: &'a str, stamp: String) -> Self {
        Self {
            store,
            container,
            stamp,
        }
    }

    /// Persist `records` for `dataset`. Returns the artifact name, or `None`
    /// when there was nothing to write.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RejectLog`] if the CSV can't be built, or
    /// [`PipelineError::Artifact`] if the upload fails.
    pub fn persist(
        &self,
        dataset: &str,
        records: &[RejectedRecord],
    ) -> Result<Option<String>, PipelineError> {
        if records.is_empty() {
            return Ok(None);
        }

        let bytes = encode_rejects(records).map_err(|e| PipelineError::RejectLog {
            dataset: dataset.to_string(),
            reason: e.to_string(),
        })?;
        let name = naming::reject_artifact_name(dataset, &self.stamp);

        match self.store.put(self.container, &name, &bytes, true) {
            Ok(()) => {
                tracing::info!(
                    dataset,
                    artifact = %name,
                    rejected = records.len(),
                    "Persisted rejected rows"
                );
                Ok(Some(name))
            }
            Err(cause) => {
                tracing::error!(
                    dataset,
                    rejected = records.len(),
                    error = %cause,
                    "Failed to persist rejected rows"
                );
                Err(PipelineError::Artifact {
                    container: self.container.to_string(),
                    name,
                    cause,
                })
            }
        }
    }
}

fn encode_rejects(records: &[RejectedRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());
    for record in records {
        let timestamp = record
            .rejected_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        writer.write_record(
            record
                .raw
                .values
                .iter()
                .map(String::as_str)
                .chain([record.error_message.as_str(), timestamp.as_str()]),
        )?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
