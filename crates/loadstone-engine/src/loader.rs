//! Truncate-then-bulk-load of validated records into a destination table.
//!
//! Every load is a full replace: the destination table is emptied in its
//! own committed transaction before the first insert, destroying whatever
//! it held. Records are then inserted in fixed-size batches, each batch in
//! one all-or-nothing bulk insert, in source order.

use loadstone_store::Destination;
use loadstone_types::{DatasetSchema, RawRow, RejectedRecord, ValidRecord};

use crate::errors::PipelineError;
use crate::result::LoadSummary;
use crate::source::SourceError;
use crate::validation;

/// Rows per bulk insert unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Bounded, ordered buffer of records awaiting one bulk insert.
#[derive(Debug)]
pub struct BatchBuffer {
    records: Vec<ValidRecord>,
    capacity: usize,
}

impl BatchBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record. Returns `true` once the buffer is full.
    pub fn push(&mut self, record: ValidRecord) -> bool {
        self.records.push(record);
        self.is_full()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[ValidRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Valid/rejected split of one dataset load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub summary: LoadSummary,
    pub rejected: Vec<RejectedRecord>,
}

/// Drives validation and batched inserts for one table at a time.
pub struct BatchLoader<'a> {
    destination: &'a dyn Destination,
    batch_size: usize,
}

impl<'a> BatchLoader<'a> {
    #[must_use]
    pub fn new(destination: &'a dyn Destination, batch_size: usize) -> Self {
        Self {
            destination,
            batch_size: batch_size.max(1),
        }
    }

    /// Validate `rows` against `schema` and full-replace `table` with the
    /// valid ones. Rejected rows are returned, never inserted.
    ///
    /// # Errors
    ///
    /// Fails before any row is read if the table can't be created or
    /// truncated. Fails mid-load on a source read error or a failed batch;
    /// batches already inserted stay committed.
    pub fn load<I>(
        &self,
        rows: I,
        schema: &DatasetSchema,
        table: &str,
    ) -> Result<LoadOutcome, PipelineError>
    where
        I: IntoIterator<Item = Result<RawRow, SourceError>>,
    {
        self.prepare(table, schema)?;

        let mut buffer = BatchBuffer::new(self.batch_size);
        let mut summary = LoadSummary::default();
        let mut rejected = Vec::new();

        for row in rows {
            let raw = row.map_err(|cause| PipelineError::SourceRead {
                table: table.to_string(),
                cause,
            })?;
            match validation::validate(raw, schema) {
                Ok(record) => {
                    summary.valid_count += 1;
                    if buffer.push(record) {
                        self.flush(table, schema, &mut buffer, &mut summary)?;
                    }
                }
                Err(rejection) => {
                    tracing::debug!(
                        table,
                        line = rejection.raw.line,
                        reason = %rejection.error_message,
                        "Rejected row"
                    );
                    summary.rejected_count += 1;
                    rejected.push(rejection);
                }
            }
        }
        self.flush(table, schema, &mut buffer, &mut summary)?;

        tracing::info!(
            table,
            valid = summary.valid_count,
            rejected = summary.rejected_count,
            batches = summary.batches,
            "Table loaded"
        );
        Ok(LoadOutcome { summary, rejected })
    }

    /// Full-replace `table` with already-typed `records`, skipping validation.
    ///
    /// # Errors
    ///
    /// Same failure points as [`BatchLoader::load`], minus source errors.
    pub fn replace<I>(
        &self,
        table: &str,
        schema: &DatasetSchema,
        records: I,
    ) -> Result<LoadSummary, PipelineError>
    where
        I: IntoIterator<Item = ValidRecord>,
    {
        self.prepare(table, schema)?;

        let mut buffer = BatchBuffer::new(self.batch_size);
        let mut summary = LoadSummary::default();
        for record in records {
            summary.valid_count += 1;
            if buffer.push(record) {
                self.flush(table, schema, &mut buffer, &mut summary)?;
            }
        }
        self.flush(table, schema, &mut buffer, &mut summary)?;
        Ok(summary)
    }

    fn prepare(&self, table: &str, schema: &DatasetSchema) -> Result<(), PipelineError> {
        self.destination
            .ensure_table(table, schema.fields())
            .map_err(|cause| PipelineError::Prepare {
                table: table.to_string(),
                cause,
            })?;
        self.destination
            .truncate(table)
            .map_err(|cause| PipelineError::Truncate {
                table: table.to_string(),
                cause,
            })?;
        tracing::info!(table, "Truncated destination table");
        Ok(())
    }

    fn flush(
        &self,
        table: &str,
        schema: &DatasetSchema,
        buffer: &mut BatchBuffer,
        summary: &mut LoadSummary,
    ) -> Result<(), PipelineError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let batch = summary.batches + 1;
        let rows = buffer.len();
        self.destination
            .bulk_insert(table, schema.fields(), buffer.records())
            .map_err(|cause| PipelineError::BatchInsert {
                table: table.to_string(),
                batch,
                rows,
                cause,
            })?;
        tracing::debug!(table, batch, rows, "Flushed batch");
        summary.batches = batch;
        buffer.clear();
        Ok(())
    }
}
