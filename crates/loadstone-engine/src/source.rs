//! Raw CSV sources: local files or blobs in the artifact store.
//!
//! Records are comma delimited with no header row. Record length is not
//! enforced here; short and long rows reach the validator and are rejected
//! there, one row at a time.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use csv::{ByteRecord, ReaderBuilder};
use loadstone_store::{ArtifactStore, StoreError};
use loadstone_types::RawRow;

/// Errors opening or reading a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot open {path}: {cause}")]
    Open {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("artifact store: {0}")]
    Store(#[from] StoreError),

    #[error("unreadable CSV after record {after}: {cause}")]
    Csv {
        after: u64,
        #[source]
        cause: csv::Error,
    },
}

impl SourceError {
    /// Returns `true` if the backing store is unreachable as a whole.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }
}

/// Rows of one source, in source order.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<RawRow, SourceError>> + 'a>;

/// Opens a named dataset source as a stream of raw rows.
pub trait Source: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source cannot be located or opened.
    fn open(&self, name: &str) -> Result<RowStream<'_>, SourceError>;
}

/// CSV files in a local directory.
pub struct LocalCsvSource {
    dir: PathBuf,
}

impl LocalCsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Source for LocalCsvSource {
    fn open(&self, name: &str) -> Result<RowStream<'_>, SourceError> {
        let path = self.dir.join(name);
        let file = File::open(&path).map_err(|cause| SourceError::Open {
            path: path.clone(),
            cause,
        })?;
        tracing::debug!(path = %path.display(), "Opened CSV source");
        Ok(Box::new(CsvRows::new(BufReader::new(file))))
    }
}

/// CSV blobs in one artifact-store container.
pub struct ArtifactCsvSource {
    store: Arc<dyn ArtifactStore>,
    container: String,
}

impl ArtifactCsvSource {
    pub fn new(store: Arc<dyn ArtifactStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

impl Source for ArtifactCsvSource {
    fn open(&self, name: &str) -> Result<RowStream<'_>, SourceError> {
        let bytes = self.store.get(&self.container, name)?;
        tracing::debug!(
            container = %self.container,
            name,
            bytes = bytes.len(),
            "Fetched CSV source"
        );
        Ok(Box::new(CsvRows::new(Cursor::new(bytes))))
    }
}

/// Iterator over headerless, variable-length CSV records.
///
/// Invalid UTF-8 is replaced rather than failing the read, so an encoding
/// glitch surfaces as a rejected row instead of aborting the dataset.
pub struct CsvRows<R: Read> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    count: u64,
    done: bool,
}

impl<R: Read> CsvRows<R> {
    pub fn new(input: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);
        Self {
            reader,
            record: ByteRecord::new(),
            count: 0,
            done: false,
        }
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = Result<RawRow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {
                self.count += 1;
                let values = self
                    .record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect();
                Some(Ok(RawRow::new(self.count, values)))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(cause) => {
                self.done = true;
                Some(Err(SourceError::Csv {
                    after: self.count,
                    cause,
                }))
            }
        }
    }
}
