//! Arrow IPC encoding of table backups.
//!
//! A backup artifact is one Arrow IPC stream. Its embedded schema carries
//! the field names and types (`Int64` for int, `Utf8` for text, never
//! nullable) plus three metadata keys: [`TABLE_METADATA_KEY`] naming the
//! source table, [`VERSION_METADATA_KEY`] set to [`FORMAT_VERSION`], and
//! [`ROWS_METADATA_KEY`] holding the record count.
//! Decoding needs nothing but the bytes.
//!
//! An IPC stream cut at a message boundary reads as a shorter, well-formed
//! stream, so the decoded count is checked against [`ROWS_METADATA_KEY`].

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Int64Type, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use loadstone_types::record::BackupRecordError;
use loadstone_types::{BackupRecord, BackupSchema, FieldRule, FieldType, Value};

pub const TABLE_METADATA_KEY: &str = "loadstone.table";
pub const VERSION_METADATA_KEY: &str = "loadstone.format_version";
pub const ROWS_METADATA_KEY: &str = "loadstone.rows";
pub const FORMAT_VERSION: &str = "1";

/// Rows per IPC record batch.
const ROWS_PER_BATCH: usize = 8192;
const IPC_STREAM_OVERHEAD_BYTES: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("arrow: {0}")]
    Arrow(#[from] ArrowError),

    #[error("record {index}: {cause}")]
    Record {
        index: usize,
        #[source]
        cause: BackupRecordError,
    },

    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },

    #[error("column '{column}' is null at row {row}")]
    Null { column: String, row: usize },

    #[error("schema metadata '{0}' is missing")]
    MissingMetadata(&'static str),

    #[error("unsupported format version '{0}', expected '{FORMAT_VERSION}'")]
    Version(String),

    #[error("schema metadata '{key}' has invalid value '{value}'")]
    InvalidMetadata { key: &'static str, value: String },

    #[error("artifact is truncated: header declares {expected} records, stream holds {found}")]
    Truncated { expected: u64, found: u64 },
}

/// Decoded contents of a backup artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub table: String,
    pub schema: BackupSchema,
    pub records: Vec<BackupRecord>,
}

fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::Int => DataType::Int64,
        FieldType::Text => DataType::Utf8,
    }
}

fn arrow_schema(table: &str, schema: &BackupSchema, rows: usize) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| Field::new(&f.name, arrow_type(f.field_type), false))
        .collect();
    let metadata = HashMap::from([
        (TABLE_METADATA_KEY.to_string(), table.to_string()),
        (VERSION_METADATA_KEY.to_string(), FORMAT_VERSION.to_string()),
        (ROWS_METADATA_KEY.to_string(), rows.to_string()),
    ]);
    Arc::new(Schema::new_with_metadata(fields, metadata))
}

fn estimate_ipc_capacity(rows: usize, schema: &BackupSchema) -> usize {
    rows.saturating_mul(schema.len().max(1) * 16)
        .saturating_add(IPC_STREAM_OVERHEAD_BYTES)
}

/// Look up `rule` in `record`, checking its type.
fn field_value<'r>(
    record: &'r BackupRecord,
    rule: &FieldRule,
    index: usize,
) -> Result<&'r Value, CodecError> {
    let value = record.get(&rule.name).ok_or_else(|| CodecError::Record {
        index,
        cause: BackupRecordError::MissingField(rule.name.clone()),
    })?;
    if value.field_type() != rule.field_type {
        return Err(CodecError::Record {
            index,
            cause: BackupRecordError::TypeMismatch {
                field: rule.name.clone(),
                expected: rule.field_type,
                found: value.field_type(),
            },
        });
    }
    Ok(value)
}

fn build_batch(
    arrow_schema: &SchemaRef,
    schema: &BackupSchema,
    records: &[BackupRecord],
    offset: usize,
) -> Result<RecordBatch, CodecError> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.len());
    for rule in schema.fields() {
        let column: ArrayRef = match rule.field_type {
            FieldType::Int => {
                let values = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        field_value(r, rule, offset + i).map(|v| v.as_int().unwrap_or_default())
                    })
                    .collect::<Result<Vec<i64>, _>>()?;
                Arc::new(Int64Array::from(values))
            }
            FieldType::Text => {
                let values = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        field_value(r, rule, offset + i).map(|v| v.as_text().unwrap_or_default())
                    })
                    .collect::<Result<Vec<&str>, _>>()?;
                Arc::new(StringArray::from(values))
            }
        };
        columns.push(column);
    }
    Ok(RecordBatch::try_new(Arc::clone(arrow_schema), columns)?)
}

/// Encode every record of `table` into one self-describing IPC stream.
///
/// An empty table still yields a valid stream carrying only the schema.
///
/// # Errors
///
/// Returns [`CodecError::Record`] if a record lacks a schema field or holds
/// a value of the wrong type, or [`CodecError::Arrow`] on a writer failure.
pub fn encode(
    table: &str,
    schema: &BackupSchema,
    records: &[BackupRecord],
) -> Result<Vec<u8>, CodecError> {
    let arrow_schema = arrow_schema(table, schema, records.len());
    let mut buf = Vec::with_capacity(estimate_ipc_capacity(records.len(), schema));
    let mut writer = StreamWriter::try_new(&mut buf, &arrow_schema)?;
    for (chunk_index, chunk) in records.chunks(ROWS_PER_BATCH).enumerate() {
        let batch = build_batch(&arrow_schema, schema, chunk, chunk_index * ROWS_PER_BATCH)?;
        writer.write(&batch)?;
    }
    writer.finish()?;
    drop(writer);
    Ok(buf)
}

fn field_type_of(field: &Field) -> Result<FieldType, CodecError> {
    match field.data_type() {
        DataType::Int64 => Ok(FieldType::Int),
        DataType::Utf8 => Ok(FieldType::Text),
        other => Err(CodecError::UnsupportedType {
            column: field.name().clone(),
            data_type: other.to_string(),
        }),
    }
}

struct Header {
    table: String,
    schema: BackupSchema,
    rows: u64,
}

fn read_header(schema: &Schema) -> Result<Header, CodecError> {
    let metadata = schema.metadata();
    let version = metadata
        .get(VERSION_METADATA_KEY)
        .ok_or(CodecError::MissingMetadata(VERSION_METADATA_KEY))?;
    if version != FORMAT_VERSION {
        return Err(CodecError::Version(version.clone()));
    }
    let table = metadata
        .get(TABLE_METADATA_KEY)
        .ok_or(CodecError::MissingMetadata(TABLE_METADATA_KEY))?
        .clone();
    let declared = metadata
        .get(ROWS_METADATA_KEY)
        .ok_or(CodecError::MissingMetadata(ROWS_METADATA_KEY))?;
    let rows = declared
        .parse::<u64>()
        .map_err(|_| CodecError::InvalidMetadata {
            key: ROWS_METADATA_KEY,
            value: declared.clone(),
        })?;

    let fields = schema
        .fields()
        .iter()
        .map(|f| Ok(FieldRule::new(f.name().clone(), field_type_of(f)?)))
        .collect::<Result<Vec<_>, CodecError>>()?;
    Ok(Header {
        table,
        schema: BackupSchema::new(fields),
        rows,
    })
}

enum Column<'b> {
    Int(&'b Int64Array),
    Text(&'b StringArray),
}

impl Column<'_> {
    fn value(&self, name: &str, index: usize, row: usize) -> Result<Value, CodecError> {
        let is_null = match self {
            Self::Int(a) => a.is_null(index),
            Self::Text(a) => a.is_null(index),
        };
        if is_null {
            return Err(CodecError::Null {
                column: name.to_string(),
                row,
            });
        }
        Ok(match self {
            Self::Int(a) => Value::Int(a.value(index)),
            Self::Text(a) => Value::Text(a.value(index).to_string()),
        })
    }
}

fn columns_of<'b>(
    batch: &'b RecordBatch,
    schema: &BackupSchema,
) -> Result<Vec<Column<'b>>, CodecError> {
    schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(rule, array)| {
            let column = match rule.field_type {
                FieldType::Int => array.as_primitive_opt::<Int64Type>().map(Column::Int),
                FieldType::Text => array.as_string_opt::<i32>().map(Column::Text),
            };
            column.ok_or_else(|| CodecError::UnsupportedType {
                column: rule.name.clone(),
                data_type: array.data_type().to_string(),
            })
        })
        .collect()
}

/// Decode a backup artifact from its bytes alone.
///
/// # Errors
///
/// Returns [`CodecError`] on unreadable bytes, missing or unsupported
/// metadata, a column type other than `Int64`/`Utf8`, or a null value, and
/// [`CodecError::Truncated`] when the stream holds fewer or more records
/// than its header declares.
pub fn decode(bytes: &[u8]) -> Result<BackupArtifact, CodecError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let Header {
        table,
        schema,
        rows: declared,
    } = read_header(reader.schema().as_ref())?;

    let mut records = Vec::new();
    for maybe_batch in reader {
        let batch = maybe_batch?;
        let columns = columns_of(&batch, &schema)?;
        for index in 0..batch.num_rows() {
            let row = records.len();
            let values = schema
                .fields()
                .iter()
                .zip(&columns)
                .map(|(rule, column)| column.value(&rule.name, index, row))
                .collect::<Result<Vec<_>, _>>()?;
            let record = BackupRecord::from_row(&schema, values)
                .map_err(|cause| CodecError::Record { index: row, cause })?;
            records.push(record);
        }
    }

    let found = records.len() as u64;
    if found != declared {
        return Err(CodecError::Truncated {
            expected: declared,
            found,
        });
    }

    Ok(BackupArtifact {
        table,
        schema,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin;
    use arrow::array::Float64Array;

    fn job(id: i64, name: &str) -> BackupRecord {
        BackupRecord::from_row(&builtin::jobs(), vec![Value::Int(id), Value::from(name)]).unwrap()
    }

    fn raw_stream(schema: Schema, columns: Vec<ArrayRef>) -> Vec<u8> {
        let schema = Arc::new(schema);
        let batch = RecordBatch::try_new(Arc::clone(&schema), columns).unwrap();
        let mut buf = Vec::new();
        let mut writer = StreamWriter::try_new(&mut buf, &schema).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();
        drop(writer);
        buf
    }

    fn tagged(table: &str, rows: usize) -> HashMap<String, String> {
        HashMap::from([
            (TABLE_METADATA_KEY.to_string(), table.to_string()),
            (VERSION_METADATA_KEY.to_string(), FORMAT_VERSION.to_string()),
            (ROWS_METADATA_KEY.to_string(), rows.to_string()),
        ])
    }

    #[test]
    fn decode_restores_table_schema_and_records() {
        let records = vec![job(1, "Recruiter"), job(2, "Data Engineer")];
        let bytes = encode("jobs", &builtin::jobs(), &records).unwrap();
        let artifact = decode(&bytes).unwrap();
        assert_eq!(artifact.table, "jobs");
        assert_eq!(artifact.schema, builtin::jobs());
        assert_eq!(artifact.records, records);
    }

    #[test]
    fn empty_table_encodes_schema_only() {
        let bytes = encode("departments", &builtin::departments(), &[]).unwrap();
        let artifact = decode(&bytes).unwrap();
        assert_eq!(artifact.schema, builtin::departments());
        assert!(artifact.records.is_empty());
    }

    #[test]
    fn large_tables_span_several_batches_in_order() {
        let records: Vec<BackupRecord> = (0..(ROWS_PER_BATCH as i64 + 5))
            .map(|i| job(i, "Clerk"))
            .collect();
        let bytes = encode("jobs", &builtin::jobs(), &records).unwrap();
        let artifact = decode(&bytes).unwrap();
        assert_eq!(artifact.records.len(), records.len());
        assert_eq!(artifact.records.last(), records.last());
    }

    #[test]
    fn record_missing_field_fails_encode() {
        let mut partial = BackupRecord::default();
        partial.insert("id", Value::Int(1));
        let err = encode("jobs", &builtin::jobs(), &[job(0, "ok"), partial]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Record {
                index: 1,
                cause: BackupRecordError::MissingField(_)
            }
        ));
    }

    #[test]
    fn garbage_bytes_fail_decode() {
        let err = decode(b"not valid ipc data").unwrap_err();
        assert!(matches!(err, CodecError::Arrow(_)));
    }

    #[test]
    fn stream_without_metadata_is_rejected() {
        let bytes = raw_stream(
            Schema::new(vec![Field::new("id", DataType::Int64, false)]),
            vec![Arc::new(Int64Array::from(vec![1]))],
        );
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::MissingMetadata(VERSION_METADATA_KEY)));
    }

    #[test]
    fn unknown_format_version_is_rejected() {
        let mut metadata = tagged("jobs", 1);
        metadata.insert(VERSION_METADATA_KEY.to_string(), "2".to_string());
        let bytes = raw_stream(
            Schema::new_with_metadata(vec![Field::new("id", DataType::Int64, false)], metadata),
            vec![Arc::new(Int64Array::from(vec![1]))],
        );
        assert!(matches!(decode(&bytes).unwrap_err(), CodecError::Version(v) if v == "2"));
    }

    #[test]
    fn unsupported_column_type_is_rejected() {
        let bytes = raw_stream(
            Schema::new_with_metadata(
                vec![Field::new("salary", DataType::Float64, false)],
                tagged("payroll", 1),
            ),
            vec![Arc::new(Float64Array::from(vec![1.5]))],
        );
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType { ref column, .. } if column == "salary"));
    }

    #[test]
    fn null_value_is_rejected() {
        let bytes = raw_stream(
            Schema::new_with_metadata(
                vec![
                    Field::new("id", DataType::Int64, false),
                    Field::new("job", DataType::Utf8, true),
                ],
                tagged("jobs", 2),
            ),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("Recruiter"), None])),
            ],
        );
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Null { ref column, row: 1 } if column == "job"));
    }

    /// Byte offset just past the first record batch message.
    fn first_batch_end(records: &[BackupRecord]) -> usize {
        let head = encode("jobs", &builtin::jobs(), &records[..ROWS_PER_BATCH]).unwrap();
        // 8-byte end-of-stream marker
        head.len() - 8
    }

    #[test]
    fn stream_cut_at_batch_boundary_is_truncated() {
        let records: Vec<BackupRecord> = (0..(ROWS_PER_BATCH as i64 + 5))
            .map(|i| job(i, "Clerk"))
            .collect();
        let bytes = encode("jobs", &builtin::jobs(), &records).unwrap();
        let cut = first_batch_end(&records);
        assert!(cut < bytes.len());

        let err = decode(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(err, CodecError::Truncated { expected, found } if expected == records.len() as u64 && found == ROWS_PER_BATCH as u64),
            "got: {err}"
        );
    }

    #[test]
    fn stream_cut_after_schema_is_truncated() {
        let records = vec![job(1, "Recruiter"), job(2, "Data Engineer")];
        let bytes = encode("jobs", &builtin::jobs(), &records).unwrap();
        let schema_only = encode("jobs", &builtin::jobs(), &[]).unwrap();
        // Both headers are the same length, so this is the end of the schema message.
        let cut = schema_only.len() - 8;
        let err = decode(&bytes[..cut]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                expected: 2,
                found: 0
            }
        ));
    }

    #[test]
    fn stream_without_row_count_is_rejected() {
        let mut metadata = tagged("jobs", 1);
        metadata.remove(ROWS_METADATA_KEY);
        let bytes = raw_stream(
            Schema::new_with_metadata(vec![Field::new("id", DataType::Int64, false)], metadata),
            vec![Arc::new(Int64Array::from(vec![1]))],
        );
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::MissingMetadata(ROWS_METADATA_KEY)));
    }

    #[test]
    fn unparseable_row_count_is_rejected() {
        let mut metadata = tagged("jobs", 1);
        metadata.insert(ROWS_METADATA_KEY.to_string(), "many".to_string());
        let bytes = raw_stream(
            Schema::new_with_metadata(vec![Field::new("id", DataType::Int64, false)], metadata),
            vec![Arc::new(Int64Array::from(vec![1]))],
        );
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::InvalidMetadata { ref value, .. } if value == "many"));
    }
}
