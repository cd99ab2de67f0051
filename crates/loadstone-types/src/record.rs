//! Row-level record types flowing through the ingestion and backup paths.
//!
//! [`RawRow`] is what a source yields. The row validator turns it into
//! either a [`ValidRecord`] or a [`RejectedRecord`]. [`BackupRecord`] is
//! the unit exchanged with the columnar backup codec.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use crate::schema::{BackupSchema, FieldType};

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Int(_) => FieldType::Int,
            Self::Text(_) => FieldType::Text,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Untyped values of one source record, in source column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based record number within the source, counting a quoted
    /// multi-line field as part of one record.
    pub line: u64,
    pub values: Vec<String>,
}

impl RawRow {
    #[must_use]
    pub fn new(line: u64, values: Vec<String>) -> Self {
        Self { line, values }
    }
}

/// A row whose values were all coerced to the schema's declared types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecord {
    values: Vec<Value>,
}

impl ValidRecord {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A row that failed validation, kept verbatim with its diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub raw: RawRow,
    pub error_message: String,
    pub rejected_at: DateTime<Utc>,
}

/// Problems building a [`BackupRecord`] or turning one back into a row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackupRecordError {
    #[error("expected {expected} values, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    #[error("field '{0}' is missing")]
    MissingField(String),
}

/// Field name to value mapping for one table row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackupRecord {
    fields: BTreeMap<String, Value>,
}

impl BackupRecord {
    /// Pair `values` with the schema's field names, checking arity and types.
    ///
    /// # Errors
    ///
    /// Returns [`BackupRecordError`] if the value count or any value type
    /// disagrees with `schema`.
    pub fn from_row(schema: &BackupSchema, values: Vec<Value>) -> Result<Self, BackupRecordError> {
        if values.len() != schema.len() {
            return Err(BackupRecordError::Arity {
                expected: schema.len(),
                found: values.len(),
            });
        }
        let mut fields = BTreeMap::new();
        for (rule, value) in schema.fields().iter().zip(values) {
            if value.field_type() != rule.field_type {
                return Err(BackupRecordError::TypeMismatch {
                    field: rule.name.clone(),
                    expected: rule.field_type,
                    found: value.field_type(),
                });
            }
            fields.insert(rule.name.clone(), value);
        }
        Ok(Self { fields })
    }

    /// Rebuild the row in `schema` field order.
    ///
    /// # Errors
    ///
    /// Returns [`BackupRecordError::MissingField`] if a schema field has no value.
    pub fn into_row(mut self, schema: &BackupSchema) -> Result<Vec<Value>, BackupRecordError> {
        schema
            .fields()
            .iter()
            .map(|rule| {
                self.fields
                    .remove(&rule.name)
                    .ok_or_else(|| BackupRecordError::MissingField(rule.name.clone()))
            })
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DatasetSchema, FieldRule};

    fn jobs_schema() -> BackupSchema {
        DatasetSchema::new(vec![FieldRule::int("id"), FieldRule::text("job")])
    }

    #[test]
    fn backup_record_maps_names_to_values() {
        let rec =
            BackupRecord::from_row(&jobs_schema(), vec![Value::Int(4), "Recruiter".into()]).unwrap();
        assert_eq!(rec.get("id"), Some(&Value::Int(4)));
        assert_eq!(rec.get("job").and_then(Value::as_text), Some("Recruiter"));
    }

    #[test]
    fn backup_record_rejects_wrong_arity() {
        let err = BackupRecord::from_row(&jobs_schema(), vec![Value::Int(4)]).unwrap_err();
        assert_eq!(err, BackupRecordError::Arity { expected: 2, found: 1 });
    }

    #[test]
    fn backup_record_rejects_wrong_type() {
        let err = BackupRecord::from_row(&jobs_schema(), vec!["4".into(), "Recruiter".into()])
            .unwrap_err();
        assert!(err.to_string().contains("field 'id' expects int, got text"));
    }

    #[test]
    fn into_row_restores_schema_order() {
        let mut rec = BackupRecord::default();
        rec.insert("job", "Analyst".into());
        rec.insert("id", Value::Int(9));
        let row = rec.into_row(&jobs_schema()).unwrap();
        assert_eq!(row, vec![Value::Int(9), Value::Text("Analyst".into())]);
    }

    #[test]
    fn into_row_reports_missing_field() {
        let mut rec = BackupRecord::default();
        rec.insert("id", Value::Int(9));
        let err = rec.into_row(&jobs_schema()).unwrap_err();
        assert_eq!(err, BackupRecordError::MissingField("job".into()));
    }

    #[test]
    fn value_display_is_unquoted() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::from("a,b").to_string(), "a,b");
    }
}
