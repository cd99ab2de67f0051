//! Row validation: raw source values to typed records or rejections.

use chrono::{DateTime, Utc};
use loadstone_types::{DatasetSchema, FieldType, RawRow, RejectedRecord, ValidRecord, Value};

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("expected {expected} values, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("empty or missing value at position {position} ({field})")]
    EmptyValue { position: usize, field: String },

    #[error("invalid integer '{value}' at position {position} ({field})")]
    NotAnInteger {
        position: usize,
        field: String,
        value: String,
    },
}

/// Coerce one raw value to `field_type`. Returns `None` if it does not fit.
#[must_use]
pub fn coerce(raw: &str, field_type: FieldType) -> Option<Value> {
    match field_type {
        FieldType::Int => raw.trim().parse::<i64>().ok().map(Value::Int),
        FieldType::Text => Some(Value::Text(raw.to_string())),
    }
}

/// Check `raw` against `schema` without building a rejection.
///
/// Checks run in order: column count, empty values, then per-position
/// coercion. The first failure wins.
///
/// # Errors
///
/// Returns the [`RowError`] describing the first problem found.
pub fn check(raw: &RawRow, schema: &DatasetSchema) -> Result<ValidRecord, RowError> {
    if raw.values.len() != schema.len() {
        return Err(RowError::ColumnCount {
            expected: schema.len(),
            found: raw.values.len(),
        });
    }

    if let Some(position) = raw.values.iter().position(|v| v.trim().is_empty()) {
        return Err(RowError::EmptyValue {
            position,
            field: schema.fields()[position].name.clone(),
        });
    }

    let mut values = Vec::with_capacity(schema.len());
    for (position, (value, rule)) in raw.values.iter().zip(schema.fields()).enumerate() {
        match coerce(value, rule.field_type) {
            Some(v) => values.push(v),
            None => {
                return Err(RowError::NotAnInteger {
                    position,
                    field: rule.name.clone(),
                    value: value.clone(),
                })
            }
        }
    }
    Ok(ValidRecord::new(values))
}

/// Validate `raw` against `schema`, stamping rejections with the current time.
///
/// # Errors
///
/// Returns the row as a [`RejectedRecord`] if it does not satisfy `schema`.
pub fn validate(raw: RawRow, schema: &DatasetSchema) -> Result<ValidRecord, RejectedRecord> {
    validate_at(raw, schema, Utc::now())
}

/// [`validate`] with an explicit rejection timestamp.
///
/// # Errors
///
/// Returns the row as a [`RejectedRecord`] if it does not satisfy `schema`.
pub fn validate_at(
    raw: RawRow,
    schema: &DatasetSchema,
    now: DateTime<Utc>,
) -> Result<ValidRecord, RejectedRecord> {
    check(&raw, schema).map_err(|err| RejectedRecord {
        raw,
        error_message: err.to_string(),
        rejected_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin;

    fn row(values: &[&str]) -> RawRow {
        RawRow::new(1, values.iter().map(|v| (*v).to_string()).collect())
    }

    #[test]
    fn valid_hired_employee_is_coerced() {
        let rec = validate(
            row(&["7", "Alice Doe", "2021-07-15T10:00:00Z", "5", "12"]),
            &builtin::hired_employees(),
        )
        .unwrap();
        assert_eq!(
            rec.values(),
            [
                Value::Int(7),
                Value::from("Alice Doe"),
                Value::from("2021-07-15T10:00:00Z"),
                Value::Int(5),
                Value::Int(12),
            ]
        );
    }

    #[test]
    fn non_numeric_int_is_rejected_with_reason() {
        let now = Utc::now();
        let raw = row(&["7", "Alice Doe", "2021-07-15", "5", "x"]);
        let rejected = validate_at(raw.clone(), &builtin::hired_employees(), now).unwrap_err();
        assert_eq!(rejected.raw, raw);
        assert_eq!(rejected.rejected_at, now);
        assert_eq!(
            rejected.error_message,
            "invalid integer 'x' at position 4 (job_id)"
        );
    }

    #[test]
    fn fractional_int_is_rejected() {
        let err = check(&row(&["1.5", "Recruiter"]), &builtin::jobs()).unwrap_err();
        assert!(matches!(err, RowError::NotAnInteger { position: 0, .. }));
        let err = check(&row(&["3.0", "Recruiter"]), &builtin::jobs()).unwrap_err();
        assert!(matches!(err, RowError::NotAnInteger { .. }));
    }

    #[test]
    fn int_tolerates_surrounding_whitespace() {
        let rec = check(&row(&[" 12 ", "Recruiter"]), &builtin::jobs()).unwrap();
        assert_eq!(rec.values()[0], Value::Int(12));
    }

    #[test]
    fn empty_value_is_rejected_before_coercion() {
        let err = check(&row(&["abc", ""]), &builtin::jobs()).unwrap_err();
        assert_eq!(
            err,
            RowError::EmptyValue {
                position: 1,
                field: "job".into()
            }
        );
        assert_eq!(err.to_string(), "empty or missing value at position 1 (job)");
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        let err = check(&row(&["1", "   "]), &builtin::departments()).unwrap_err();
        assert!(matches!(err, RowError::EmptyValue { position: 1, .. }));
    }

    #[test]
    fn too_few_and_too_many_values_are_rejected() {
        let err = check(&row(&["1"]), &builtin::jobs()).unwrap_err();
        assert_eq!(err, RowError::ColumnCount { expected: 2, found: 1 });
        let err = check(&row(&["1", "a", "b"]), &builtin::jobs()).unwrap_err();
        assert_eq!(err, RowError::ColumnCount { expected: 2, found: 3 });
    }

    #[test]
    fn text_is_kept_verbatim() {
        let rec = check(&row(&["1", "  Data Engineer "]), &builtin::jobs()).unwrap();
        assert_eq!(rec.values()[1], Value::from("  Data Engineer "));
    }
}
