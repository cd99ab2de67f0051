//! `SQLite`-backed implementation of [`Destination`].
//!
//! Uses a single `Mutex<Connection>` for thread safety.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use loadstone_types::{FieldRule, FieldType, ValidRecord, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

use crate::destination::{column_list, insert_sql, table_ident, Destination};
use crate::error::{self, StoreError};

/// Upper bound on bound parameters per statement (`SQLITE_MAX_VARIABLE_NUMBER`
/// on older builds).
const MAX_PARAMS_PER_STATEMENT: usize = 999;

/// `SQLite` relational destination.
///
/// Create with [`SqliteDestination::open`] for a database file or
/// [`SqliteDestination::in_memory`] for tests.
pub struct SqliteDestination {
    conn: Mutex<Connection>,
}

impl SqliteDestination {
    /// Open or create a `SQLite` database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the directory or database
    /// can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot open {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Opened SQLite destination");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory `SQLite` destination (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database can't be initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("cannot open in-memory db: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Int(v) => SqlValue::Integer(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
    }
}

impl Destination for SqliteDestination {
    fn execute(&self, sql: &str) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn truncate(&self, table: &str) -> error::Result<()> {
        let table_q = table_ident(table)?;
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(&format!("DELETE FROM {table_q}"), [])?;
        tx.commit()?;
        tracing::debug!(table, removed, "Truncated table");
        Ok(())
    }

    fn bulk_insert(
        &self,
        table: &str,
        fields: &[FieldRule],
        records: &[ValidRecord],
    ) -> error::Result<u64> {
        if records.is_empty() || fields.is_empty() {
            return Ok(0);
        }
        for (index, record) in records.iter().enumerate() {
            if record.values().len() != fields.len() {
                return Err(StoreError::Arity {
                    table: table.to_string(),
                    index,
                    expected: fields.len(),
                    found: record.values().len(),
                });
            }
        }

        let rows_per_statement = (MAX_PARAMS_PER_STATEMENT / fields.len()).max(1);
        let mut conn = self.lock_conn()?;
        // Dropping the transaction without commit rolls back every chunk.
        let tx = conn.transaction()?;
        let mut inserted: u64 = 0;
        for chunk in records.chunks(rows_per_statement) {
            let sql = insert_sql(table, fields, chunk.len())?;
            let params = chunk
                .iter()
                .flat_map(|r| r.values().iter().map(to_sql_value));
            let mut stmt = tx.prepare_cached(&sql)?;
            inserted += stmt.execute(rusqlite::params_from_iter(params))? as u64;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn query_all(&self, table: &str, fields: &[FieldRule]) -> error::Result<Vec<Vec<Value>>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            column_list(fields)?,
            table_ident(table)?
        );
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            fields
                .iter()
                .enumerate()
                .map(|(i, field)| match field.field_type {
                    FieldType::Int => row.get::<_, i64>(i).map(Value::Int),
                    FieldType::Text => row.get::<_, String>(i).map(Value::Text),
                })
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs_fields() -> Vec<FieldRule> {
        vec![FieldRule::int("id"), FieldRule::text("job")]
    }

    fn job(id: i64, name: &str) -> ValidRecord {
        ValidRecord::new(vec![Value::Int(id), Value::from(name)])
    }

    fn dest_with_jobs() -> SqliteDestination {
        let dest = SqliteDestination::in_memory().unwrap();
        dest.ensure_table("jobs", &jobs_fields()).unwrap();
        dest
    }

    #[test]
    fn bulk_insert_then_query_preserves_order() {
        let dest = dest_with_jobs();
        let records = vec![job(3, "Analyst"), job(1, "Recruiter"), job(2, "Engineer")];
        let inserted = dest.bulk_insert("jobs", &jobs_fields(), &records).unwrap();
        assert_eq!(inserted, 3);

        let rows = dest.query_all("jobs", &jobs_fields()).unwrap();
        let expected: Vec<Vec<Value>> = records.into_iter().map(ValidRecord::into_values).collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn bulk_insert_spans_multiple_statements() {
        let dest = dest_with_jobs();
        let records: Vec<_> = (0..1200).map(|i| job(i, "Clerk")).collect();
        let inserted = dest.bulk_insert("jobs", &jobs_fields(), &records).unwrap();
        assert_eq!(inserted, 1200);
        assert_eq!(dest.query_all("jobs", &jobs_fields()).unwrap().len(), 1200);
    }

    #[test]
    fn failed_batch_leaves_no_rows() {
        let dest = SqliteDestination::in_memory().unwrap();
        dest.execute("CREATE TABLE jobs (id INTEGER PRIMARY KEY, job TEXT NOT NULL)")
            .unwrap();
        // Duplicate primary key in the second row fails the whole batch.
        let records = vec![job(1, "a"), job(1, "b")];
        assert!(dest.bulk_insert("jobs", &jobs_fields(), &records).is_err());
        assert!(dest.query_all("jobs", &jobs_fields()).unwrap().is_empty());
    }

    #[test]
    fn arity_mismatch_is_rejected_before_insert() {
        let dest = dest_with_jobs();
        let records = vec![ValidRecord::new(vec![Value::Int(1)])];
        let err = dest.bulk_insert("jobs", &jobs_fields(), &records).unwrap_err();
        assert!(matches!(err, StoreError::Arity { expected: 2, found: 1, .. }));
    }

    #[test]
    fn truncate_empties_table() {
        let dest = dest_with_jobs();
        dest.bulk_insert("jobs", &jobs_fields(), &[job(1, "a"), job(2, "b")])
            .unwrap();
        dest.truncate("jobs").unwrap();
        assert!(dest.query_all("jobs", &jobs_fields()).unwrap().is_empty());
    }

    #[test]
    fn truncate_missing_table_fails() {
        let dest = SqliteDestination::in_memory().unwrap();
        assert!(matches!(dest.truncate("jobs"), Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn text_that_looks_numeric_stays_text() {
        let dest = dest_with_jobs();
        dest.bulk_insert("jobs", &jobs_fields(), &[job(1, "0042")])
            .unwrap();
        let rows = dest.query_all("jobs", &jobs_fields()).unwrap();
        assert_eq!(rows[0][1], Value::Text("0042".into()));
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/warehouse.db");
        let dest = SqliteDestination::open(&path).unwrap();
        dest.ensure_table("jobs", &jobs_fields()).unwrap();
        assert!(path.exists());
    }
}
