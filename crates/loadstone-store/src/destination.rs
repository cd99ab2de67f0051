//! Relational destination trait definition and shared SQL builders.

use std::fmt::Write as _;

use loadstone_types::identifier::{quote_identifier, validate_identifier};
use loadstone_types::{FieldRule, ValidRecord, Value};

use crate::error::{self, StoreError};

/// Bulk-load and query contract for the relational store.
///
/// Every method is its own commit boundary. Implementations must be
/// `Send + Sync` for use behind `Arc<dyn Destination>`.
pub trait Destination: Send + Sync {
    /// Run arbitrary SQL (one or more statements) and commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn execute(&self, sql: &str) -> error::Result<()>;

    /// Create `table` with `fields` as columns if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on invalid identifiers or storage failure.
    fn ensure_table(&self, table: &str, fields: &[FieldRule]) -> error::Result<()> {
        self.execute(&create_table_sql(table, fields)?)
    }

    /// Remove every row of `table` in a single committed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    fn truncate(&self, table: &str) -> error::Result<()>;

    /// Insert `records` into `table` in order, all or none.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure; no row of `records` is
    /// visible afterwards.
    fn bulk_insert(
        &self,
        table: &str,
        fields: &[FieldRule],
        records: &[ValidRecord],
    ) -> error::Result<u64>;

    /// Read every row of `table` in insertion order, typed per `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure or if a stored value does
    /// not match its declared field type.
    fn query_all(&self, table: &str, fields: &[FieldRule]) -> error::Result<Vec<Vec<Value>>>;
}

fn checked(name: &str) -> error::Result<String> {
    validate_identifier(name).map_err(|reason| StoreError::invalid_name(name, reason))?;
    Ok(quote_identifier(name))
}

/// Quote `fields` as a comma-separated column list.
pub(crate) fn column_list(fields: &[FieldRule]) -> error::Result<String> {
    let cols = fields
        .iter()
        .map(|f| checked(&f.name))
        .collect::<error::Result<Vec<_>>>()?;
    Ok(cols.join(", "))
}

/// Validate and quote a table name.
pub(crate) fn table_ident(table: &str) -> error::Result<String> {
    checked(table)
}

/// `CREATE TABLE IF NOT EXISTS` for `fields` in declaration order.
///
/// # Errors
///
/// Returns [`StoreError::InvalidName`] for unusable table or column names.
pub fn create_table_sql(table: &str, fields: &[FieldRule]) -> error::Result<String> {
    let table_q = table_ident(table)?;
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {table_q} (");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        let _ = write!(
            sql,
            "{} {} NOT NULL",
            checked(&field.name)?,
            field.field_type.sql_type()
        );
    }
    sql.push(')');
    Ok(sql)
}

/// Multi-row parameterized `INSERT` header plus `rows` placeholder tuples.
///
/// Placeholders are numbered `?1..?N` row-major.
///
/// # Errors
///
/// Returns [`StoreError::InvalidName`] for unusable table or column names.
pub fn insert_sql(table: &str, fields: &[FieldRule], rows: usize) -> error::Result<String> {
    let header = format!(
        "INSERT INTO {} ({}) VALUES ",
        table_ident(table)?,
        column_list(fields)?
    );
    let mut sql = String::with_capacity(header.len() + rows * fields.len() * 6);
    sql.push_str(&header);

    let mut param = 0usize;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..fields.len() {
            if col > 0 {
                sql.push_str(", ");
            }
            param += 1;
            let _ = write!(sql, "?{param}");
        }
        sql.push(')');
    }
    Ok(sql)
}
