//! Shared loadstone schema, record, and error classification types.
//!
//! Pure data types used by the store and engine crates. Kept separate so
//! destination and artifact-store implementations can share them without
//! depending on the engine.

#![warn(clippy::pedantic)]

pub mod error;
pub mod identifier;
pub mod record;
pub mod schema;

pub use error::ErrorClass;
pub use record::{BackupRecord, RawRow, RejectedRecord, ValidRecord, Value};
pub use schema::{BackupSchema, DatasetSchema, FieldRule, FieldType};
