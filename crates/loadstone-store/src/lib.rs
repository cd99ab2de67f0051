//! Storage collaborators for the loadstone engine.
//!
//! Provides the [`Destination`] trait (relational bulk-load and query
//! interface) with a [`SqliteDestination`] implementation, and the
//! [`ArtifactStore`] trait (named blobs in named containers) with a
//! [`FsArtifactStore`] implementation.

#![warn(clippy::pedantic)]

pub mod artifact;
pub mod destination;
pub mod error;
pub mod fs;
pub mod sqlite;

pub use artifact::ArtifactStore;
pub use destination::Destination;
pub use error::StoreError;
pub use fs::FsArtifactStore;
pub use sqlite::SqliteDestination;
