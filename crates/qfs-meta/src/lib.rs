//! # qfs-meta
//!
//! Embedded relational metadata store for QueryFS.
//!
//! The store is a single SQLite file holding the namespace (directories and
//! files) and the per-file version history (filenodes). Schemas are static
//! records declared at compile time; queries are composed through a small
//! builder ADT and executed over a fresh connection per statement, which is
//! all the single-threaded dispatch model requires.

pub mod relation;
pub mod schema;
pub mod schemas;
pub mod session;

pub use relation::{one_to_many, one_to_one};
pub use schema::{ColumnKind, ColumnSpec, Schema};
pub use schemas::{Directory, File, Filenode};
pub use session::{Assignment, Constraint, QueryBuilder, Session, Value};

use thiserror::Error;

/// Errors surfaced by the metadata store.
#[derive(Error, Debug)]
pub enum MetaError {
    #[error("metadata store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("query builder: terminal invoked without a statement")]
    MissingStatement,
}

pub type Result<T> = std::result::Result<T, MetaError>;
