//! The three persisted entities: directories, files, filenodes.
//!
//! A `File` is a named reference to exactly one `Filenode`, the current
//! content version. Filenodes chain through `previous_filenode_id` into a
//! per-file history, most recent first. The root directory is implicit:
//! rows whose parent id is null live at the top level.

use crate::relation::{one_to_many, one_to_one};
use crate::schema::{ColumnSpec, Schema};
use crate::session::{Session, Value};
use crate::Result;

/// A named, possibly nested namespace container.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    pub id: i64,
    pub name: String,
    pub parent_directory_id: Option<i64>,
}

impl Schema for Directory {
    const TABLE: &'static str = "directories";
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::primary_key("id"),
        ColumnSpec::text("name"),
        ColumnSpec::integer_null("parent_directory_id"),
    ];

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            parent_directory_id: row.get(2)?,
        })
    }
}

impl Directory {
    /// Files directly contained in this directory.
    pub fn files(&self, session: &Session) -> Result<Vec<File>> {
        one_to_many::<File>(session, "directory_id", Value::Integer(self.id))
    }

    /// Directories directly contained in this directory.
    pub fn subdirectories(&self, session: &Session) -> Result<Vec<Directory>> {
        one_to_many::<Directory>(session, "parent_directory_id", Value::Integer(self.id))
    }
}

/// A named reference in a directory to a filenode.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: i64,
    pub name: String,
    pub directory_id: Option<i64>,
    pub filenode_id: i64,
}

impl Schema for File {
    const TABLE: &'static str = "files";
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::primary_key("id"),
        ColumnSpec::text("name"),
        ColumnSpec::integer_null("directory_id"),
        ColumnSpec::integer("filenode_id"),
    ];

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            directory_id: row.get(2)?,
            filenode_id: row.get(3)?,
        })
    }
}

impl File {
    /// The current content version of this file.
    pub fn filenode(&self, session: &Session) -> Result<Option<Filenode>> {
        one_to_one::<Filenode>(session, "id", Value::Integer(self.filenode_id))
    }
}

/// One immutable content version: hash, times, size, and a link to the
/// version it superseded.
#[derive(Debug, Clone, PartialEq)]
pub struct Filenode {
    pub id: i64,
    pub hash: String,
    pub ctime: f64,
    pub atime: f64,
    pub mtime: f64,
    pub size: i64,
    pub previous_filenode_id: Option<i64>,
}

impl Schema for Filenode {
    const TABLE: &'static str = "filenodes";
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::primary_key("id"),
        ColumnSpec::text("hash"),
        ColumnSpec::real("ctime"),
        ColumnSpec::real("atime"),
        ColumnSpec::real("mtime"),
        ColumnSpec::integer("size"),
        ColumnSpec::integer_null("previous_filenode_id"),
    ];

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            hash: row.get(1)?,
            ctime: row.get(2)?,
            atime: row.get(3)?,
            mtime: row.get(4)?,
            size: row.get(5)?,
            previous_filenode_id: row.get(6)?,
        })
    }
}

impl Filenode {
    /// The version this one superseded, if any.
    pub fn previous(&self, session: &Session) -> Result<Option<Filenode>> {
        match self.previous_filenode_id {
            Some(id) => one_to_one::<Filenode>(session, "id", Value::Integer(id)),
            None => Ok(None),
        }
    }
}
