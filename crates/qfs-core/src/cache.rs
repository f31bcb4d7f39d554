//! Read-through cache for the lookup verbs.
//!
//! Entries are keyed by logical path and replaced on the next read after
//! invalidation, so the cache stays small in practice even though it is
//! unbounded in principle. Mutating operations invalidate conservatively.

use std::collections::HashMap;

use crate::attrs::{FileAttributes, FsStatistics};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct AttrCache {
    getattr: HashMap<String, FileAttributes>,
    readdir: HashMap<String, Vec<String>>,
    statfs: HashMap<String, FsStatistics>,
}

impl AttrCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn getattr_with(
        &mut self,
        path: &str,
        resolve: impl FnOnce() -> Result<FileAttributes>,
    ) -> Result<FileAttributes> {
        if let Some(hit) = self.getattr.get(path) {
            return Ok(*hit);
        }

        let value = resolve()?;
        self.getattr.insert(path.to_string(), value);
        Ok(value)
    }

    pub fn readdir_with(
        &mut self,
        path: &str,
        resolve: impl FnOnce() -> Result<Vec<String>>,
    ) -> Result<Vec<String>> {
        if let Some(hit) = self.readdir.get(path) {
            return Ok(hit.clone());
        }

        let value = resolve()?;
        self.readdir.insert(path.to_string(), value.clone());
        Ok(value)
    }

    pub fn statfs_with(
        &mut self,
        path: &str,
        resolve: impl FnOnce() -> Result<FsStatistics>,
    ) -> Result<FsStatistics> {
        if let Some(hit) = self.statfs.get(path) {
            return Ok(*hit);
        }

        let value = resolve()?;
        self.statfs.insert(path.to_string(), value);
        Ok(value)
    }

    pub fn invalidate_getattr(&mut self, path: &str) {
        self.getattr.remove(path);
    }

    pub fn invalidate_readdir(&mut self, path: &str) {
        self.readdir.remove(path);
    }
}
