//! Protocol-facing dispatch surface.
//!
//! `QueryFs` wires a kernel protocol adapter's verbs to the operations,
//! routing the lookup verbs through the attribute cache and invalidating it
//! on mutation. Dispatch is single-threaded and blocking: one operation runs
//! to completion before the next begins.

use std::os::unix::io::RawFd;
use std::path::Path;

use crate::attrs::{FileAttributes, FsStatistics};
use crate::cache::AttrCache;
use crate::error::{FsError, Result};
use crate::ops;
use crate::paths;
use crate::repository::Repository;

pub struct QueryFs {
    repository: Repository,
    cache: AttrCache,
}

impl QueryFs {
    /// Open the filesystem over the repository at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            repository: Repository::open(root)?,
            cache: AttrCache::new(),
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    // ---- lookup verbs (read-through cached) ---------------------------

    pub fn access(&mut self, path: &str, amode: i32) -> Result<()> {
        ops::access(&self.repository, path, amode)
    }

    pub fn getattr(&mut self, path: &str, fh: Option<RawFd>) -> Result<FileAttributes> {
        let repository = &self.repository;
        self.cache
            .getattr_with(path, || ops::getattr(repository, path, fh))
    }

    pub fn readdir(&mut self, path: &str, fh: Option<RawFd>) -> Result<Vec<String>> {
        let repository = &self.repository;
        self.cache
            .readdir_with(path, || ops::readdir(repository, path, fh))
    }

    pub fn statfs(&mut self, path: &str) -> Result<FsStatistics> {
        let repository = &self.repository;
        self.cache.statfs_with(path, || ops::statfs(repository, path))
    }

    // ---- mutating verbs -----------------------------------------------

    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<()> {
        self.cache.invalidate_readdir(&paths::parent(path));
        ops::mkdir(&self.repository, path, mode)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        self.cache.invalidate_readdir(&paths::parent(path));
        ops::rmdir(&self.repository, path)
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        self.cache.invalidate_readdir(&paths::parent(old));
        self.cache.invalidate_readdir(&paths::parent(new));
        self.cache.invalidate_getattr(old);
        self.cache.invalidate_getattr(new);
        ops::rename(&self.repository, old, new)
    }

    pub fn create(&mut self, path: &str, mode: u32) -> Result<RawFd> {
        self.cache.invalidate_readdir(&paths::parent(path));
        self.cache.invalidate_getattr(path);
        ops::create(&mut self.repository, path, mode)
    }

    pub fn open(&mut self, path: &str, flags: i32) -> Result<RawFd> {
        self.cache.invalidate_readdir(&paths::parent(path));
        ops::open(&mut self.repository, path, flags)
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        self.cache.invalidate_readdir(&paths::parent(path));
        self.cache.invalidate_getattr(path);
        ops::unlink(&self.repository, path)
    }

    pub fn truncate(&mut self, path: &str, length: i64, fh: Option<RawFd>) -> Result<()> {
        self.cache.invalidate_readdir(&paths::parent(path));
        self.cache.invalidate_getattr(path);
        ops::truncate(&self.repository, path, length, fh)
    }

    pub fn read(&mut self, path: &str, size: usize, offset: i64, fh: RawFd) -> Result<Vec<u8>> {
        ops::read(&self.repository, path, size, offset, fh)
    }

    pub fn write(&mut self, path: &str, data: &[u8], offset: i64, fh: RawFd) -> Result<usize> {
        self.cache.invalidate_getattr(path);
        ops::write(&self.repository, path, data, offset, fh)
    }

    pub fn flush(&mut self, path: &str, fh: RawFd) -> Result<()> {
        self.cache.invalidate_getattr(path);
        ops::flush(&self.repository, path, fh)
    }

    pub fn fsync(&mut self, path: &str, datasync: bool, fh: RawFd) -> Result<()> {
        self.cache.invalidate_getattr(path);
        ops::fsync(&self.repository, path, datasync, fh)
    }

    pub fn release(&mut self, path: &str, fh: RawFd) -> Result<()> {
        self.cache.invalidate_readdir(&paths::parent(path));
        self.cache.invalidate_getattr(path);
        ops::release(&mut self.repository, path, fh)
    }

    // ---- explicit versioning ------------------------------------------

    pub fn commit(&mut self, path: &str) -> Result<()> {
        self.repository.commit(path)
    }

    pub fn rollback(&mut self, path: &str) -> Result<()> {
        self.cache.invalidate_getattr(path);
        self.repository.rollback(path)
    }

    // ---- declared unsupported -----------------------------------------

    pub fn chmod(&mut self, _path: &str, _mode: u32) -> Result<()> {
        Err(FsError::Unsupported("chmod"))
    }

    pub fn chown(&mut self, _path: &str, _uid: u32, _gid: u32) -> Result<()> {
        Err(FsError::Unsupported("chown"))
    }

    pub fn getxattr(&mut self, _path: &str, _name: &str) -> Result<Vec<u8>> {
        Err(FsError::Unsupported("getxattr"))
    }

    pub fn setxattr(&mut self, _path: &str, _name: &str, _value: &[u8]) -> Result<()> {
        Err(FsError::Unsupported("setxattr"))
    }

    pub fn readlink(&mut self, _path: &str) -> Result<String> {
        Err(FsError::Unsupported("readlink"))
    }

    pub fn mknod(&mut self, _path: &str, _mode: u32, _dev: u64) -> Result<()> {
        Err(FsError::Unsupported("mknod"))
    }

    pub fn symlink(&mut self, _target: &str, _source: &str) -> Result<()> {
        Err(FsError::Unsupported("symlink"))
    }

    pub fn link(&mut self, _target: &str, _source: &str) -> Result<()> {
        Err(FsError::Unsupported("link"))
    }

    pub fn utimens(&mut self, _path: &str, _atime: f64, _mtime: f64) -> Result<()> {
        Err(FsError::Unsupported("utimens"))
    }
}
