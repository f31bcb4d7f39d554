use std::os::unix::io::RawFd;

use tracing::debug;

use crate::error::Result;
use crate::fd;
use crate::repository::Repository;

/// Seek the handle to `offset` and read up to `size` bytes. No caching.
pub fn read(
    _repository: &Repository,
    path: &str,
    size: usize,
    offset: i64,
    fh: RawFd,
) -> Result<Vec<u8>> {
    debug!(path, size, offset, fh, "read");
    fd::seek_read(fh, offset, size)
}
