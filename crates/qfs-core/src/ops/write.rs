use std::os::unix::io::RawFd;

use tracing::debug;

use crate::error::Result;
use crate::fd;
use crate::repository::Repository;

/// Seek the handle to `offset` and write `data`, returning the number of
/// bytes written.
pub fn write(
    _repository: &Repository,
    path: &str,
    data: &[u8],
    offset: i64,
    fh: RawFd,
) -> Result<usize> {
    debug!(path, len = data.len(), offset, fh, "write");
    fd::seek_write(fh, offset, data)
}
