use std::os::unix::io::RawFd;

use tracing::debug;

use crate::error::Result;
use crate::fd;
use crate::repository::Repository;

/// Host-level fsync of the handle.
pub fn flush(_repository: &Repository, path: &str, fh: RawFd) -> Result<()> {
    debug!(path, fh, "flush");
    fd::fsync(fh)
}

/// Host-level fsync of the handle; with `datasync` set, data-only sync
/// where the host provides it.
pub fn fsync(_repository: &Repository, path: &str, datasync: bool, fh: RawFd) -> Result<()> {
    debug!(path, datasync, fh, "fsync");

    #[cfg(target_os = "linux")]
    if datasync {
        return fd::fdatasync(fh);
    }

    fd::fsync(fh)
}
