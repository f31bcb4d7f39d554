use std::fs;
use std::os::unix::io::RawFd;

use tracing::debug;

use crate::error::{FsError, Result};
use crate::fd;
use crate::repository::{Repository, Resolved};

/// Create a file: open a staging file at the path's `temp/` mirror with
/// create+truncate, and record the handle as writable. The path must not
/// already name a committed file or directory.
pub fn create(repository: &mut Repository, path: &str, mode: u32) -> Result<RawFd> {
    let resolved = repository.resolve_path(path)?;

    let staging = match resolved {
        Resolved::File(_) | Resolved::Directory(_) => {
            return Err(FsError::AccessDenied(path.to_string()))
        }
        Resolved::Temp(staging) => staging,
    };

    if let Some(parent) = staging.parent() {
        fs::create_dir_all(parent)?;
    }

    let fd = fd::open(
        &staging,
        libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
        mode,
    )?;
    repository.track_writable(fd);

    debug!(path, fd, mode, "created staging file");
    Ok(fd)
}
