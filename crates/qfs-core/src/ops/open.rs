use std::fs;
use std::os::unix::io::RawFd;

use tracing::debug;

use crate::error::{FsError, Result};
use crate::fd;
use crate::repository::{Repository, Resolved};

/// Open a path for I/O.
///
/// An in-flight staging file is opened directly. A committed file opens its
/// blob read-only when the flags are read-only; with write intent the blob
/// is first copied to the path's `temp/` mirror and the copy is opened, so
/// blobs themselves stay immutable. Write-intent handles are recorded so
/// release knows to promote them.
pub fn open(repository: &mut Repository, path: &str, flags: i32) -> Result<RawFd> {
    let resolved = repository.resolve_path(path)?;
    debug!(path, flags, "open");

    match resolved {
        Resolved::Temp(staging) if staging.is_file() => {
            let fd = fd::open(&staging, flags, 0)?;
            if flags != 0 {
                repository.track_writable(fd);
                debug!(path, fd, "opened writable staging file");
            }
            Ok(fd)
        }
        Resolved::File(file) => {
            let node = repository.filenode_of(&file)?;
            let blob = repository.blobs().blob_path(&node.hash);

            if flags == 0 {
                let fd = fd::open(&blob, libc::O_RDONLY, 0)?;
                debug!(path, fd, "opened blob read-only");
                return Ok(fd);
            }

            let staging = repository.temp_path(path);
            if let Some(parent) = staging.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&blob, &staging)?;

            let fd = fd::open(&staging, flags, 0)?;
            repository.track_writable(fd);
            debug!(path, fd, "staged blob copy for writing");
            Ok(fd)
        }
        Resolved::Directory(_) => Err(FsError::Invariant(format!("open on directory '{path}'"))),
        Resolved::Temp(_) => Err(FsError::NotFound(path.to_string())),
    }
}
