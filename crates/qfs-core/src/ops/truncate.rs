use std::os::unix::io::RawFd;

use tracing::{debug, warn};

use crate::error::Result;
use crate::fd;
use crate::repository::Repository;

/// Truncate the file behind a writable handle.
///
/// Without a writable handle nothing changes: blobs are immutable, so the
/// request is logged and dropped.
pub fn truncate(
    repository: &Repository,
    path: &str,
    length: i64,
    fh: Option<RawFd>,
) -> Result<()> {
    match fh {
        Some(fh) if repository.is_writable(fh) => {
            debug!(path, length, fh, "truncate");
            fd::truncate(fh, length)
        }
        _ => {
            warn!(path, length, "truncate ignored: handle is not writable");
            Ok(())
        }
    }
}
