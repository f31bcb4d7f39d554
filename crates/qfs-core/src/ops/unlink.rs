use tracing::debug;

use crate::error::{FsError, Result};
use crate::repository::{Repository, Resolved};

/// Delete a file row and its entire filenode history; blobs whose hash
/// loses its last referrer are collected.
pub fn unlink(repository: &Repository, path: &str) -> Result<()> {
    debug!(path, "unlink");

    match repository.resolve_path(path)? {
        Resolved::File(file) => repository.unlink_file(&file),
        _ => Err(FsError::NotFound(path.to_string())),
    }
}
