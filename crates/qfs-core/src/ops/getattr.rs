use std::fs;
use std::os::unix::io::RawFd;

use tracing::debug;

use crate::attrs::FileAttributes;
use crate::error::{FsError, Result};
use crate::repository::{Repository, Resolved};

/// Stat the backing of a resolved path.
///
/// Committed files stat their blob and then overlay the metadata-stored
/// times and size, so callers see logical values rather than the blob
/// file's. Directories stat the temp root.
pub fn getattr(repository: &Repository, path: &str, fh: Option<RawFd>) -> Result<FileAttributes> {
    let resolved = repository.resolve_path(path)?;
    debug!(path, ?fh, "getattr");

    let (backing, node) = match resolved {
        Resolved::File(file) => {
            let node = repository.filenode_of(&file)?;
            (repository.blobs().blob_path(&node.hash), Some(node))
        }
        Resolved::Directory(_) => (repository.temp_root().to_path_buf(), None),
        Resolved::Temp(path) => (path, None),
    };

    let metadata = fs::symlink_metadata(&backing).map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound(path.to_string())
        } else {
            FsError::Io(error)
        }
    })?;

    let attributes = FileAttributes::from_metadata(&metadata);
    Ok(match node {
        Some(node) => attributes.overlay(&node),
        None => attributes,
    })
}
