use tracing::debug;

use crate::error::{FsError, Result};
use crate::repository::{Repository, Resolved};

/// Remove a directory and everything beneath it: subdirectories depth-first,
/// contained files unlinked through the filenode layer so blob refcounts
/// stay correct, then the directory row itself.
pub fn rmdir(repository: &Repository, path: &str) -> Result<()> {
    debug!(path, "rmdir");

    match repository.resolve_path(path)? {
        Resolved::Directory(directory) => repository.remove_directory_tree(&directory),
        _ => Err(FsError::NotFound(path.to_string())),
    }
}
