use tracing::debug;

use crate::error::{FsError, Result};
use crate::fd;
use crate::repository::{Repository, Resolved};

/// Check host access for the backing of a resolved path.
///
/// Directories always pass; files are checked against their backing blob;
/// temp paths are checked directly. Any host-level denial maps to
/// `AccessDenied`.
pub fn access(repository: &Repository, path: &str, amode: i32) -> Result<()> {
    let resolved = repository.resolve_path(path)?;
    debug!(path, amode, "access");

    let target = match resolved {
        Resolved::Directory(_) => return Ok(()),
        Resolved::File(file) => repository.blob_path_for(&file)?,
        Resolved::Temp(path) => path,
    };

    fd::access(&target, amode).map_err(|_| FsError::AccessDenied(path.to_string()))
}
