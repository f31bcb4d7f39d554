use tracing::debug;

use crate::attrs::FsStatistics;
use crate::error::Result;
use crate::fd;
use crate::repository::{Repository, Resolved};

/// Stat the filesystem containing the backing of a resolved path.
pub fn statfs(repository: &Repository, path: &str) -> Result<FsStatistics> {
    let resolved = repository.resolve_path(path)?;
    debug!(path, "statfs");

    let backing = match resolved {
        Resolved::File(file) => repository.blob_path_for(&file)?,
        Resolved::Directory(_) => repository.temp_root().to_path_buf(),
        Resolved::Temp(path) => path,
    };

    let stats = fd::statvfs(&backing)?;
    Ok(FsStatistics::from_statvfs(&stats))
}
