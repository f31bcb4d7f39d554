use qfs_meta::{Assignment, Directory};
use tracing::debug;

use crate::error::{FsError, Result};
use crate::paths;
use crate::repository::Repository;

/// Insert a directory row under the resolved parent.
///
/// Creating over an existing file or directory name, or under a parent that
/// is a file, is refused with `AccessDenied`.
pub fn mkdir(repository: &Repository, path: &str, mode: u32) -> Result<()> {
    debug!(path, mode, "mkdir");

    let parent_id = repository.resolve_parent_id(&paths::parent(path))?;

    if repository.resolve_entity(path)?.is_some() {
        return Err(FsError::AccessDenied(path.to_string()));
    }

    repository
        .session()
        .query::<Directory>()
        .insert(vec![
            Assignment::new("name", paths::basename(path)),
            Assignment::new("parent_directory_id", parent_id),
        ])
        .execute()?;

    Ok(())
}
