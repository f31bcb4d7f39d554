use qfs_meta::{Assignment, Constraint, Directory, File};
use tracing::debug;

use crate::error::{FsError, Result};
use crate::paths;
use crate::repository::{Entity, Repository};

/// Move an entity to a new name and parent. Metadata only: blobs are never
/// touched, so content follows the entity for free.
///
/// A destination name that already exists in the target directory is
/// refused, preserving sibling uniqueness.
pub fn rename(repository: &Repository, old: &str, new: &str) -> Result<()> {
    debug!(old, new, "rename");

    let entity = repository
        .resolve_entity(old)?
        .ok_or_else(|| FsError::NotFound(old.to_string()))?;
    let parent_id = repository.resolve_parent_id(&paths::parent(new))?;

    if repository.resolve_entity(new)?.is_some() {
        return Err(FsError::AccessDenied(new.to_string()));
    }

    let new_name = paths::basename(new);
    match entity {
        Entity::File(file) => {
            repository
                .session()
                .query::<File>()
                .update(vec![
                    Assignment::new("name", new_name),
                    Assignment::new("directory_id", parent_id),
                ])
                .filter(Constraint::is("id", file.id))
                .execute()?;
        }
        Entity::Directory(directory) => {
            repository
                .session()
                .query::<Directory>()
                .update(vec![
                    Assignment::new("name", new_name),
                    Assignment::new("parent_directory_id", parent_id),
                ])
                .filter(Constraint::is("id", directory.id))
                .execute()?;
        }
    }

    Ok(())
}
