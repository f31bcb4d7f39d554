use std::os::unix::io::RawFd;

use qfs_meta::{Constraint, Directory, File, Value};
use tracing::debug;

use crate::error::Result;
use crate::repository::{Repository, Resolved};

/// List a directory: `.` and `..` plus the names of all files and
/// directories scoped to it. The root lists entries whose parent id is
/// null. Order is unspecified.
pub fn readdir(repository: &Repository, path: &str, fh: Option<RawFd>) -> Result<Vec<String>> {
    let resolved = repository.resolve_path(path)?;
    debug!(path, ?fh, "readdir");

    let scope = match resolved {
        Resolved::Directory(directory) => Value::Integer(directory.id),
        // the root has no row of its own
        _ => Value::Null,
    };

    let mut entries = vec![".".to_string(), "..".to_string()];

    let files = repository
        .session()
        .query::<File>()
        .select()
        .filter(Constraint::is("directory_id", scope.clone()))
        .fetch_all()?;
    entries.extend(files.into_iter().map(|file| file.name));

    let directories = repository
        .session()
        .query::<Directory>()
        .select()
        .filter(Constraint::is("parent_directory_id", scope))
        .fetch_all()?;
    entries.extend(directories.into_iter().map(|directory| directory.name));

    Ok(entries)
}
