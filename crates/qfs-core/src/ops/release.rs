use std::fs;
use std::os::unix::io::RawFd;

use qfs_meta::{Assignment, Constraint, File, Filenode, Value};
use tracing::debug;

use crate::error::Result;
use crate::paths;
use crate::repository::Repository;

/// Close a handle and, if it was writable, promote the staged content.
///
/// Promotion hashes the staging file; empty content is discarded without a
/// trace. Otherwise the file's current filenode is updated in place (a new
/// filenode is inserted for a previously unknown path), the staging file
/// moves into the blob store, and a blob whose hash lost its last referrer
/// is collected.
pub fn release(repository: &mut Repository, path: &str, fh: RawFd) -> Result<()> {
    crate::fd::close(fh)?;

    if !repository.untrack_writable(fh) {
        debug!(path, fh, "released read-only handle");
        return Ok(());
    }

    let staging = repository.temp_path(path);
    let hash = qfs_cas::hash_file(&staging)?;

    if hash == repository.empty_hash() {
        debug!(path, "discarding empty staging file");
        fs::remove_file(&staging)?;
        return Ok(());
    }

    let now = Repository::now_timestamp();
    let size = fs::metadata(&staging)?.len() as i64;
    let directory_id = repository.resolve_parent_id(&paths::parent(path))?;
    let name = paths::basename(path);

    let file = repository
        .session()
        .query::<File>()
        .select()
        .filter(Constraint::eq("name", name))
        .filter(Constraint::is("directory_id", directory_id))
        .fetch_one()?;

    match file {
        Some(file) => {
            // in-place update of the current version; explicit snapshots
            // happen only through commit
            let node = repository.filenode_of(&file)?;
            let previous_hash = node.hash.clone();

            repository
                .session()
                .query::<Filenode>()
                .update(vec![
                    Assignment::new("hash", hash.clone()),
                    Assignment::new("atime", now),
                    Assignment::new("mtime", now),
                    Assignment::new("size", size),
                ])
                .filter(Constraint::is("id", node.id))
                .execute()?;

            debug!(path, filenode = node.id, %hash, "updated filenode in place");

            if previous_hash != hash {
                repository.collect_blob(&previous_hash)?;
            }
        }
        None => {
            let filenode_id = repository
                .session()
                .query::<Filenode>()
                .insert(vec![
                    Assignment::new("hash", hash.clone()),
                    Assignment::new("ctime", now),
                    Assignment::new("atime", now),
                    Assignment::new("mtime", now),
                    Assignment::new("size", size),
                    Assignment::new("previous_filenode_id", Value::Null),
                ])
                .last_row_id()?;

            repository
                .session()
                .query::<File>()
                .insert(vec![
                    Assignment::new("name", name),
                    Assignment::new("directory_id", directory_id),
                    Assignment::new("filenode_id", filenode_id),
                ])
                .execute()?;

            debug!(path, filenode = filenode_id, %hash, "inserted new file");
        }
    }

    repository.blobs().promote(&staging, &hash)?;
    Ok(())
}
