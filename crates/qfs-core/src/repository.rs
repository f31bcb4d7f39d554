//! Repository layout, path resolution, and filenode versioning.
//!
//! The repository exclusively owns three things under its root: the metadata
//! file, the `temp/` scratch tree (staging files for paths currently open
//! writable, mirroring their logical paths), and the flat `blobs/` store.

use std::collections::HashSet;
use std::fs;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use qfs_cas::BlobStore;
use qfs_meta::{Assignment, Constraint, Directory, File, Filenode, Session};
use tracing::{debug, info};

use crate::error::{FsError, Result};
use crate::paths;

pub const METADATA_FILE: &str = "metadata";
pub const TEMP_DIR: &str = "temp";
pub const BLOBS_DIR: &str = "blobs";

/// A metadata entity a path can resolve to.
#[derive(Debug, Clone)]
pub enum Entity {
    File(File),
    Directory(Directory),
}

/// Outcome of resolving a logical path.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// The path names a committed file.
    File(File),
    /// The path names a directory.
    Directory(Directory),
    /// The path maps into `temp/`: an in-flight staging file, the temp root
    /// itself, or a prospective location for a file about to be created.
    Temp(PathBuf),
}

/// Owner of the on-disk layout; mediates all access to it.
pub struct Repository {
    root: PathBuf,
    temp: PathBuf,
    session: Session,
    blobs: BlobStore,
    writable_handles: HashSet<RawFd>,
}

impl Repository {
    /// Open (creating as needed) the repository at `root`.
    ///
    /// Startup maintenance: the layout directories and metadata tables are
    /// ensured, and empty `temp/` subtrees left behind by prior crashes are
    /// pruned. Maintenance tolerates `temp/` inconsistencies silently.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let temp = root.join(TEMP_DIR);
        fs::create_dir_all(&temp)?;

        let blobs = BlobStore::open(root.join(BLOBS_DIR))?;

        let session = Session::new(root.join(METADATA_FILE));
        session.ensure_table::<Directory>()?;
        session.ensure_table::<File>()?;
        session.ensure_table::<Filenode>()?;

        for entry in fs::read_dir(&temp)? {
            let path = entry?.path();
            if path.is_dir() {
                remove_empty_directories(&path);
            }
        }

        info!(root = %root.display(), "repository opened");

        Ok(Self {
            root,
            temp,
            session,
            blobs,
            writable_handles: HashSet::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn empty_hash(&self) -> &str {
        self.blobs.empty_hash()
    }

    /// Seconds since the epoch, as the metadata store records times.
    pub fn now_timestamp() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// The scratch location mirroring a logical path under `temp/`.
    pub fn temp_path(&self, path: &str) -> PathBuf {
        let segments = paths::segments(path);
        if segments.is_empty() {
            self.temp.clone()
        } else {
            self.temp.join(segments.join("/"))
        }
    }

    /// Walk the metadata tree for the entity a logical path names.
    ///
    /// The walk is an iterative loop over segments: at each step a directory
    /// with `(name, parent_directory_id)` is looked up; on the final segment
    /// a file with the same name and parent is tried as well. The root
    /// resolves to `None` (it has no row).
    pub fn resolve_entity(&self, path: &str) -> Result<Option<Entity>> {
        let segments = paths::segments(path);
        if segments.is_empty() {
            return Ok(None);
        }

        let mut parent_id: Option<i64> = None;
        let last = segments.len() - 1;

        for (index, name) in segments.iter().enumerate() {
            let directory = self
                .session
                .query::<Directory>()
                .select()
                .filter(Constraint::is("name", *name))
                .filter(Constraint::is("parent_directory_id", parent_id))
                .fetch_one()?;

            if let Some(directory) = directory {
                if index == last {
                    return Ok(Some(Entity::Directory(directory)));
                }
                parent_id = Some(directory.id);
                continue;
            }

            if index == last {
                let file = self
                    .session
                    .query::<File>()
                    .select()
                    .filter(Constraint::is("name", *name))
                    .filter(Constraint::is("directory_id", parent_id))
                    .fetch_one()?;
                return Ok(file.map(Entity::File));
            }

            return Ok(None);
        }

        Ok(None)
    }

    /// Resolve a logical path to a staging file, a metadata entity, or a
    /// prospective `temp/` location, in that order of precedence. A staging
    /// file wins over committed content so an in-flight write is visible
    /// immediately.
    pub fn resolve_path(&self, path: &str) -> Result<Resolved> {
        let temp_path = self.temp_path(path);

        if temp_path.is_file() || temp_path == self.temp {
            return Ok(Resolved::Temp(temp_path));
        }

        match self.resolve_entity(path)? {
            Some(Entity::File(file)) => Ok(Resolved::File(file)),
            Some(Entity::Directory(directory)) => Ok(Resolved::Directory(directory)),
            None => Ok(Resolved::Temp(temp_path)),
        }
    }

    /// The filenode a file currently points at. A missing filenode is a
    /// broken referential invariant.
    pub fn filenode_of(&self, file: &File) -> Result<Filenode> {
        file.filenode(&self.session)?.ok_or_else(|| {
            FsError::Invariant(format!(
                "file '{}' (id {}) references missing filenode {}",
                file.name, file.id, file.filenode_id
            ))
        })
    }

    /// Path of the blob backing a file's current filenode.
    pub fn blob_path_for(&self, file: &File) -> Result<PathBuf> {
        let node = self.filenode_of(file)?;
        Ok(self.blobs.blob_path(&node.hash))
    }

    // ---- writable-handle tracking -------------------------------------

    /// Record a handle as writable, so release knows to promote it.
    pub fn track_writable(&mut self, fd: RawFd) {
        self.writable_handles.insert(fd);
    }

    /// Forget a handle; returns whether it was tracked as writable.
    pub fn untrack_writable(&mut self, fd: RawFd) -> bool {
        self.writable_handles.remove(&fd)
    }

    pub fn is_writable(&self, fd: RawFd) -> bool {
        self.writable_handles.contains(&fd)
    }

    // ---- filenode lifecycle -------------------------------------------

    /// Delete a filenode row, optionally its whole history chain first, and
    /// collect its blob if the hash lost its last referrer.
    pub fn unlink_filenode(&self, node: &Filenode, recursively: bool) -> Result<()> {
        if recursively {
            if let Some(previous) = node.previous(&self.session)? {
                self.unlink_filenode(&previous, recursively)?;
            }
        }

        self.session
            .query::<Filenode>()
            .delete()
            .filter(Constraint::is("id", node.id))
            .execute()?;

        self.collect_blob(&node.hash)?;
        Ok(())
    }

    /// Delete a file row together with its entire filenode history.
    pub fn unlink_file(&self, file: &File) -> Result<()> {
        let node = self.filenode_of(file)?;

        self.session
            .query::<File>()
            .delete()
            .filter(Constraint::is("id", file.id))
            .execute()?;

        self.unlink_filenode(&node, true)
    }

    /// Remove the blob behind `hash` once no filenode references it.
    ///
    /// The referrer check and the deletion happen within one dispatch step;
    /// the empty sentinel never has a blob and is never collected.
    pub(crate) fn collect_blob(&self, hash: &str) -> Result<()> {
        if hash == self.empty_hash() {
            return Ok(());
        }

        let referenced = self
            .session
            .query::<Filenode>()
            .select()
            .filter(Constraint::is("hash", hash))
            .exists()?;

        if !referenced {
            self.blobs.remove(hash)?;
        }

        Ok(())
    }

    /// Snapshot a file's current filenode as immutable history.
    ///
    /// A new filenode with identical content identity is inserted, chained
    /// to the old one, and the file is repointed at it.
    pub fn commit(&self, path: &str) -> Result<()> {
        let file = self.resolve_file(path)?;
        let node = self.filenode_of(&file)?;

        let new_id = self
            .session
            .query::<Filenode>()
            .insert(vec![
                Assignment::new("hash", node.hash.clone()),
                Assignment::new("ctime", node.ctime),
                Assignment::new("atime", node.atime),
                Assignment::new("mtime", node.mtime),
                Assignment::new("size", node.size),
                Assignment::new("previous_filenode_id", node.id),
            ])
            .last_row_id()?;

        self.session
            .query::<File>()
            .update(vec![Assignment::new("filenode_id", new_id)])
            .filter(Constraint::is("id", file.id))
            .execute()?;

        debug!(path, filenode = new_id, "committed snapshot");
        Ok(())
    }

    /// Abandon a file's head filenode and repoint at its predecessor.
    ///
    /// History beyond the abandoned head is preserved; its blob is collected
    /// if the hash lost its last referrer. Without a predecessor this is a
    /// no-op.
    pub fn rollback(&self, path: &str) -> Result<()> {
        let file = self.resolve_file(path)?;
        let node = self.filenode_of(&file)?;

        let Some(previous) = node.previous(&self.session)? else {
            debug!(path, "rollback with no previous version, nothing to do");
            return Ok(());
        };

        self.session
            .query::<File>()
            .update(vec![Assignment::new("filenode_id", previous.id)])
            .filter(Constraint::is("id", file.id))
            .execute()?;

        self.unlink_filenode(&node, false)?;

        debug!(path, filenode = previous.id, "rolled back to previous version");
        Ok(())
    }

    /// Recursively delete a directory: subdirectories depth-first, then
    /// contained files (maintaining blob refcounts), then the row itself.
    pub fn remove_directory_tree(&self, directory: &Directory) -> Result<()> {
        for child in directory.subdirectories(&self.session)? {
            self.remove_directory_tree(&child)?;
        }

        for file in directory.files(&self.session)? {
            self.unlink_file(&file)?;
        }

        self.session
            .query::<Directory>()
            .delete()
            .filter(Constraint::is("id", directory.id))
            .execute()?;

        Ok(())
    }

    /// The directory id a new entry under `parent_path` would belong to;
    /// `None` for the root.
    pub fn resolve_parent_id(&self, parent_path: &str) -> Result<Option<i64>> {
        match self.resolve_entity(parent_path)? {
            Some(Entity::Directory(directory)) => Ok(Some(directory.id)),
            Some(Entity::File(_)) => Err(FsError::AccessDenied(parent_path.to_string())),
            None if paths::is_root(parent_path) => Ok(None),
            None => Err(FsError::NotFound(parent_path.to_string())),
        }
    }

    fn resolve_file(&self, path: &str) -> Result<File> {
        match self.resolve_entity(path)? {
            Some(Entity::File(file)) => Ok(file),
            _ => Err(FsError::NotFound(path.to_string())),
        }
    }
}

/// Remove empty directory subtrees, keeping anything that still holds files.
/// Failures are ignored; a directory that refuses to go away is simply kept.
fn remove_empty_directories(path: &Path) {
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let child = entry.path();
            if child.is_dir() {
                remove_empty_directories(&child);
            }
        }
    }

    let _ = fs::remove_dir(path);
}
