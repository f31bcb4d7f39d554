//! # qfs-fuse
//!
//! FUSE adapter for QueryFS.
//!
//! Maps the kernel's inode-based protocol onto the path-based dispatch
//! surface of `qfs-core`:
//! - Inodes are assigned lazily as paths are looked up.
//! - File handles pass straight through; they are the repository's raw
//!   kernel descriptors.
//! - Errors translate via `FsError::errno`.
//!
//! Verbs the core declares unsupported (chmod, chown, xattrs, links,
//! utimens, mknod) are left to fuser's defaults, which reply `ENOSYS`.

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod imp {
    use std::collections::HashMap;
    use std::ffi::OsStr;
    use std::os::unix::io::RawFd;
    use std::path::Path;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use fuser::{
        FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData,
        ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
        TimeOrNow,
    };
    use libc::{ENOENT, ENOSYS};
    use qfs_core::{FileAttributes, QueryFs};
    use tracing::debug;

    const TTL: Duration = Duration::from_secs(1);
    const BLOCK_SIZE: u64 = 4096;
    const ROOT_INODE: u64 = 1;

    pub struct QueryFsMount {
        fs: QueryFs,
        inode_paths: HashMap<u64, String>,
        path_inodes: HashMap<String, u64>,
        next_inode: u64,
    }

    impl QueryFsMount {
        pub fn new(fs: QueryFs) -> Self {
            let mut mount = Self {
                fs,
                inode_paths: HashMap::new(),
                path_inodes: HashMap::new(),
                next_inode: ROOT_INODE + 1,
            };
            mount.inode_paths.insert(ROOT_INODE, "/".to_string());
            mount.path_inodes.insert("/".to_string(), ROOT_INODE);
            mount
        }

        fn inode_for(&mut self, path: &str) -> u64 {
            if let Some(ino) = self.path_inodes.get(path) {
                return *ino;
            }

            let ino = self.next_inode;
            self.next_inode += 1;
            self.inode_paths.insert(ino, path.to_string());
            self.path_inodes.insert(path.to_string(), ino);
            ino
        }

        fn path_of(&self, ino: u64) -> Option<String> {
            self.inode_paths.get(&ino).cloned()
        }

        fn child_path(&self, parent: u64, name: &OsStr) -> Option<String> {
            let parent_path = self.inode_paths.get(&parent)?;
            let name = name.to_str()?;
            Some(if parent_path == "/" {
                format!("/{name}")
            } else {
                format!("{parent_path}/{name}")
            })
        }

        /// Drop the mapping for a path and everything beneath it.
        fn forget_path(&mut self, path: &str) {
            let prefix = format!("{path}/");
            let doomed: Vec<String> = self
                .path_inodes
                .keys()
                .filter(|known| known.as_str() == path || known.starts_with(&prefix))
                .cloned()
                .collect();

            for known in doomed {
                if let Some(ino) = self.path_inodes.remove(&known) {
                    self.inode_paths.remove(&ino);
                }
            }
        }

        /// Rewrite mappings after a rename so live inodes keep resolving.
        fn remap_path(&mut self, old: &str, new: &str) {
            let prefix = format!("{old}/");
            let moved: Vec<(String, u64)> = self
                .path_inodes
                .iter()
                .filter(|(known, _)| known.as_str() == old || known.starts_with(&prefix))
                .map(|(known, ino)| (known.clone(), *ino))
                .collect();

            for (known, ino) in moved {
                self.path_inodes.remove(&known);
                let renamed = format!("{new}{}", &known[old.len()..]);
                self.inode_paths.insert(ino, renamed.clone());
                self.path_inodes.insert(renamed, ino);
            }
        }

        fn to_fuse_attr(ino: u64, attrs: &FileAttributes) -> FileAttr {
            let size = attrs.size.max(0) as u64;
            FileAttr {
                ino,
                size,
                blocks: size.div_ceil(BLOCK_SIZE),
                atime: timestamp(attrs.atime),
                mtime: timestamp(attrs.mtime),
                ctime: timestamp(attrs.ctime),
                crtime: timestamp(attrs.ctime),
                kind: if attrs.is_directory() {
                    FileType::Directory
                } else {
                    FileType::RegularFile
                },
                perm: (attrs.mode & 0o7777) as u16,
                nlink: attrs.nlink as u32,
                uid: attrs.uid,
                gid: attrs.gid,
                rdev: 0,
                flags: 0,
                blksize: BLOCK_SIZE as u32,
            }
        }

        /// The core treats `flags == 0` as read-only; strip incidental bits
        /// from read-only opens so they are not mistaken for write intent.
        fn normalize_flags(flags: i32) -> i32 {
            if flags & libc::O_ACCMODE == libc::O_RDONLY {
                0
            } else {
                flags
            }
        }
    }

    fn timestamp(seconds: f64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs_f64(seconds.max(0.0))
    }

    impl Filesystem for QueryFsMount {
        fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
            let Some(path) = self.child_path(parent, name) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.getattr(&path, None) {
                Ok(attrs) => {
                    let ino = self.inode_for(&path);
                    reply.entry(&TTL, &Self::to_fuse_attr(ino, &attrs), 0);
                }
                Err(error) => reply.error(error.errno()),
            }
        }

        fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.getattr(&path, None) {
                Ok(attrs) => reply.attr(&TTL, &Self::to_fuse_attr(ino, &attrs)),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn setattr(
            &mut self,
            _req: &Request,
            ino: u64,
            mode: Option<u32>,
            uid: Option<u32>,
            gid: Option<u32>,
            size: Option<u64>,
            atime: Option<TimeOrNow>,
            mtime: Option<TimeOrNow>,
            _ctime: Option<SystemTime>,
            fh: Option<u64>,
            _crtime: Option<SystemTime>,
            _chgtime: Option<SystemTime>,
            _bkuptime: Option<SystemTime>,
            _flags: Option<u32>,
            reply: ReplyAttr,
        ) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            if let Some(length) = size {
                let fh = fh.map(|fh| fh as RawFd);
                if let Err(error) = self.fs.truncate(&path, length as i64, fh) {
                    reply.error(error.errno());
                    return;
                }
            } else if mode.is_some()
                || uid.is_some()
                || gid.is_some()
                || atime.is_some()
                || mtime.is_some()
            {
                // chmod/chown/utimens are declared unsupported
                reply.error(ENOSYS);
                return;
            }

            match self.fs.getattr(&path, None) {
                Ok(attrs) => reply.attr(&TTL, &Self::to_fuse_attr(ino, &attrs)),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn mkdir(
            &mut self,
            _req: &Request,
            parent: u64,
            name: &OsStr,
            mode: u32,
            _umask: u32,
            reply: ReplyEntry,
        ) {
            let Some(path) = self.child_path(parent, name) else {
                reply.error(ENOENT);
                return;
            };

            if let Err(error) = self.fs.mkdir(&path, mode) {
                reply.error(error.errno());
                return;
            }

            match self.fs.getattr(&path, None) {
                Ok(attrs) => {
                    let ino = self.inode_for(&path);
                    reply.entry(&TTL, &Self::to_fuse_attr(ino, &attrs), 0);
                }
                Err(error) => reply.error(error.errno()),
            }
        }

        fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
            let Some(path) = self.child_path(parent, name) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.rmdir(&path) {
                Ok(()) => {
                    self.forget_path(&path);
                    reply.ok();
                }
                Err(error) => reply.error(error.errno()),
            }
        }

        fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
            let Some(path) = self.child_path(parent, name) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.unlink(&path) {
                Ok(()) => {
                    self.forget_path(&path);
                    reply.ok();
                }
                Err(error) => reply.error(error.errno()),
            }
        }

        fn rename(
            &mut self,
            _req: &Request,
            parent: u64,
            name: &OsStr,
            newparent: u64,
            newname: &OsStr,
            _flags: u32,
            reply: ReplyEmpty,
        ) {
            let (Some(old), Some(new)) = (
                self.child_path(parent, name),
                self.child_path(newparent, newname),
            ) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.rename(&old, &new) {
                Ok(()) => {
                    self.remap_path(&old, &new);
                    reply.ok();
                }
                Err(error) => reply.error(error.errno()),
            }
        }

        fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.open(&path, Self::normalize_flags(flags)) {
                Ok(fd) => reply.opened(fd as u64, 0),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn create(
            &mut self,
            _req: &Request,
            parent: u64,
            name: &OsStr,
            mode: u32,
            _umask: u32,
            _flags: i32,
            reply: ReplyCreate,
        ) {
            let Some(path) = self.child_path(parent, name) else {
                reply.error(ENOENT);
                return;
            };

            let fd = match self.fs.create(&path, mode) {
                Ok(fd) => fd,
                Err(error) => {
                    reply.error(error.errno());
                    return;
                }
            };

            match self.fs.getattr(&path, None) {
                Ok(attrs) => {
                    let ino = self.inode_for(&path);
                    reply.created(&TTL, &Self::to_fuse_attr(ino, &attrs), 0, fd as u64, 0);
                }
                Err(error) => reply.error(error.errno()),
            }
        }

        fn read(
            &mut self,
            _req: &Request,
            ino: u64,
            fh: u64,
            offset: i64,
            size: u32,
            _flags: i32,
            _lock_owner: Option<u64>,
            reply: ReplyData,
        ) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.read(&path, size as usize, offset, fh as RawFd) {
                Ok(data) => reply.data(&data),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn write(
            &mut self,
            _req: &Request,
            ino: u64,
            fh: u64,
            offset: i64,
            data: &[u8],
            _write_flags: u32,
            _flags: i32,
            _lock_owner: Option<u64>,
            reply: ReplyWrite,
        ) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.write(&path, data, offset, fh as RawFd) {
                Ok(written) => reply.written(written as u32),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn flush(&mut self, _req: &Request, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.flush(&path, fh as RawFd) {
                Ok(()) => reply.ok(),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn fsync(&mut self, _req: &Request, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.fsync(&path, datasync, fh as RawFd) {
                Ok(()) => reply.ok(),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn release(
            &mut self,
            _req: &Request,
            ino: u64,
            fh: u64,
            _flags: i32,
            _lock_owner: Option<u64>,
            _flush: bool,
            reply: ReplyEmpty,
        ) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.release(&path, fh as RawFd) {
                Ok(()) => reply.ok(),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn readdir(
            &mut self,
            _req: &Request,
            ino: u64,
            _fh: u64,
            offset: i64,
            mut reply: ReplyDirectory,
        ) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            let entries = match self.fs.readdir(&path, None) {
                Ok(entries) => entries,
                Err(error) => {
                    reply.error(error.errno());
                    return;
                }
            };

            for (index, name) in entries.iter().enumerate().skip(offset as usize) {
                let (child_ino, kind) = match name.as_str() {
                    "." => (ino, FileType::Directory),
                    // parent inode is not tracked per entry; root works for
                    // the listing the kernel needs
                    ".." => (ROOT_INODE, FileType::Directory),
                    other => {
                        let child = if path == "/" {
                            format!("/{other}")
                        } else {
                            format!("{path}/{other}")
                        };
                        let kind = match self.fs.getattr(&child, None) {
                            Ok(attrs) if attrs.is_directory() => FileType::Directory,
                            _ => FileType::RegularFile,
                        };
                        (self.inode_for(&child), kind)
                    }
                };

                if reply.add(child_ino, (index + 1) as i64, kind, name) {
                    break;
                }
            }

            reply.ok();
        }

        fn access(&mut self, _req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.access(&path, mask) {
                Ok(()) => reply.ok(),
                Err(error) => reply.error(error.errno()),
            }
        }

        fn statfs(&mut self, _req: &Request, ino: u64, reply: ReplyStatfs) {
            let Some(path) = self.path_of(ino) else {
                reply.error(ENOENT);
                return;
            };

            match self.fs.statfs(&path) {
                Ok(stats) => reply.statfs(
                    stats.blocks,
                    stats.blocks_free,
                    stats.blocks_available,
                    stats.files,
                    stats.files_free,
                    stats.block_size as u32,
                    stats.name_max as u32,
                    stats.fragment_size as u32,
                ),
                Err(error) => reply.error(error.errno()),
            }
        }
    }

    /// Mount the filesystem and block until it is unmounted.
    pub fn mount(fs: QueryFs, mountpoint: &Path) -> std::io::Result<()> {
        debug!(mountpoint = %mountpoint.display(), "mounting queryfs");

        let options = [MountOption::FSName("queryfs".to_string())];
        fuser::mount2(QueryFsMount::new(fs), mountpoint, &options)
    }
}

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
mod imp {
    use std::path::Path;

    use qfs_core::QueryFs;

    /// Stub mount for builds without FUSE support.
    pub fn mount(_fs: QueryFs, _mountpoint: &Path) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "queryfs was built without FUSE support; rebuild with --features fuse on Linux",
        ))
    }
}

pub use imp::mount;
