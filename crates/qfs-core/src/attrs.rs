//! Attribute and filesystem-statistics views returned by the lookup verbs.

use std::os::unix::fs::MetadataExt;

use qfs_meta::Filenode;

/// Stat-shaped attributes of a resolved path.
///
/// For committed files, the host stat of the backing blob is overlaid with
/// the metadata-stored times and size so callers see the logical values, not
/// the blob file's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileAttributes {
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: i64,
    pub atime: f64,
    pub mtime: f64,
    pub ctime: f64,
}

impl FileAttributes {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            mode: metadata.mode(),
            nlink: metadata.nlink(),
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size() as i64,
            atime: metadata.atime() as f64 + metadata.atime_nsec() as f64 * 1e-9,
            mtime: metadata.mtime() as f64 + metadata.mtime_nsec() as f64 * 1e-9,
            ctime: metadata.ctime() as f64 + metadata.ctime_nsec() as f64 * 1e-9,
        }
    }

    /// Replace times and size with the logical values from a filenode.
    pub fn overlay(mut self, node: &Filenode) -> Self {
        self.atime = node.atime;
        self.mtime = node.mtime;
        self.ctime = node.ctime;
        self.size = node.size;
        self
    }

    pub fn is_directory(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFDIR as u32
    }
}

/// Block and inode counters of the filesystem backing a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStatistics {
    pub block_size: u64,
    pub fragment_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
    pub files_available: u64,
    pub flags: u64,
    pub name_max: u64,
}

impl FsStatistics {
    pub(crate) fn from_statvfs(stats: &libc::statvfs) -> Self {
        Self {
            block_size: stats.f_bsize as u64,
            fragment_size: stats.f_frsize as u64,
            blocks: stats.f_blocks as u64,
            blocks_free: stats.f_bfree as u64,
            blocks_available: stats.f_bavail as u64,
            files: stats.f_files as u64,
            files_free: stats.f_ffree as u64,
            files_available: stats.f_favail as u64,
            flags: stats.f_flag as u64,
            name_max: stats.f_namemax as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn attributes_reflect_host_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        std::fs::write(&path, b"12345").unwrap();

        let attrs = FileAttributes::from_metadata(&std::fs::metadata(&path).unwrap());
        assert_eq!(attrs.size, 5);
        assert!(!attrs.is_directory());

        let dir_attrs = FileAttributes::from_metadata(&std::fs::metadata(temp.path()).unwrap());
        assert!(dir_attrs.is_directory());
    }

    #[test]
    fn overlay_takes_logical_times_and_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        std::fs::write(&path, b"12345").unwrap();

        let node = Filenode {
            id: 1,
            hash: "ff".repeat(32),
            ctime: 10.0,
            atime: 20.0,
            mtime: 30.0,
            size: 99,
            previous_filenode_id: None,
        };

        let attrs = FileAttributes::from_metadata(&std::fs::metadata(&path).unwrap()).overlay(&node);
        assert_eq!(attrs.size, 99);
        assert_eq!(attrs.atime, 20.0);
        assert_eq!(attrs.mtime, 30.0);
        assert_eq!(attrs.ctime, 10.0);
    }
}
