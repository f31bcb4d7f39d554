//! # qfs-cas
//!
//! Content-addressed blob storage for QueryFS.
//!
//! Blobs live in a single flat directory; a blob's file name is the
//! lowercase hex SHA-256 digest of its bytes. Identical content therefore
//! collapses into one on-disk file regardless of how many namespace entries
//! reference it.
//!
//! The empty byte sequence is special: its digest acts as a sentinel meaning
//! "no blob required" and is never written to the store.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Chunk size for streaming file hashing.
const HASH_CHUNK_SIZE: usize = 4096;

/// Errors that can occur during blob store operations.
#[derive(Error, Debug)]
pub enum CasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob not found: {hash}")]
    NotFound { hash: String },
}

pub type Result<T> = std::result::Result<T, CasError>;

/// Compute the lowercase hex SHA-256 digest of a byte buffer.
pub fn hash_bytes(buffer: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    hex::encode(hasher.finalize())
}

/// Compute the lowercase hex SHA-256 digest of a file, streamed in 4 KiB
/// chunks so arbitrarily large files hash in constant memory.
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; HASH_CHUNK_SIZE];

    loop {
        let count = file.read(&mut chunk)?;
        if count == 0 {
            break;
        }
        hasher.update(&chunk[..count]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Flat content-addressed blob store.
///
/// The store owns its root directory. A blob is retained for as long as the
/// caller keeps a reference to its hash; reference counting happens above
/// this layer.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    empty_hash: String,
}

impl BlobStore {
    /// Open a blob store at the given root directory, creating it if absent.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            empty_hash: hash_bytes(&[]),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The memoised digest of the empty byte sequence.
    pub fn empty_hash(&self) -> &str {
        &self.empty_hash
    }

    /// The path where a blob with the given hash is (or would be) stored.
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    /// Whether a blob with the given hash exists in the store.
    pub fn contains(&self, hash: &str) -> bool {
        self.blob_path(hash).is_file()
    }

    /// Move a fully written staging file into the store under `hash`.
    ///
    /// The staging file is consumed either way: renamed into the store, or
    /// removed when an identical blob already exists (deduplication) or when
    /// `hash` is the empty sentinel (empty content never becomes a blob).
    pub fn promote(&self, staging: &Path, hash: &str) -> Result<()> {
        if hash == self.empty_hash || self.contains(hash) {
            debug!(?staging, hash, "discarding staging file, blob not needed");
            fs::remove_file(staging)?;
        } else {
            debug!(?staging, hash, "promoting staging file to blob");
            fs::rename(staging, self.blob_path(hash))?;
        }

        Ok(())
    }

    /// Remove the blob with the given hash.
    ///
    /// Removal is idempotent: a missing blob is not an error, so collection
    /// can be retried safely. The empty sentinel never has a backing file.
    pub fn remove(&self, hash: &str) -> Result<()> {
        let path = self.blob_path(hash);

        if path.is_file() {
            debug!(hash, "removing blob");
            fs::remove_file(path)?;
        }

        Ok(())
    }

    /// Read a whole blob into memory.
    pub fn read(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(hash);
        if !path.is_file() {
            return Err(CasError::NotFound {
                hash: hash.to_string(),
            });
        }

        Ok(fs::read(path)?)
    }

    /// Count and total size of all blobs in the store.
    pub fn stats(&self) -> Result<CasStats> {
        let mut stats = CasStats::default();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                stats.blob_count += 1;
                stats.total_bytes += entry.metadata()?.len();
            }
        }

        Ok(stats)
    }
}

/// Statistics about a blob store.
#[derive(Debug, Clone, Copy, Default)]
pub struct CasStats {
    /// Number of unique blobs stored.
    pub blob_count: u64,
    /// Total bytes stored (after deduplication).
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn stage(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn hash_bytes_known_vector() {
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn empty_hash_matches_sentinel() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();

        assert_eq!(hash_bytes(&[]), EMPTY_SHA256);
        assert_eq!(store.empty_hash(), EMPTY_SHA256);
    }

    #[test]
    fn hash_file_matches_hash_bytes() {
        let temp = TempDir::new().unwrap();
        // larger than one chunk to exercise streaming
        let data = vec![0xabu8; 10_000];
        let path = stage(temp.path(), "input", &data);

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn promote_moves_staging_into_store() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();
        let staging = stage(temp.path(), "staging", b"hello");
        let hash = hash_file(&staging).unwrap();

        store.promote(&staging, &hash).unwrap();

        assert!(!staging.exists());
        assert!(store.contains(&hash));
        assert_eq!(store.read(&hash).unwrap(), b"hello");
    }

    #[test]
    fn promote_deduplicates_identical_content() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();

        let first = stage(temp.path(), "first", b"same bytes");
        let hash = hash_file(&first).unwrap();
        store.promote(&first, &hash).unwrap();

        let second = stage(temp.path(), "second", b"same bytes");
        store.promote(&second, &hash).unwrap();

        assert!(!second.exists());
        assert_eq!(store.stats().unwrap().blob_count, 1);
    }

    #[test]
    fn promote_discards_empty_content() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();
        let staging = stage(temp.path(), "empty", b"");
        let hash = hash_file(&staging).unwrap();

        store.promote(&staging, &hash).unwrap();

        assert!(!staging.exists());
        assert!(!store.contains(&hash));
        assert_eq!(store.stats().unwrap().blob_count, 0);
    }

    #[test]
    fn remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();
        let staging = stage(temp.path(), "staging", b"data");
        let hash = hash_file(&staging).unwrap();
        store.promote(&staging, &hash).unwrap();

        store.remove(&hash).unwrap();
        store.remove(&hash).unwrap();

        assert!(!store.contains(&hash));
    }

    #[test]
    fn read_missing_blob_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();

        let result = store.read("0000000000000000000000000000000000000000000000000000000000000000");
        assert!(matches!(result, Err(CasError::NotFound { .. })));
    }

    #[test]
    fn stats_counts_blobs_and_bytes() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).unwrap();

        for (name, data) in [("a", &b"one"[..]), ("b", &b"three"[..])] {
            let staging = stage(temp.path(), name, data);
            let hash = hash_file(&staging).unwrap();
            store.promote(&staging, &hash).unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.blob_count, 2);
        assert_eq!(stats.total_bytes, 8);
    }
}
