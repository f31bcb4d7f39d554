//! Error taxonomy surfaced to callers of the operations layer.

use thiserror::Error;

/// The closed set of failures an operation can report.
///
/// Operations do not retry; invariant violations abort the current operation
/// and are surfaced rather than masked.
#[derive(Error, Debug)]
pub enum FsError {
    /// The path resolves to neither a metadata entity nor a usable staging
    /// file, and the operation requires one.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// A host access check failed, or the operation would shadow an
    /// existing name.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The verb is declared not implemented.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// An internal invariant broke; this is a programming error.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Host-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata-store failure, surfaced unmodified.
    #[error(transparent)]
    Meta(#[from] qfs_meta::MetaError),
}

impl From<qfs_cas::CasError> for FsError {
    fn from(error: qfs_cas::CasError) -> Self {
        match error {
            qfs_cas::CasError::Io(inner) => FsError::Io(inner),
            qfs_cas::CasError::NotFound { hash } => {
                FsError::Invariant(format!("blob missing for referenced hash '{hash}'"))
            }
        }
    }
}

impl FsError {
    /// Map the taxonomy onto an errno for the kernel protocol adapter.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::AccessDenied(_) => libc::EACCES,
            FsError::Unsupported(_) => libc::ENOSYS,
            FsError::Invariant(_) => libc::EIO,
            FsError::Io(error) => error.raw_os_error().unwrap_or(libc::EIO),
            FsError::Meta(_) => libc::EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_covers_the_taxonomy() {
        assert_eq!(FsError::NotFound("/x".into()).errno(), libc::ENOENT);
        assert_eq!(FsError::AccessDenied("/x".into()).errno(), libc::EACCES);
        assert_eq!(FsError::Unsupported("chmod").errno(), libc::ENOSYS);
        assert_eq!(FsError::Invariant("broken".into()).errno(), libc::EIO);

        let io = FsError::Io(std::io::Error::from_raw_os_error(libc::EBADF));
        assert_eq!(io.errno(), libc::EBADF);
    }
}
