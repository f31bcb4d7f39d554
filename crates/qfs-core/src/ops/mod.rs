//! Filesystem verbs over the repository.
//!
//! Each operation consumes the repository plus the protocol arguments and
//! reports failures through the closed [`FsError`](crate::FsError) set. Open
//! file handles are opaque kernel integers; the repository's writable set
//! decides whether a release promotes staged content.

mod access;
mod create;
mod flush;
mod getattr;
mod mkdir;
mod open;
mod read;
mod readdir;
mod release;
mod rename;
mod rmdir;
mod statfs;
mod truncate;
mod unlink;
mod write;

pub use access::access;
pub use create::create;
pub use flush::{flush, fsync};
pub use getattr::getattr;
pub use mkdir::mkdir;
pub use open::open;
pub use read::read;
pub use readdir::readdir;
pub use release::release;
pub use rename::rename;
pub use rmdir::rmdir;
pub use statfs::statfs;
pub use truncate::truncate;
pub use unlink::unlink;
pub use write::write;
