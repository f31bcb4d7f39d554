//! # qfs-core
//!
//! The QueryFS core: a hierarchical namespace over a content-addressed blob
//! store, mediated by a relational metadata layer.
//!
//! [`Repository`] owns the on-disk layout (`temp/`, `blobs/`, the metadata
//! file) and resolves logical paths. The [`ops`] module implements the
//! filesystem verbs over it; [`QueryFs`] is the dispatch surface a kernel
//! protocol adapter talks to, with a read-through attribute cache in front
//! of the lookup verbs.

pub mod attrs;
pub mod cache;
pub mod error;
pub mod facade;
mod fd;
pub mod ops;
pub mod paths;
pub mod repository;

pub use attrs::{FileAttributes, FsStatistics};
pub use cache::AttrCache;
pub use error::{FsError, Result};
pub use facade::QueryFs;
pub use repository::{Entity, Repository, Resolved};
