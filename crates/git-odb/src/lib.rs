//! Object database access contract for the gitcg commit-graph library.
//!
//! The graph writer and the traversal layer both consume commits through the
//! [`OdbBackend`] trait; the concrete storage (loose files, packfiles,
//! alternates) lives behind it and is not this workspace's concern. A
//! [`MemoryOdb`] reference backend is provided for tests and embedders.

mod memory;

use git_hash::ObjectId;
use git_object::{Commit, ObjectType};

pub use memory::MemoryOdb;

/// Errors produced by object database access.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("object is not a commit: {0}")]
    NotACommit(ObjectId),

    #[error("corrupt object {oid}: {reason}")]
    Corrupt { oid: ObjectId, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lightweight object info (header only, no content).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// Read-side contract an object database presents to the graph layer.
///
/// `read_commit` is the `readCommit(hash)` collaborator operation: it yields
/// the commit's tree, parents, and timestamps, failing with
/// [`OdbError::NotFound`] for missing objects and [`OdbError::NotACommit`]
/// when the id names an object of another type.
pub trait OdbBackend: Send + Sync {
    /// Read and parse the commit with the given id.
    fn read_commit(&self, oid: &ObjectId) -> Result<Commit, OdbError>;

    /// Read just the type and size of an object, if it exists.
    fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError>;

    /// Whether an object with this id exists.
    fn contains(&self, oid: &ObjectId) -> bool;
}
