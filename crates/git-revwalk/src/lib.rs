//! Commit traversal over an object database, accelerated by the
//! commit-graph when one is present.
//!
//! The [`RevWalk`] iterator yields commits in commit-time-descending or
//! topological order. Commit headers (tree, parents, commit time,
//! generation) are resolved through [`HeaderSource`], which prefers the
//! graph and falls back to parsing raw commit objects, so enabling the
//! graph never changes a traversal's output. Filters that need the commit
//! message fetch the raw object on demand through the same fallback path.

mod merge_base;
mod source;
mod walk;
pub mod config;

pub use config::{open_graph, parse_bool, GraphSettings};
pub use merge_base::{is_ancestor, merge_base, merge_base_one};
pub use source::{CommitMeta, HeaderSource};
pub use walk::{RevWalk, SortOrder, WalkOptions};

use git_hash::ObjectId;

/// Errors produced by revision walking.
#[derive(Debug, thiserror::Error)]
pub enum RevWalkError {
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
