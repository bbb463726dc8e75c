//! Commit object model for the gitcg commit-graph library.
//!
//! Provides the `Commit` type with parsing from and serialization to the
//! canonical object format, signature/date handling, and an LRU cache for
//! parsed commits. Trees and blobs are opaque ids at this layer; the graph
//! core never inspects their content.

mod commit;
pub mod cache;

pub use commit::{Commit, SigDate, Signature};

use git_hash::HashError;

/// Errors produced by object parsing and serialization.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The four kinds of objects an object database stores.
///
/// The graph layer only ever materializes commits; the other kinds exist so
/// the database can say "that id names a tree" instead of pretending the
/// object is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    /// The canonical name used in object headers.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_names() {
        assert_eq!(ObjectType::Commit.name(), "commit");
        assert_eq!(ObjectType::Tree.name(), "tree");
        assert_eq!(ObjectType::Blob.to_string(), "blob");
        assert_eq!(ObjectType::Tag.to_string(), "tag");
    }
}
