//! Commit-graph file reading and writing.
//!
//! The commit-graph is an auxiliary, regenerable index over the commit
//! objects of a repository. It maps each commit id to an integer position in
//! a chunked binary file and answers, in O(1) from that position, the
//! commit's root tree id, committer timestamp, parent positions, and
//! generation number (longest-path distance from a root commit). Traversal
//! code queries the graph instead of parsing raw commit objects and falls
//! back transparently when the file is absent or stale.
//!
//! File layout:
//!
//! ```text
//! 0      "CGPH" signature
//! 4      u8 version (1)
//! 5      u8 hash kind (1 = 20-byte SHA-1)
//! 6      u8 chunk-kind count (reserved)
//! 7      u8 present-chunk count C
//! 8      (C+1) × 12-byte chunk directory: (u32 id, u64 offset),
//!        terminated by a zero id pointing at the trailing checksum
//! ...    chunks in directory order: OIDF, OIDL, CDAT, optional EDGE
//! end-20 SHA-1 over all preceding bytes
//! ```

mod chunk;
mod graph;
pub mod maintenance;
mod write;

pub use graph::{CommitData, CommitGraph};
pub use maintenance::graph_file_path;
pub use write::GraphWriter;

use git_hash::{HashError, ObjectId};
use git_odb::OdbError;

/// File signature bytes.
pub const GRAPH_SIGNATURE: &[u8; 4] = b"CGPH";

/// The single supported file format version.
pub const GRAPH_VERSION: u8 = 1;

/// Hash-kind byte for 20-byte SHA-1 ids, the only kind this format carries.
pub const HASH_KIND_SHA1: u8 = 1;

/// Largest representable generation number (30 bits).
pub const GENERATION_NUMBER_MAX: u32 = 0x3FFF_FFFF;

/// Generation sentinel for commits whose ancestry is not fully known.
pub const GENERATION_UNKNOWN: u32 = 0;

/// Parent-slot sentinel: no parent in this slot.
pub(crate) const PARENT_NONE: u32 = 0x7000_0000;

/// High bit of the second parent slot: remaining bits are an extra-edge
/// list offset rather than a position.
pub(crate) const PARENT_EXTRA_EDGE: u32 = 0x8000_0000;

/// High bit of an extra-edge entry: this entry ends the parent list.
pub(crate) const EDGE_LAST: u32 = 0x8000_0000;

/// Commit times occupy the low 34 bits of the packed generation/time field.
pub(crate) const COMMIT_TIME_MASK: u64 = (1 << 34) - 1;
pub(crate) const GENERATION_SHIFT: u32 = 34;

/// Bytes per record in the commit-data chunk: tree (20) + two parent slots
/// (4 each) + packed generation/time (8).
pub(crate) const COMMIT_DATA_ENTRY_SIZE: usize = 36;

pub(crate) const HASH_LEN: usize = 20;
pub(crate) const HEADER_SIZE: usize = 8;
pub(crate) const TOC_ENTRY_SIZE: usize = 12;
pub(crate) const TRAILER_SIZE: usize = 20;

/// Errors produced by commit-graph reading and writing.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("malformed commit-graph: {0}")]
    Malformed(String),

    #[error("unsupported commit-graph version: {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported commit-graph hash kind: {0}")]
    UnsupportedHashKind(u8),

    #[error("commit-graph checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("missing commit object: {0}")]
    MissingObject(ObjectId),

    #[error("commit-graph write cancelled")]
    Cancelled,

    #[error(transparent)]
    Odb(#[from] OdbError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Util(#[from] git_utils::UtilError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
