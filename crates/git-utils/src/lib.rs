//! Foundation utilities for the gitcg commit-graph library.
//!
//! Progress reporting with cancellation, atomically-replaceable temp files,
//! and the shared error plumbing used by the other crates.

pub mod error;
pub mod progress;
pub mod tempfile;

pub use error::UtilError;

pub type Result<T> = std::result::Result<T, UtilError>;
