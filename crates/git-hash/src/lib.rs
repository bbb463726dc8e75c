//! Object identity and hashing for the gitcg commit-graph library.
//!
//! Provides the core `ObjectId` type, hex encoding/decoding, streaming hash
//! computation, and the 256-entry fan-out table shared by hash-indexed file
//! formats.

mod error;
pub mod hex;
mod algorithm;
mod oid;
pub mod hasher;
pub mod fanout;

pub use algorithm::HashAlgorithm;
pub use error::HashError;
pub use fanout::FanoutTable;
pub use oid::ObjectId;
