use std::fmt;
use std::str::FromStr;

use crate::hex::{hex_decode, hex_to_string};
use crate::{HashAlgorithm, HashError};

/// An object identifier, the content hash of an object.
///
/// One variant per supported algorithm, digest bytes inline. The derived
/// ordering compares digest bytes lexicographically within an algorithm,
/// which is exactly the order hash-indexed files sort their id tables by;
/// the graph writer leans on that to assign positions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

/// Copy a slice into a fixed-size digest array, or report the length
/// mismatch.
fn digest_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], HashError> {
    <[u8; N]>::try_from(bytes).map_err(|_| HashError::InvalidHashLength {
        expected: N,
        actual: bytes.len(),
    })
}

impl ObjectId {
    /// Create an ObjectId from raw digest bytes and an algorithm.
    pub fn from_bytes(bytes: &[u8], algo: HashAlgorithm) -> Result<Self, HashError> {
        match algo {
            HashAlgorithm::Sha1 => Ok(Self::Sha1(digest_array(bytes)?)),
            HashAlgorithm::Sha256 => Ok(Self::Sha256(digest_array(bytes)?)),
        }
    }

    /// Create an ObjectId from a hex string; the algorithm is inferred from
    /// the length (40 chars → SHA-1, 64 chars → SHA-256).
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let algo = HashAlgorithm::from_hex_len(hex.len()).ok_or(HashError::InvalidHexLength {
            expected: 40,
            actual: hex.len(),
        })?;
        let mut buf = [0u8; 32];
        let raw = &mut buf[..algo.digest_len()];
        hex_decode(hex, raw)?;
        Self::from_bytes(raw, algo)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha1(b) => b,
            Self::Sha256(b) => b,
        }
    }

    /// The hash algorithm this id was produced by.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Sha1(_) => HashAlgorithm::Sha1,
            Self::Sha256(_) => HashAlgorithm::Sha256,
        }
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex_to_string(self.as_bytes())
    }

    /// First byte of the digest, the fan-out table bucket.
    pub fn first_byte(&self) -> u8 {
        self.as_bytes()[0]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
