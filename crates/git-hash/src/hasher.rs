use crate::{HashAlgorithm, HashError, ObjectId};

enum State {
    Sha1(Box<sha1_checked::Sha1>),
    Sha256(sha2::Sha256),
}

/// Rolling content hash over a byte stream.
///
/// Both ends of the graph file format funnel through this type: the writer
/// folds every emitted byte into one `Hasher` and seals the result as the
/// file trailer, and the reader re-hashes the payload to verify that
/// trailer. SHA-1 runs with collision detection.
///
/// The hasher also counts the bytes it has seen ([`position`](Hasher::position)),
/// which lets a serializer check its precomputed layout against what was
/// actually written before sealing the checksum.
pub struct Hasher {
    state: State,
    fed: u64,
}

impl Hasher {
    /// Create a new hasher for the given algorithm.
    pub fn new(algo: HashAlgorithm) -> Self {
        use digest::Digest;
        let state = match algo {
            HashAlgorithm::Sha1 => State::Sha1(Box::new(sha1_checked::Sha1::new())),
            HashAlgorithm::Sha256 => State::Sha256(sha2::Sha256::new()),
        };
        Self { state, fed: 0 }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        use digest::Digest;
        match &mut self.state {
            State::Sha1(h) => h.update(data),
            State::Sha256(h) => h.update(data),
        }
        self.fed += data.len() as u64;
    }

    /// Total number of bytes fed so far.
    pub fn position(&self) -> u64 {
        self.fed
    }

    /// Finalize and return the digest as an [`ObjectId`].
    ///
    /// Fails if SHA-1 collision detection fires.
    pub fn finalize(self) -> Result<ObjectId, HashError> {
        match self.state {
            State::Sha1(h) => {
                let result = h.try_finalize();
                if result.has_collision() {
                    return Err(HashError::Sha1Collision);
                }
                ObjectId::from_bytes(result.hash().as_slice(), HashAlgorithm::Sha1)
            }
            State::Sha256(h) => {
                use digest::Digest;
                ObjectId::from_bytes(h.finalize().as_slice(), HashAlgorithm::Sha256)
            }
        }
    }

    /// Convenience: hash a complete buffer in one call.
    pub fn digest(algo: HashAlgorithm, data: &[u8]) -> Result<ObjectId, HashError> {
        let mut h = Self::new(algo);
        h.update(data);
        h.finalize()
    }
}
