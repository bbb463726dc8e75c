//! Commit-graph file reader and query API.

use std::ops::Range;
use std::path::Path;

use git_hash::hasher::Hasher;
use git_hash::{FanoutTable, HashAlgorithm, ObjectId};
use memmap2::Mmap;

use crate::chunk::{
    ChunkDirectory, CHUNK_COMMIT_DATA, CHUNK_EXTRA_EDGES, CHUNK_OID_FANOUT, CHUNK_OID_LOOKUP,
};
use crate::{
    GraphError, COMMIT_DATA_ENTRY_SIZE, COMMIT_TIME_MASK, EDGE_LAST, GENERATION_SHIFT,
    GRAPH_SIGNATURE, GRAPH_VERSION, HASH_KIND_SHA1, HASH_LEN, HEADER_SIZE, PARENT_EXTRA_EDGE,
    PARENT_NONE, TOC_ENTRY_SIZE, TRAILER_SIZE,
};

/// Backing byte source: a mapped file for on-disk graphs, an owned buffer
/// for in-memory ones.
#[derive(Debug)]
enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => m,
            Self::Owned(v) => v,
        }
    }
}

/// Metadata record for one commit position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitData {
    /// OID of the commit's root tree.
    pub tree: ObjectId,
    /// Positions of the commit's parents, in order.
    pub parents: Vec<u32>,
    /// Generation number; [`GENERATION_UNKNOWN`](crate::GENERATION_UNKNOWN)
    /// when the ancestry was not fully known at write time.
    pub generation: u32,
    /// Committer timestamp, seconds since epoch (34-bit on disk).
    pub commit_time: i64,
}

/// A validated, immutable commit-graph file.
///
/// All structural validation happens at open; every query afterwards is
/// infallible and returns `None` for unknown ids or out-of-range positions.
/// The type holds no interior mutability and is safe to query from multiple
/// threads.
#[derive(Debug)]
pub struct CommitGraph {
    data: Backing,
    fanout: FanoutTable,
    num_commits: u32,
    lookup: Range<usize>,
    commit_data: Range<usize>,
    extra_edges: Option<Range<usize>>,
    checksum: ObjectId,
}

impl CommitGraph {
    /// Open and validate a commit-graph file via memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let file = std::fs::File::open(path.as_ref())?;
        let data = unsafe { Mmap::map(&file) }?;
        Self::from_backing(Backing::Mapped(data))
    }

    /// Parse and validate a commit-graph from an in-memory buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, GraphError> {
        Self::from_backing(Backing::Owned(bytes))
    }

    fn from_backing(data: Backing) -> Result<Self, GraphError> {
        let bytes = data.bytes();

        // Smallest well-formed file: header, empty directory, trailer.
        if bytes.len() < HEADER_SIZE + TOC_ENTRY_SIZE + TRAILER_SIZE {
            return Err(GraphError::Malformed("file too small".into()));
        }
        if &bytes[0..4] != GRAPH_SIGNATURE {
            return Err(GraphError::Malformed("invalid signature".into()));
        }
        let version = bytes[4];
        if version != GRAPH_VERSION {
            return Err(GraphError::UnsupportedVersion(version));
        }
        let hash_kind = bytes[5];
        if hash_kind != HASH_KIND_SHA1 {
            return Err(GraphError::UnsupportedHashKind(hash_kind));
        }
        // bytes[6] is the reserved chunk-kind count; ignored.
        let chunk_count = bytes[7] as usize;

        let directory = ChunkDirectory::parse(bytes, chunk_count)?;

        let fanout_bytes = directory
            .slice(bytes, CHUNK_OID_FANOUT)
            .ok_or_else(|| GraphError::Malformed("missing OID fanout chunk".into()))?;
        let fanout = FanoutTable::from_bytes(fanout_bytes)
            .map_err(|e| GraphError::Malformed(e.to_string()))?;
        let num_commits = fanout.total();
        let n = num_commits as usize;

        let lookup = directory
            .range_of(CHUNK_OID_LOOKUP)
            .ok_or_else(|| GraphError::Malformed("missing OID lookup chunk".into()))?;
        if lookup.len() != n * HASH_LEN {
            return Err(GraphError::Malformed(format!(
                "OID lookup chunk holds {} bytes, expected {} for {} commits",
                lookup.len(),
                n * HASH_LEN,
                n
            )));
        }

        let commit_data = directory
            .range_of(CHUNK_COMMIT_DATA)
            .ok_or_else(|| GraphError::Malformed("missing commit data chunk".into()))?;
        if commit_data.len() != n * COMMIT_DATA_ENTRY_SIZE {
            return Err(GraphError::Malformed(format!(
                "commit data chunk holds {} bytes, expected {} for {} commits",
                commit_data.len(),
                n * COMMIT_DATA_ENTRY_SIZE,
                n
            )));
        }

        let extra_edges = directory.range_of(CHUNK_EXTRA_EDGES);
        if let Some(ref edges) = extra_edges {
            if edges.len() % 4 != 0 {
                return Err(GraphError::Malformed(
                    "extra edge chunk size not a multiple of 4".into(),
                ));
            }
        }

        // The lookup table must be strictly ascending, with every id in the
        // fan-out bucket its first byte selects.
        for i in 1..n {
            let prev = &bytes[lookup.start + (i - 1) * HASH_LEN..lookup.start + i * HASH_LEN];
            let cur = &bytes[lookup.start + i * HASH_LEN..lookup.start + (i + 1) * HASH_LEN];
            if prev >= cur {
                return Err(GraphError::Malformed(format!(
                    "OID lookup not strictly ascending at position {i}"
                )));
            }
        }
        for bucket in 0..=255u8 {
            for i in fanout.range(bucket) {
                if bytes[lookup.start + i * HASH_LEN] != bucket {
                    return Err(GraphError::Malformed(format!(
                        "fan-out bucket {bucket:#04x} disagrees with OID at position {i}"
                    )));
                }
            }
        }

        // Trailing checksum covers everything before it.
        let trailer_start = bytes.len() - TRAILER_SIZE;
        let expected = ObjectId::from_bytes(&bytes[trailer_start..], HashAlgorithm::Sha1)?;
        let mut hasher = Hasher::new(HashAlgorithm::Sha1);
        hasher.update(&bytes[..trailer_start]);
        let actual = hasher.finalize()?;
        if actual != expected {
            return Err(GraphError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            data,
            fanout,
            num_commits,
            lookup,
            commit_data,
            extra_edges,
            checksum: expected,
        })
    }

    /// Number of commits indexed by this file.
    pub fn commit_count(&self) -> u32 {
        self.num_commits
    }

    /// The file's trailing checksum, which identifies this graph instance.
    pub fn checksum(&self) -> ObjectId {
        self.checksum
    }

    /// Position of the given commit id, or `None` if it is not indexed.
    ///
    /// Narrows to the id's fan-out bucket, then binary-searches within it.
    /// Exact match only.
    pub fn position_of(&self, oid: &ObjectId) -> Option<u32> {
        let target = oid.as_bytes();
        if target.len() != HASH_LEN {
            return None;
        }
        let range = self.fanout.range(oid.first_byte());

        let mut lo = range.start;
        let mut hi = range.end;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.oid_bytes_at(mid).cmp(target) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(mid as u32),
            }
        }
        None
    }

    /// Commit id at the given position, or `None` if out of range.
    pub fn oid_at(&self, position: u32) -> Option<ObjectId> {
        if position >= self.num_commits {
            return None;
        }
        let bytes = self.oid_bytes_at(position as usize);
        ObjectId::from_bytes(bytes, HashAlgorithm::Sha1).ok()
    }

    /// Metadata record at the given position, or `None` if out of range.
    ///
    /// Also returns `None` if a stored parent position or extra-edge offset
    /// points outside the file; a checksummed file never does.
    pub fn commit_data_at(&self, position: u32) -> Option<CommitData> {
        if position >= self.num_commits {
            return None;
        }
        let bytes = self.data.bytes();
        let at = self.commit_data.start + position as usize * COMMIT_DATA_ENTRY_SIZE;
        let record = &bytes[at..at + COMMIT_DATA_ENTRY_SIZE];

        let tree = ObjectId::from_bytes(&record[0..HASH_LEN], HashAlgorithm::Sha1).ok()?;
        let parent1 = u32::from_be_bytes([record[20], record[21], record[22], record[23]]);
        let parent2 = u32::from_be_bytes([record[24], record[25], record[26], record[27]]);
        let packed = u64::from_be_bytes([
            record[28], record[29], record[30], record[31], record[32], record[33], record[34],
            record[35],
        ]);

        let generation = (packed >> GENERATION_SHIFT) as u32;
        let commit_time = (packed & COMMIT_TIME_MASK) as i64;

        let mut parents = Vec::new();
        if parent1 != PARENT_NONE {
            if parent1 >= self.num_commits {
                return None;
            }
            parents.push(parent1);
        }
        if parent2 != PARENT_NONE {
            if parent2 & PARENT_EXTRA_EDGE != 0 {
                self.read_extra_edges(parent2 & !PARENT_EXTRA_EDGE, &mut parents)?;
            } else {
                if parent2 >= self.num_commits {
                    return None;
                }
                parents.push(parent2);
            }
        }

        Some(CommitData {
            tree,
            parents,
            generation,
            commit_time,
        })
    }

    /// Generation number at the given position, or `None` if out of range.
    pub fn generation_at(&self, position: u32) -> Option<u32> {
        if position >= self.num_commits {
            return None;
        }
        let bytes = self.data.bytes();
        let at = self.commit_data.start + position as usize * COMMIT_DATA_ENTRY_SIZE + 28;
        let packed = u64::from_be_bytes([
            bytes[at],
            bytes[at + 1],
            bytes[at + 2],
            bytes[at + 3],
            bytes[at + 4],
            bytes[at + 5],
            bytes[at + 6],
            bytes[at + 7],
        ]);
        Some((packed >> GENERATION_SHIFT) as u32)
    }

    /// Follow the extra-edge list starting at `entry_offset`, appending
    /// parent positions until the terminator entry.
    fn read_extra_edges(&self, entry_offset: u32, parents: &mut Vec<u32>) -> Option<()> {
        let edges = self.extra_edges.as_ref()?;
        let bytes = self.data.bytes();
        let mut index = entry_offset as usize;
        loop {
            let at = edges.start + index * 4;
            if at + 4 > edges.end {
                return None;
            }
            let value =
                u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
            let position = value & !EDGE_LAST;
            if position >= self.num_commits {
                return None;
            }
            parents.push(position);
            if value & EDGE_LAST != 0 {
                return Some(());
            }
            index += 1;
        }
    }

    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = self.lookup.start + index * HASH_LEN;
        &self.data.bytes()[start..start + HASH_LEN]
    }
}
