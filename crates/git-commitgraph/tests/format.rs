//! Structural validation tests: every parse failure the reader must detect.

use bstr::BString;
use git_commitgraph::{CommitGraph, GraphError, GraphWriter};
use git_hash::hasher::Hasher;
use git_hash::{HashAlgorithm, ObjectId};
use git_object::{Commit, SigDate, Signature};
use git_odb::MemoryOdb;
use git_utils::progress::NoProgress;

const CHUNK_OIDF: u32 = 0x4f49_4446;
const CHUNK_OIDL: u32 = 0x4f49_444c;
const CHUNK_CDAT: u32 = 0x4344_4154;
const PARENT_NONE: u32 = 0x7000_0000;

fn make_oid(n: u8) -> ObjectId {
    let mut bytes = [0u8; 20];
    bytes[0] = n;
    bytes[19] = n;
    ObjectId::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap()
}

/// Assemble a graph file from hand-built chunks, with a valid directory and
/// trailing checksum, so individual structural rules can be broken one at a
/// time.
struct FileBuilder {
    chunks: Vec<(u32, Vec<u8>)>,
}

impl FileBuilder {
    fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    fn chunk(mut self, id: u32, payload: Vec<u8>) -> Self {
        self.chunks.push((id, payload));
        self
    }

    fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"CGPH");
        buf.extend_from_slice(&[1, 1, 0, self.chunks.len() as u8]);

        let toc_size = (self.chunks.len() + 1) * 12;
        let mut offset = 8 + toc_size;
        for (id, payload) in &self.chunks {
            buf.extend_from_slice(&id.to_be_bytes());
            buf.extend_from_slice(&(offset as u64).to_be_bytes());
            offset += payload.len();
        }
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&(offset as u64).to_be_bytes());

        for (_, payload) in &self.chunks {
            buf.extend_from_slice(payload);
        }

        let checksum = Hasher::digest(HashAlgorithm::Sha1, &buf).unwrap();
        buf.extend_from_slice(checksum.as_bytes());
        buf
    }
}

/// Fanout bytes for a sorted id list.
fn fanout_bytes(oids: &[ObjectId]) -> Vec<u8> {
    let mut counts = [0u32; 256];
    for oid in oids {
        counts[oid.first_byte() as usize] += 1;
    }
    for i in 1..256 {
        counts[i] += counts[i - 1];
    }
    counts.iter().flat_map(|c| c.to_be_bytes()).collect()
}

fn lookup_bytes(oids: &[ObjectId]) -> Vec<u8> {
    oids.iter().flat_map(|o| o.as_bytes().to_vec()).collect()
}

/// Root-commit records: no parents, generation 1, the given times.
fn cdat_bytes(oids: &[ObjectId], times: &[i64]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (oid, &time) in oids.iter().zip(times) {
        let mut tree = [0u8; 20];
        tree[0] = 0xee;
        tree[19] = oid.first_byte();
        buf.extend_from_slice(&tree);
        buf.extend_from_slice(&PARENT_NONE.to_be_bytes());
        buf.extend_from_slice(&PARENT_NONE.to_be_bytes());
        let packed = (1u64 << 34) | (time as u64 & ((1 << 34) - 1));
        buf.extend_from_slice(&packed.to_be_bytes());
    }
    buf
}

/// A small valid graph produced by the real writer, for mutation tests.
fn valid_graph_bytes() -> Vec<u8> {
    let mut odb = MemoryOdb::new();
    let sig = Signature {
        name: BString::from("T"),
        email: BString::from("t@x"),
        date: SigDate::new(100, 0),
    };
    let root = make_oid(1);
    odb.insert_commit(
        root,
        Commit {
            tree: make_oid(0xee),
            parents: vec![],
            author: sig.clone(),
            committer: sig.clone(),
            message: BString::from("r"),
        },
    );
    let mut heads = Vec::new();
    for i in 2..=4u8 {
        let oid = make_oid(i);
        odb.insert_commit(
            oid,
            Commit {
                tree: make_oid(0xee),
                parents: vec![root],
                author: sig.clone(),
                committer: sig.clone(),
                message: BString::from("h"),
            },
        );
        heads.push(oid);
    }
    // An octopus tip so the file carries an extra-edge chunk.
    let tip = make_oid(5);
    odb.insert_commit(
        tip,
        Commit {
            tree: make_oid(0xee),
            parents: heads.clone(),
            author: sig.clone(),
            committer: sig,
            message: BString::from("m"),
        },
    );

    let mut out = Vec::new();
    GraphWriter::new(&odb)
        .write_to(&[tip], &mut out, &mut NoProgress)
        .unwrap();
    out
}

#[test]
fn valid_file_opens() {
    let graph = CommitGraph::from_bytes(valid_graph_bytes()).unwrap();
    assert_eq!(graph.commit_count(), 5);
}

#[test]
fn rejects_bad_signature() {
    let mut bytes = valid_graph_bytes();
    bytes[0] = b'X';
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));
}

#[test]
fn rejects_unsupported_version() {
    let mut bytes = valid_graph_bytes();
    bytes[4] = 2;
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::UnsupportedVersion(2)));
}

#[test]
fn rejects_unsupported_hash_kind() {
    let mut bytes = valid_graph_bytes();
    bytes[5] = 2;
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::UnsupportedHashKind(2)));
}

#[test]
fn rejects_truncated_file() {
    let bytes = valid_graph_bytes();
    let err = CommitGraph::from_bytes(bytes[..10].to_vec()).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));

    let err = CommitGraph::from_bytes(bytes[..bytes.len() - 1].to_vec()).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));
}

#[test]
fn rejects_wrong_chunk_count() {
    let mut bytes = valid_graph_bytes();
    bytes[7] = 1;
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));
}

#[test]
fn rejects_checksum_mismatch() {
    let mut bytes = valid_graph_bytes();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::ChecksumMismatch { .. }));
}

#[test]
fn detects_payload_corruption_via_checksum() {
    let mut bytes = valid_graph_bytes();
    // Flip a byte inside a commit record's tree id; the structure stays
    // plausible, so only the checksum can notice.
    let at = bytes.len() - 40;
    bytes[at] ^= 0x01;
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::ChecksumMismatch { .. }));
}

#[test]
fn rejects_missing_fanout_chunk() {
    let oids = [make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("fanout")));
}

#[test]
fn rejects_missing_lookup_chunk() {
    let oids = [make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("lookup")));
}

#[test]
fn rejects_missing_commit_data_chunk() {
    let oids = [make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("commit data")));
}

#[test]
fn rejects_lookup_size_mismatch() {
    let oids = [make_oid(1), make_oid(2)];
    let mut lookup = lookup_bytes(&oids);
    lookup.truncate(lookup.len() - 20);
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_OIDL, lookup)
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100, 200]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("lookup")));
}

#[test]
fn rejects_commit_data_size_mismatch() {
    let oids = [make_oid(1), make_oid(2)];
    let mut cdat = cdat_bytes(&oids, &[100, 200]);
    cdat.truncate(cdat.len() - 1);
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat)
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("commit data")));
}

#[test]
fn rejects_unsorted_lookup() {
    let sorted = [make_oid(1), make_oid(2)];
    let reversed = [make_oid(2), make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&sorted))
        .chunk(CHUNK_OIDL, lookup_bytes(&reversed))
        .chunk(CHUNK_CDAT, cdat_bytes(&sorted, &[100, 200]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));
}

#[test]
fn rejects_duplicate_lookup_entries() {
    let oids = [make_oid(1), make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100, 200]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("ascending")));
}

#[test]
fn rejects_non_monotonic_fanout() {
    let oids = [make_oid(1), make_oid(2)];
    let mut fanout = fanout_bytes(&oids);
    // Bucket 0x01 claims 2 entries, bucket 0x02 claims 1.
    fanout[4..8].copy_from_slice(&2u32.to_be_bytes());
    fanout[8..12].copy_from_slice(&1u32.to_be_bytes());
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout)
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100, 200]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));
}

#[test]
fn rejects_fanout_bucket_disagreement() {
    let oids = [make_oid(1), make_oid(2)];
    // Valid cumulative shape, but it assigns both commits to bucket 0x01.
    let wrong = [make_oid(1), make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&wrong))
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100, 200]))
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(_)));
}

#[test]
fn rejects_misaligned_extra_edges() {
    let oids = [make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100]))
        .chunk(0x4544_4745, vec![0u8; 7])
        .build();
    let err = CommitGraph::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, GraphError::Malformed(ref m) if m.contains("extra edge")));
}

#[test]
fn unknown_chunks_are_skipped() {
    let oids = [make_oid(1)];
    let bytes = FileBuilder::new()
        .chunk(CHUNK_OIDF, fanout_bytes(&oids))
        .chunk(CHUNK_OIDL, lookup_bytes(&oids))
        .chunk(CHUNK_CDAT, cdat_bytes(&oids, &[100]))
        .chunk(0x5a5a_5a5a, vec![1, 2, 3, 4, 5])
        .build();
    let graph = CommitGraph::from_bytes(bytes).unwrap();
    assert_eq!(graph.commit_count(), 1);
    let pos = graph.position_of(&make_oid(1)).unwrap();
    assert_eq!(graph.commit_data_at(pos).unwrap().commit_time, 100);
}

#[test]
fn open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CommitGraph::open(dir.path().join("commit-graph")).unwrap_err();
    assert!(matches!(err, GraphError::Io(_)));
}
