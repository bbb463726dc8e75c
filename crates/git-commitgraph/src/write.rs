//! Commit-graph file writer.
//!
//! Collects every commit reachable from a set of wanted tips, assigns each
//! one a position by sorting the ids, computes generation numbers, and emits
//! the chunked file in a single sequential pass with a rolling checksum.
//! Given the same commit set, the output bytes are identical.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use git_hash::hasher::Hasher;
use git_hash::{FanoutTable, HashAlgorithm, ObjectId};
use git_odb::{OdbBackend, OdbError};
use git_utils::progress::ProgressSink;
use git_utils::tempfile::PendingFile;

use crate::chunk::{CHUNK_COMMIT_DATA, CHUNK_EXTRA_EDGES, CHUNK_OID_FANOUT, CHUNK_OID_LOOKUP};
use crate::{
    GraphError, COMMIT_DATA_ENTRY_SIZE, COMMIT_TIME_MASK, EDGE_LAST, GENERATION_NUMBER_MAX,
    GENERATION_SHIFT, GENERATION_UNKNOWN, GRAPH_SIGNATURE, GRAPH_VERSION, HASH_KIND_SHA1,
    HASH_LEN, HEADER_SIZE, PARENT_EXTRA_EDGE, PARENT_NONE, TOC_ENTRY_SIZE,
};

/// One collected commit, in writer-internal form.
struct CommitEntry {
    oid: ObjectId,
    tree: ObjectId,
    parents: Vec<ObjectId>,
    commit_time: i64,
    generation: u32,
}

/// Writer for commit-graph files.
///
/// Reads raw commits from an [`OdbBackend`] and produces the on-disk format.
/// Single-threaded; transient memory is proportional to the reachable commit
/// set and released when the write returns.
pub struct GraphWriter<'a> {
    odb: &'a dyn OdbBackend,
}

impl<'a> GraphWriter<'a> {
    pub fn new(odb: &'a dyn OdbBackend) -> Self {
        Self { odb }
    }

    /// Write the graph of all commits reachable from `tips` to `path`.
    ///
    /// The file is assembled in a temporary sibling and atomically renamed
    /// into place, so readers never observe a partial file. Returns the
    /// trailing checksum of the written graph.
    ///
    /// Fails with [`GraphError::MissingObject`] if a reachable commit is
    /// absent from the object database and with [`GraphError::Cancelled`]
    /// (leaving nothing behind) if the progress sink requests a stop.
    pub fn write(
        &self,
        tips: &[ObjectId],
        path: impl AsRef<Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<ObjectId, GraphError> {
        let mut pending = PendingFile::for_target(path)?;
        let checksum = self.write_to(tips, &mut pending, progress)?;
        pending.commit()?;
        Ok(checksum)
    }

    /// Write the graph of all commits reachable from `tips` to an arbitrary
    /// stream. The caller owns the stream's fate on error.
    pub fn write_to(
        &self,
        tips: &[ObjectId],
        out: &mut dyn Write,
        progress: &mut dyn ProgressSink,
    ) -> Result<ObjectId, GraphError> {
        let mut entries = self.collect(tips, progress)?;

        // Sorting the ids fixes each commit's position as its index.
        entries.sort_by(|a, b| a.oid.as_bytes().cmp(b.oid.as_bytes()));
        let positions: HashMap<ObjectId, u32> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.oid, i as u32))
            .collect();

        compute_generations(&mut entries, &positions, progress)?;

        serialize(&entries, &positions, out, progress)
    }

    /// Reverse traversal from the wanted tips, loading every reachable
    /// commit's headers.
    fn collect(
        &self,
        tips: &[ObjectId],
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<CommitEntry>, GraphError> {
        progress.begin_task("Finding commits for commit graph", None);

        let mut entries: Vec<CommitEntry> = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut pending: Vec<ObjectId> = tips.to_vec();

        while let Some(oid) = pending.pop() {
            if progress.is_cancelled() {
                return Err(GraphError::Cancelled);
            }
            if !seen.insert(oid) {
                continue;
            }
            if oid.algorithm() != HashAlgorithm::Sha1 {
                return Err(GraphError::UnsupportedHashKind(2));
            }

            let commit = self.odb.read_commit(&oid).map_err(|e| match e {
                OdbError::NotFound(id) => GraphError::MissingObject(id),
                other => GraphError::Odb(other),
            })?;

            for parent in &commit.parents {
                if !seen.contains(parent) {
                    pending.push(*parent);
                }
            }

            entries.push(CommitEntry {
                oid,
                tree: commit.tree,
                commit_time: commit.commit_time(),
                parents: commit.parents,
                generation: GENERATION_UNKNOWN,
            });
            progress.update(entries.len() as u64);
        }

        progress.end_task();
        Ok(entries)
    }
}

/// Compute generation numbers bottom-up over the position-indexed entries.
///
/// A root commit has generation 1; otherwise the generation is one more than
/// the largest parent generation, clamped to [`GENERATION_NUMBER_MAX`]. A
/// commit whose parents are not all present keeps [`GENERATION_UNKNOWN`].
fn compute_generations(
    entries: &mut [CommitEntry],
    positions: &HashMap<ObjectId, u32>,
    progress: &mut dyn ProgressSink,
) -> Result<(), GraphError> {
    let n = entries.len();
    progress.begin_task("Computing commit graph generation numbers", Some(n as u64));

    let parent_positions: Vec<Vec<u32>> = entries
        .iter()
        .map(|e| {
            e.parents
                .iter()
                .filter_map(|p| positions.get(p).copied())
                .collect()
        })
        .collect();
    let fully_known: Vec<bool> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| parent_positions[i].len() == e.parents.len())
        .collect();

    let mut generations = vec![GENERATION_UNKNOWN; n];
    let mut visited = vec![false; n];
    let mut stack: Vec<(usize, bool)> = Vec::new();
    let mut done = 0u64;

    for start in 0..n {
        if visited[start] {
            continue;
        }
        if progress.is_cancelled() {
            return Err(GraphError::Cancelled);
        }
        stack.push((start, false));
        while let Some((idx, processed)) = stack.pop() {
            if processed {
                let parents = &parent_positions[idx];
                generations[idx] = if !fully_known[idx]
                    || parents
                        .iter()
                        .any(|&p| generations[p as usize] == GENERATION_UNKNOWN)
                {
                    GENERATION_UNKNOWN
                } else {
                    let max_parent = parents
                        .iter()
                        .map(|&p| generations[p as usize])
                        .max()
                        .unwrap_or(0);
                    (max_parent + 1).min(GENERATION_NUMBER_MAX)
                };
                done += 1;
                progress.update(done);
            } else if !visited[idx] {
                visited[idx] = true;
                stack.push((idx, true));
                for &p in &parent_positions[idx] {
                    if !visited[p as usize] {
                        stack.push((p as usize, false));
                    }
                }
            }
        }
    }

    for (entry, generation) in entries.iter_mut().zip(generations) {
        entry.generation = generation;
    }
    progress.end_task();
    Ok(())
}

/// Emit header, directory, chunks, and trailing checksum in one pass.
fn serialize(
    entries: &[CommitEntry],
    positions: &HashMap<ObjectId, u32>,
    out: &mut dyn Write,
    progress: &mut dyn ProgressSink,
) -> Result<ObjectId, GraphError> {
    let n = entries.len();

    // Lay out the spill area for commits with more than two parents: the
    // second slot of such a record points at its run of entries, which list
    // parents two onward with the last entry marked.
    let mut extra_edges: Vec<u32> = Vec::new();
    let mut edge_offsets: HashMap<u32, u32> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        if entry.parents.len() > 2 {
            edge_offsets.insert(idx as u32, extra_edges.len() as u32);
            for (i, parent) in entry.parents.iter().enumerate().skip(1) {
                let position = positions[parent];
                let last = i == entry.parents.len() - 1;
                extra_edges.push(if last { position | EDGE_LAST } else { position });
            }
        }
    }

    let has_extra_edges = !extra_edges.is_empty();
    let chunk_count: usize = if has_extra_edges { 4 } else { 3 };

    let toc_size = (chunk_count + 1) * TOC_ENTRY_SIZE;
    let fanout_offset = HEADER_SIZE + toc_size;
    let lookup_offset = fanout_offset + git_hash::fanout::FANOUT_SIZE;
    let commit_data_offset = lookup_offset + n * HASH_LEN;
    let extra_edges_offset = commit_data_offset + n * COMMIT_DATA_ENTRY_SIZE;
    let payload_end = extra_edges_offset + extra_edges.len() * 4;

    let mut w = HashingWriter::new(&mut *out);

    // Header.
    w.put(GRAPH_SIGNATURE)?;
    w.put(&[GRAPH_VERSION, HASH_KIND_SHA1, 0, chunk_count as u8])?;

    // Chunk directory, terminated at the checksum boundary.
    put_toc_entry(&mut w, CHUNK_OID_FANOUT, fanout_offset as u64)?;
    put_toc_entry(&mut w, CHUNK_OID_LOOKUP, lookup_offset as u64)?;
    put_toc_entry(&mut w, CHUNK_COMMIT_DATA, commit_data_offset as u64)?;
    if has_extra_edges {
        put_toc_entry(&mut w, CHUNK_EXTRA_EDGES, extra_edges_offset as u64)?;
    }
    put_toc_entry(&mut w, 0, payload_end as u64)?;

    // OID fanout.
    let oids: Vec<ObjectId> = entries.iter().map(|e| e.oid).collect();
    w.put(&FanoutTable::build(&oids).to_bytes())?;

    // OID lookup.
    progress.begin_task("Writing out commit graph", Some(n as u64));
    for (i, entry) in entries.iter().enumerate() {
        if progress.is_cancelled() {
            return Err(GraphError::Cancelled);
        }
        w.put(entry.oid.as_bytes())?;
        progress.update((i + 1) as u64);
    }

    // Commit data.
    for entry in entries {
        if progress.is_cancelled() {
            return Err(GraphError::Cancelled);
        }

        w.put(entry.tree.as_bytes())?;

        let parent1 = match entry.parents.first() {
            None => PARENT_NONE,
            Some(p) => positions[p],
        };
        let parent2 = match entry.parents.len() {
            0 | 1 => PARENT_NONE,
            2 => positions[&entry.parents[1]],
            _ => PARENT_EXTRA_EDGE | edge_offsets[&(positions[&entry.oid])],
        };
        w.put(&parent1.to_be_bytes())?;
        w.put(&parent2.to_be_bytes())?;

        let packed = ((entry.generation as u64) << GENERATION_SHIFT)
            | (entry.commit_time as u64 & COMMIT_TIME_MASK);
        w.put(&packed.to_be_bytes())?;
    }

    // Extra edges.
    for value in &extra_edges {
        w.put(&value.to_be_bytes())?;
    }
    progress.end_task();

    // The rolling hash has counted every byte; it must agree with the
    // layout the directory promised.
    debug_assert_eq!(w.position(), payload_end as u64);

    // Trailing checksum over everything written so far.
    let checksum = w.finish()?;
    out.write_all(checksum.as_bytes())?;
    Ok(checksum)
}

/// Forwards writes to the output while folding them into a rolling hash.
struct HashingWriter<'w> {
    out: &'w mut dyn Write,
    hasher: Hasher,
}

impl<'w> HashingWriter<'w> {
    fn new(out: &'w mut dyn Write) -> Self {
        Self {
            out,
            hasher: Hasher::new(HashAlgorithm::Sha1),
        }
    }

    fn put(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.hasher.update(bytes);
        self.out.write_all(bytes)
    }

    /// Bytes written (and hashed) so far.
    fn position(&self) -> u64 {
        self.hasher.position()
    }

    fn finish(self) -> Result<ObjectId, GraphError> {
        Ok(self.hasher.finalize()?)
    }
}

fn put_toc_entry(w: &mut HashingWriter<'_>, id: u32, offset: u64) -> std::io::Result<()> {
    w.put(&id.to_be_bytes())?;
    w.put(&offset.to_be_bytes())
}
