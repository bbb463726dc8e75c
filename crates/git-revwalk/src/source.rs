//! Graph-aware commit header resolution.

use git_commitgraph::{CommitGraph, GENERATION_UNKNOWN};
use git_hash::ObjectId;
use git_object::cache::CommitCache;
use git_object::Commit;
use git_odb::{OdbBackend, OdbError};

use crate::RevWalkError;

/// Commit headers needed for traversal, with no message attached.
///
/// When resolved from the graph, the raw commit object is never read;
/// `generation` carries the graph's value, or
/// [`GENERATION_UNKNOWN`] when the headers came from raw parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    /// OID of the commit's root tree.
    pub tree: ObjectId,
    /// Parent commit ids, in order.
    pub parents: Vec<ObjectId>,
    /// Committer timestamp, seconds since epoch.
    pub commit_time: i64,
    /// Generation number, if known.
    pub generation: u32,
}

/// Resolves commit headers graph-first with raw-object fallback.
///
/// This is the seam between traversal and storage: a walker asks for
/// [`meta`](HeaderSource::meta) while traversing and only calls
/// [`full_commit`](HeaderSource::full_commit) when a predicate actually
/// needs the message. Raw reads go through an LRU cache.
pub struct HeaderSource<'a> {
    odb: &'a dyn OdbBackend,
    graph: Option<&'a CommitGraph>,
    cache: CommitCache,
}

impl<'a> HeaderSource<'a> {
    pub fn new(odb: &'a dyn OdbBackend, graph: Option<&'a CommitGraph>) -> Self {
        Self {
            odb,
            graph,
            cache: CommitCache::default(),
        }
    }

    /// The graph in use, if any.
    pub fn graph(&self) -> Option<&'a CommitGraph> {
        self.graph
    }

    /// Resolve a commit's headers, preferring the graph.
    ///
    /// Commits absent from the graph (or whose stored parents cannot be
    /// resolved) fall back to raw parsing.
    pub fn meta(&mut self, oid: &ObjectId) -> Result<CommitMeta, RevWalkError> {
        if let Some(graph) = self.graph {
            if let Some(meta) = graph_meta(graph, oid) {
                return Ok(meta);
            }
        }

        let commit = self.full_commit(oid)?;
        Ok(CommitMeta {
            tree: commit.tree,
            parents: commit.parents.clone(),
            commit_time: commit.commit_time(),
            generation: GENERATION_UNKNOWN,
        })
    }

    /// Read and parse the raw commit object, message included.
    pub fn full_commit(&mut self, oid: &ObjectId) -> Result<Commit, RevWalkError> {
        if let Some(commit) = self.cache.get(oid) {
            return Ok(commit.clone());
        }
        let commit = self.odb.read_commit(oid).map_err(|e| match e {
            OdbError::NotFound(id) => RevWalkError::CommitNotFound(id),
            other => RevWalkError::Odb(other),
        })?;
        self.cache.insert(*oid, commit.clone());
        Ok(commit)
    }
}

/// Read one commit's headers from the graph, resolving parent positions
/// back to ids.
fn graph_meta(graph: &CommitGraph, oid: &ObjectId) -> Option<CommitMeta> {
    let position = graph.position_of(oid)?;
    let data = graph.commit_data_at(position)?;

    let mut parents = Vec::with_capacity(data.parents.len());
    for &p in &data.parents {
        parents.push(graph.oid_at(p)?);
    }

    Some(CommitMeta {
        tree: data.tree,
        parents,
        commit_time: data.commit_time,
        generation: data.generation,
    })
}
