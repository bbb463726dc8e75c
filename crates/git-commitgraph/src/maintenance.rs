//! Graph file placement and lifecycle helpers for GC orchestration.
//!
//! The graph lives alongside the pack indexes under
//! `objects/info/commit-graph` and is only meaningful while the repository
//! has packed objects; when the last pack goes away, the orchestrator prunes
//! the graph too.

use std::io;
use std::path::{Path, PathBuf};

/// Path of the commit-graph file inside an objects directory.
pub fn graph_file_path(objects_dir: impl AsRef<Path>) -> PathBuf {
    objects_dir.as_ref().join("info").join("commit-graph")
}

/// Whether the objects directory holds any pack files.
pub fn has_pack_files(objects_dir: impl AsRef<Path>) -> io::Result<bool> {
    let pack_dir = objects_dir.as_ref().join("pack");
    if !pack_dir.is_dir() {
        return Ok(false);
    }
    for entry in std::fs::read_dir(&pack_dir)? {
        let entry = entry?;
        if entry.path().extension().is_some_and(|ext| ext == "pack") {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Remove a commit-graph that outlived its packs.
///
/// Returns `true` if a graph file was deleted. A repository that still has
/// pack files is left untouched.
pub fn prune_orphan_graph(objects_dir: impl AsRef<Path>) -> io::Result<bool> {
    let objects_dir = objects_dir.as_ref();
    if has_pack_files(objects_dir)? {
        return Ok(false);
    }
    let graph_path = graph_file_path(objects_dir);
    if graph_path.exists() {
        std::fs::remove_file(&graph_path)?;
        return Ok(true);
    }
    Ok(false)
}
