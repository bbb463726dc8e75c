//! Merge base computation using the paint algorithm.
//!
//! Commits reachable from each input are painted with different flags; a
//! commit painted with both is a common ancestor. The lowest common
//! ancestors survive a redundancy pass. Headers come from the same
//! graph-first [`HeaderSource`] the walker uses, so results do not depend
//! on whether a commit-graph is attached.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use git_commitgraph::CommitGraph;
use git_hash::ObjectId;
use git_odb::OdbBackend;

use crate::source::HeaderSource;
use crate::RevWalkError;

const PARENT1: u8 = 1;
const PARENT2: u8 = 2;
const STALE: u8 = 4;

/// Entry in the paint queue.
struct PaintEntry {
    oid: ObjectId,
    date: i64,
}

impl PartialEq for PaintEntry {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}

impl Eq for PaintEntry {}

impl PartialOrd for PaintEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PaintEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap by date (newest first).
        self.date.cmp(&other.date)
    }
}

/// Find all merge bases of two commits.
///
/// Returns the lowest common ancestors: commits reachable from both `a`
/// and `b` that are not ancestors of any other common ancestor.
pub fn merge_base(
    odb: &dyn OdbBackend,
    graph: Option<&CommitGraph>,
    a: &ObjectId,
    b: &ObjectId,
) -> Result<Vec<ObjectId>, RevWalkError> {
    if a == b {
        return Ok(vec![*a]);
    }
    let mut source = HeaderSource::new(odb, graph);
    let bases = paint_down_to_common(&mut source, a, b)?;
    remove_redundant(&mut source, bases)
}

/// Find the single best merge base of two commits.
pub fn merge_base_one(
    odb: &dyn OdbBackend,
    graph: Option<&CommitGraph>,
    a: &ObjectId,
    b: &ObjectId,
) -> Result<Option<ObjectId>, RevWalkError> {
    let bases = merge_base(odb, graph, a, b)?;
    Ok(bases.into_iter().next())
}

/// Check if `ancestor` is an ancestor of `descendant`.
pub fn is_ancestor(
    odb: &dyn OdbBackend,
    graph: Option<&CommitGraph>,
    ancestor: &ObjectId,
    descendant: &ObjectId,
) -> Result<bool, RevWalkError> {
    if ancestor == descendant {
        return Ok(true);
    }
    let bases = merge_base(odb, graph, ancestor, descendant)?;
    Ok(bases.contains(ancestor))
}

/// Walk down from both commits, painting flags until the frontiers meet.
fn paint_down_to_common(
    source: &mut HeaderSource<'_>,
    a: &ObjectId,
    b: &ObjectId,
) -> Result<Vec<ObjectId>, RevWalkError> {
    let mut flags: HashMap<ObjectId, u8> = HashMap::new();
    let mut queue: BinaryHeap<PaintEntry> = BinaryHeap::new();
    let mut results: Vec<ObjectId> = Vec::new();

    let meta_a = source.meta(a)?;
    let meta_b = source.meta(b)?;

    flags.insert(*a, PARENT1);
    flags.insert(*b, PARENT2);
    queue.push(PaintEntry {
        oid: *a,
        date: meta_a.commit_time,
    });
    queue.push(PaintEntry {
        oid: *b,
        date: meta_b.commit_time,
    });

    while let Some(entry) = queue.pop() {
        let current_flags = *flags.get(&entry.oid).unwrap_or(&0);

        if current_flags & STALE != 0 {
            continue;
        }

        if current_flags & (PARENT1 | PARENT2) == (PARENT1 | PARENT2) {
            flags.insert(entry.oid, current_flags | STALE);
            results.push(entry.oid);

            if !queue_has_nonstale(&queue, &flags) {
                break;
            }
            continue;
        }

        let meta = source.meta(&entry.oid)?;
        for parent in &meta.parents {
            let parent_flags = flags.entry(*parent).or_insert(0);
            let new_flags = *parent_flags | current_flags;
            if new_flags != *parent_flags {
                *parent_flags = new_flags;
                if let Ok(parent_meta) = source.meta(parent) {
                    queue.push(PaintEntry {
                        oid: *parent,
                        date: parent_meta.commit_time,
                    });
                }
            }
        }
    }

    Ok(results)
}

fn queue_has_nonstale(queue: &BinaryHeap<PaintEntry>, flags: &HashMap<ObjectId, u8>) -> bool {
    queue.iter().any(|entry| {
        let f = flags.get(&entry.oid).copied().unwrap_or(0);
        f & STALE == 0
    })
}

/// Drop bases that are ancestors of other bases.
fn remove_redundant(
    source: &mut HeaderSource<'_>,
    bases: Vec<ObjectId>,
) -> Result<Vec<ObjectId>, RevWalkError> {
    if bases.len() <= 1 {
        return Ok(bases);
    }

    let mut to_remove: HashSet<usize> = HashSet::new();

    for i in 0..bases.len() {
        if to_remove.contains(&i) {
            continue;
        }
        for j in (i + 1)..bases.len() {
            if to_remove.contains(&j) {
                continue;
            }
            if is_ancestor_direct(source, &bases[i], &bases[j])? {
                to_remove.insert(i);
                break;
            } else if is_ancestor_direct(source, &bases[j], &bases[i])? {
                to_remove.insert(j);
            }
        }
    }

    Ok(bases
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !to_remove.contains(idx))
        .map(|(_, oid)| oid)
        .collect())
}

/// BFS ancestor check (does not recurse into merge_base).
fn is_ancestor_direct(
    source: &mut HeaderSource<'_>,
    ancestor: &ObjectId,
    descendant: &ObjectId,
) -> Result<bool, RevWalkError> {
    if ancestor == descendant {
        return Ok(true);
    }

    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(*descendant);
    visited.insert(*descendant);

    while let Some(current) = queue.pop_front() {
        if current == *ancestor {
            return Ok(true);
        }
        if let Ok(meta) = source.meta(&current) {
            for parent in &meta.parents {
                if visited.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
    }

    Ok(false)
}
