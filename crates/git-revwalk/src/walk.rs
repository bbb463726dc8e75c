//! Core revision walk iterator.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use bstr::ByteSlice;
use git_commitgraph::CommitGraph;
use git_hash::ObjectId;
use git_odb::OdbBackend;

use crate::source::{CommitMeta, HeaderSource};
use crate::RevWalkError;

/// Sort order for commit traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// By committer date, newest first (default).
    #[default]
    CommitTimeDesc,
    /// Topological: parents always appear after children.
    Topological,
}

/// Options for revision walking.
///
/// `since`/`until` and `first_parent_only` are decided from commit headers
/// alone; `grep_pattern` is a message-substring predicate, which forces a
/// raw-object read for each candidate commit.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub sort: SortOrder,
    pub first_parent_only: bool,
    pub max_count: Option<usize>,
    pub skip: Option<usize>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub grep_pattern: Option<String>,
}

/// An entry in the walk priority queue.
struct WalkEntry {
    oid: ObjectId,
    /// Committer timestamp (seconds since epoch).
    commit_date: i64,
    /// Insertion counter for stable ordering among equal dates.
    insertion_ctr: u64,
}

/// State tracking for topological sort.
struct TopoState {
    /// Number of not-yet-emitted children per commit.
    indegree: HashMap<ObjectId, u32>,
    /// Commits ready to emit (in-degree == 0).
    ready: VecDeque<ObjectId>,
    /// Commit dates for ordering the ready queue.
    dates: HashMap<ObjectId, i64>,
}

/// Revision walk iterator over commits.
///
/// Headers are resolved through a [`HeaderSource`], so the walk reads the
/// commit-graph when one is attached and raw objects otherwise; the emitted
/// sequence is identical either way.
pub struct RevWalk<'a> {
    source: HeaderSource<'a>,
    /// Priority queue for date-ordered walks.
    queue: BinaryHeap<WalkEntry>,
    /// Already-enqueued commit OIDs.
    seen: HashSet<ObjectId>,
    /// Excluded commits and their ancestors.
    hidden: HashSet<ObjectId>,
    sort: SortOrder,
    options: WalkOptions,
    insertion_ctr: u64,
    emitted: usize,
    skipped: usize,
    /// State for topological sort (built on first pull).
    topo_state: Option<TopoState>,
    prepared: bool,
}

impl<'a> RevWalk<'a> {
    /// Create a walker that parses raw commit objects only.
    pub fn new(odb: &'a dyn OdbBackend) -> Self {
        Self::with_graph(odb, None)
    }

    /// Create a walker that resolves headers from `graph` when possible.
    pub fn with_graph(odb: &'a dyn OdbBackend, graph: Option<&'a CommitGraph>) -> Self {
        Self {
            source: HeaderSource::new(odb, graph),
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
            hidden: HashSet::new(),
            sort: SortOrder::default(),
            options: WalkOptions::default(),
            insertion_ctr: 0,
            emitted: 0,
            skipped: 0,
            topo_state: None,
            prepared: false,
        }
    }

    /// Add a starting commit (positive reference).
    pub fn push(&mut self, oid: ObjectId) -> Result<(), RevWalkError> {
        if self.seen.contains(&oid) {
            return Ok(());
        }
        let meta = self.source.meta(&oid)?;
        self.seen.insert(oid);
        self.enqueue(oid, &meta);
        Ok(())
    }

    /// Add an exclusion commit: it and all its ancestors are omitted.
    pub fn hide(&mut self, oid: ObjectId) -> Result<(), RevWalkError> {
        let mut stack = vec![oid];
        while let Some(current) = stack.pop() {
            if !self.hidden.insert(current) {
                continue;
            }
            if let Ok(meta) = self.source.meta(&current) {
                for parent in &meta.parents {
                    if !self.hidden.contains(parent) {
                        stack.push(*parent);
                    }
                }
            }
        }
        Ok(())
    }

    /// Set the sort order.
    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.options.sort = sort;
    }

    /// Set walk options.
    pub fn set_options(&mut self, options: WalkOptions) {
        self.sort = options.sort;
        self.options = options;
    }

    /// Resolve a commit's headers the way this walk does (graph-first).
    pub fn commit_meta(&mut self, oid: &ObjectId) -> Result<CommitMeta, RevWalkError> {
        self.source.meta(oid)
    }

    // --- Internal helpers ---

    fn enqueue(&mut self, oid: ObjectId, meta: &CommitMeta) {
        let entry = WalkEntry {
            oid,
            commit_date: meta.commit_time,
            insertion_ctr: self.insertion_ctr,
        };
        self.insertion_ctr += 1;
        self.queue.push(entry);
    }

    fn walk_parents(&mut self, meta: CommitMeta) -> Vec<ObjectId> {
        if self.options.first_parent_only {
            meta.parents.into_iter().take(1).collect()
        } else {
            meta.parents
        }
    }

    /// Next commit for the date-ordered walk.
    fn next_date_order(&mut self) -> Result<Option<ObjectId>, RevWalkError> {
        while let Some(entry) = self.queue.pop() {
            let oid = entry.oid;

            if self.hidden.contains(&oid) {
                continue;
            }

            let meta = self.source.meta(&oid)?;
            for parent in self.walk_parents(meta) {
                if self.seen.insert(parent) && !self.hidden.contains(&parent) {
                    if let Ok(parent_meta) = self.source.meta(&parent) {
                        self.enqueue(parent, &parent_meta);
                    }
                }
            }

            return Ok(Some(oid));
        }
        Ok(None)
    }

    /// Collect all reachable commits and compute in-degrees for the
    /// topological order.
    fn prepare_topo(&mut self) -> Result<(), RevWalkError> {
        if self.prepared {
            return Ok(());
        }
        self.prepared = true;

        let mut dates: HashMap<ObjectId, i64> = HashMap::new();
        let mut indegree: HashMap<ObjectId, u32> = HashMap::new();
        let mut all_commits: Vec<ObjectId> = Vec::new();

        let mut bfs: VecDeque<ObjectId> = VecDeque::new();
        let mut visited: HashSet<ObjectId> = HashSet::new();

        while let Some(entry) = self.queue.pop() {
            if visited.insert(entry.oid) {
                bfs.push_back(entry.oid);
            }
        }

        while let Some(oid) = bfs.pop_front() {
            if self.hidden.contains(&oid) {
                continue;
            }
            let meta = self.source.meta(&oid)?;
            dates.insert(oid, meta.commit_time);
            indegree.entry(oid).or_insert(0);

            for parent in self.walk_parents(meta) {
                if !self.hidden.contains(&parent) {
                    *indegree.entry(parent).or_insert(0) += 1;
                    if visited.insert(parent) {
                        bfs.push_back(parent);
                    }
                }
            }
            all_commits.push(oid);
        }

        // Tips (no unvisited children) start the ready queue, newest first.
        let mut tips: Vec<ObjectId> = all_commits
            .iter()
            .copied()
            .filter(|oid| indegree.get(oid).copied().unwrap_or(0) == 0)
            .collect();
        tips.sort_by(|a, b| {
            let da = dates.get(a).copied().unwrap_or(0);
            let db = dates.get(b).copied().unwrap_or(0);
            db.cmp(&da)
        });

        self.topo_state = Some(TopoState {
            indegree,
            ready: tips.into(),
            dates,
        });
        Ok(())
    }

    /// Next commit in topological order.
    fn next_topo(&mut self) -> Result<Option<ObjectId>, RevWalkError> {
        if !self.prepared {
            self.prepare_topo()?;
        }

        let oid = match self.topo_state.as_mut() {
            Some(state) => match state.ready.pop_front() {
                Some(oid) => oid,
                None => return Ok(None),
            },
            None => return Ok(None),
        };

        let meta = self.source.meta(&oid)?;
        let parents: Vec<ObjectId> = self
            .walk_parents(meta)
            .into_iter()
            .filter(|p| !self.hidden.contains(p))
            .collect();

        let state = self.topo_state.as_mut().expect("prepared above");
        let mut newly_ready: Vec<(ObjectId, i64)> = Vec::new();
        for parent in &parents {
            if let Some(deg) = state.indegree.get_mut(parent) {
                *deg = deg.saturating_sub(1);
                if *deg == 0 {
                    let date = state.dates.get(parent).copied().unwrap_or(0);
                    newly_ready.push((*parent, date));
                }
            }
        }

        // Newest first among commits that became ready together.
        newly_ready.sort_by(|a, b| b.1.cmp(&a.1));
        for (parent, _) in newly_ready {
            state.ready.push_back(parent);
        }

        Ok(Some(oid))
    }

    fn next_raw(&mut self) -> Result<Option<ObjectId>, RevWalkError> {
        match self.sort {
            SortOrder::Topological => self.next_topo(),
            SortOrder::CommitTimeDesc => self.next_date_order(),
        }
    }

    fn passes_date_filter(&self, commit_time: i64) -> bool {
        if let Some(since) = self.options.since {
            if commit_time < since {
                return false;
            }
        }
        if let Some(until) = self.options.until {
            if commit_time > until {
                return false;
            }
        }
        true
    }
}

impl Iterator for RevWalk<'_> {
    type Item = Result<ObjectId, RevWalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(max) = self.options.max_count {
            if self.emitted >= max {
                return None;
            }
        }

        loop {
            let oid = match self.next_raw() {
                Ok(Some(oid)) => oid,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };

            if self.options.since.is_some() || self.options.until.is_some() {
                let meta = match self.source.meta(&oid) {
                    Ok(m) => m,
                    Err(e) => return Some(Err(e)),
                };
                if !self.passes_date_filter(meta.commit_time) {
                    continue;
                }
            }

            // Message predicates are the one place a body is required; the
            // raw object is fetched regardless of how headers were resolved.
            if let Some(ref pattern) = self.options.grep_pattern {
                let commit = match self.source.full_commit(&oid) {
                    Ok(c) => c,
                    Err(e) => return Some(Err(e)),
                };
                if !commit.message.contains_str(pattern.as_str()) {
                    continue;
                }
            }

            if let Some(skip) = self.options.skip {
                if self.skipped < skip {
                    self.skipped += 1;
                    continue;
                }
            }

            self.emitted += 1;
            return Some(Ok(oid));
        }
    }
}

// --- Priority queue ordering ---

impl PartialEq for WalkEntry {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}

impl Eq for WalkEntry {}

impl PartialOrd for WalkEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WalkEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: newest commit date first, ties broken by
        // insertion order (earlier insertion wins).
        self.commit_date
            .cmp(&other.commit_date)
            .then_with(|| other.insertion_ctr.cmp(&self.insertion_ctr))
    }
}
