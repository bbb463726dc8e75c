//! LRU cache for parsed commits.

use std::num::NonZeroUsize;

use git_hash::ObjectId;
use lru::LruCache;

use crate::Commit;

/// Default number of commits retained by a [`CommitCache`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// LRU cache for parsed commits, keyed by OID.
///
/// Used by the traversal layer's raw-object fallback path so repeated header
/// and message lookups do not re-read the object database.
pub struct CommitCache {
    cache: LruCache<ObjectId, Commit>,
}

impl CommitCache {
    /// Create with the given capacity (number of commits).
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            ),
        }
    }

    /// Get a cached commit (promotes it to most-recently-used).
    pub fn get(&mut self, oid: &ObjectId) -> Option<&Commit> {
        self.cache.get(oid)
    }

    /// Insert a commit. Returns the evicted entry if the cache was full.
    pub fn insert(&mut self, oid: ObjectId, commit: Commit) -> Option<(ObjectId, Commit)> {
        self.cache.push(oid, commit)
    }

    /// Check for an OID without promoting it.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.cache.contains(oid)
    }

    /// Current number of cached commits.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop all cached commits.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for CommitCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SigDate, Signature};
    use bstr::BString;
    use git_hash::HashAlgorithm;

    fn make_oid(n: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        ObjectId::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap()
    }

    fn make_commit(n: u8) -> Commit {
        let sig = Signature {
            name: BString::from("T"),
            email: BString::from("t@x"),
            date: SigDate::new(n as i64, 0),
        };
        Commit {
            tree: make_oid(0xf0),
            parents: vec![],
            author: sig.clone(),
            committer: sig,
            message: BString::from(format!("commit {n}")),
        }
    }

    #[test]
    fn insert_and_get() {
        let mut cache = CommitCache::new(4);
        cache.insert(make_oid(1), make_commit(1));
        assert!(cache.contains(&make_oid(1)));
        assert_eq!(cache.get(&make_oid(1)).unwrap().commit_time(), 1);
        assert!(cache.get(&make_oid(2)).is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = CommitCache::new(2);
        cache.insert(make_oid(1), make_commit(1));
        cache.insert(make_oid(2), make_commit(2));
        // Touch 1 so 2 becomes the eviction candidate.
        cache.get(&make_oid(1));
        cache.insert(make_oid(3), make_commit(3));
        assert!(cache.contains(&make_oid(1)));
        assert!(!cache.contains(&make_oid(2)));
        assert!(cache.contains(&make_oid(3)));
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = CommitCache::new(4);
        cache.insert(make_oid(1), make_commit(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
