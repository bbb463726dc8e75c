use std::collections::HashMap;

use git_hash::{HashAlgorithm, ObjectId};
use git_object::{Commit, ObjectType};

use crate::{ObjectInfo, OdbBackend, OdbError};

/// In-memory object database.
///
/// Holds parsed commits keyed by id, plus type markers for non-commit
/// objects so `NotACommit` behavior can be exercised. Objects are inserted
/// up front; reads take `&self`, so a populated store can be shared across
/// threads.
#[derive(Default)]
pub struct MemoryOdb {
    commits: HashMap<ObjectId, Commit>,
    others: HashMap<ObjectId, ObjectInfo>,
}

impl MemoryOdb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a commit under an explicit id.
    pub fn insert_commit(&mut self, oid: ObjectId, commit: Commit) {
        self.commits.insert(oid, commit);
    }

    /// Insert a commit under its computed content hash and return the id.
    pub fn add_commit(&mut self, commit: Commit) -> ObjectId {
        let oid = commit
            .compute_id(HashAlgorithm::Sha1)
            .expect("hashing an in-memory commit cannot fail");
        self.commits.insert(oid, commit);
        oid
    }

    /// Insert a non-commit placeholder (tree, blob, tag) of the given size.
    pub fn insert_other(&mut self, oid: ObjectId, obj_type: ObjectType, size: usize) {
        self.others.insert(oid, ObjectInfo { obj_type, size });
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.commits.len() + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && self.others.is_empty()
    }
}

impl OdbBackend for MemoryOdb {
    fn read_commit(&self, oid: &ObjectId) -> Result<Commit, OdbError> {
        if let Some(commit) = self.commits.get(oid) {
            return Ok(commit.clone());
        }
        if self.others.contains_key(oid) {
            return Err(OdbError::NotACommit(*oid));
        }
        Err(OdbError::NotFound(*oid))
    }

    fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError> {
        if let Some(commit) = self.commits.get(oid) {
            return Ok(Some(ObjectInfo {
                obj_type: ObjectType::Commit,
                size: commit.serialize_content().len(),
            }));
        }
        Ok(self.others.get(oid).copied())
    }

    fn contains(&self, oid: &ObjectId) -> bool {
        self.commits.contains_key(oid) || self.others.contains_key(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use git_object::{SigDate, Signature};

    fn make_oid(n: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        ObjectId::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap()
    }

    fn make_commit(time: i64) -> Commit {
        let sig = Signature {
            name: BString::from("T"),
            email: BString::from("t@x"),
            date: SigDate::new(time, 0),
        };
        Commit {
            tree: make_oid(0xf0),
            parents: vec![],
            author: sig.clone(),
            committer: sig,
            message: BString::from("m"),
        }
    }

    #[test]
    fn read_commit_roundtrip() {
        let mut odb = MemoryOdb::new();
        let oid = make_oid(1);
        odb.insert_commit(oid, make_commit(42));

        assert!(odb.contains(&oid));
        let commit = odb.read_commit(&oid).unwrap();
        assert_eq!(commit.commit_time(), 42);
    }

    #[test]
    fn missing_object_is_not_found() {
        let odb = MemoryOdb::new();
        let err = odb.read_commit(&make_oid(9)).unwrap_err();
        assert!(matches!(err, OdbError::NotFound(_)));
        assert!(!odb.contains(&make_oid(9)));
    }

    #[test]
    fn non_commit_is_rejected() {
        let mut odb = MemoryOdb::new();
        let oid = make_oid(2);
        odb.insert_other(oid, ObjectType::Tree, 64);

        assert!(odb.contains(&oid));
        let err = odb.read_commit(&oid).unwrap_err();
        assert!(matches!(err, OdbError::NotACommit(_)));

        let info = odb.read_header(&oid).unwrap().unwrap();
        assert_eq!(info.obj_type, ObjectType::Tree);
        assert_eq!(info.size, 64);
    }

    #[test]
    fn add_commit_uses_content_hash() {
        let mut odb = MemoryOdb::new();
        let oid = odb.add_commit(make_commit(1));
        let same = make_commit(1).compute_id(HashAlgorithm::Sha1).unwrap();
        assert_eq!(oid, same);
        assert!(odb.contains(&oid));
    }
}
