use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{Result, UtilError};

/// A file being assembled that either lands atomically or vanishes.
///
/// The target path is fixed at creation; bytes accumulate in an anonymous
/// sibling in the target's directory (so the final rename cannot cross
/// filesystems), and [`commit`](PendingFile::commit) renames it into place.
/// Dropping an uncommitted `PendingFile` deletes the sibling, which is how
/// a cancelled or failed graph write leaves nothing behind for readers to
/// trip over.
pub struct PendingFile {
    inner: Option<::tempfile::NamedTempFile>,
    target: PathBuf,
}

impl PendingFile {
    /// Start assembling a replacement for `target`, creating its parent
    /// directory if needed.
    pub fn for_target(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = target.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        Ok(Self {
            inner: Some(::tempfile::NamedTempFile::new_in(dir)?),
            target,
        })
    }

    /// Where the file will land when committed.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path the bytes are accumulating at, while uncommitted.
    pub fn path(&self) -> &Path {
        self.inner.as_ref().map(|n| n.path()).unwrap_or(Path::new(""))
    }

    /// Atomically rename the assembled file onto its target.
    pub fn commit(mut self) -> Result<()> {
        if let Some(named) = self.inner.take() {
            named.persist(&self.target).map_err(|e| UtilError::Persist {
                target: self.target.clone(),
                source: e.error,
            })?;
        }
        Ok(())
    }
}

impl Write for PendingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("pending file already committed"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("pending file already committed"))?
            .flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_lands_on_target() {
        let dir = ::tempfile::tempdir().unwrap();
        let target = dir.path().join("info").join("commit-graph");

        let mut pending = PendingFile::for_target(&target).unwrap();
        assert_eq!(pending.target(), target);
        pending.write_all(b"CGPH").unwrap();
        pending.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"CGPH");
    }

    #[test]
    fn drop_without_commit_leaves_nothing() {
        let dir = ::tempfile::tempdir().unwrap();
        let target = dir.path().join("commit-graph");
        let staged;

        {
            let mut pending = PendingFile::for_target(&target).unwrap();
            staged = pending.path().to_path_buf();
            pending.write_all(b"partial").unwrap();
            assert!(staged.exists());
        }

        assert!(!staged.exists());
        assert!(!target.exists());
    }

    #[test]
    fn assembles_in_target_directory() {
        let dir = ::tempfile::tempdir().unwrap();
        let target = dir.path().join("sub").join("graph");

        let pending = PendingFile::for_target(&target).unwrap();
        assert_eq!(pending.path().parent(), target.parent());
    }

    #[test]
    fn commit_overwrites_existing_file() {
        let dir = ::tempfile::tempdir().unwrap();
        let target = dir.path().join("commit-graph");
        fs::write(&target, b"stale").unwrap();

        let mut pending = PendingFile::for_target(&target).unwrap();
        pending.write_all(b"fresh").unwrap();
        pending.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"fresh");
    }
}
