//! Per-request scratch directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// A uniquely named directory under the scratch root holding the decoded
/// images of one request. The directory and everything in it is removed when
/// the value is dropped.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    next: usize,
}

impl ScratchSpace {
    /// Create the scratch root if needed, then a fresh subdirectory in it.
    pub fn create(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = root.join(Uuid::new_v4().to_string());
        fs::create_dir(&dir)?;
        Ok(Self { dir, next: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Next file name in sequence: `1output.png`, `2output.jpg`, ...
    pub fn next_file(&mut self, extension: &str) -> PathBuf {
        self.next += 1;
        self.dir.join(format!("{}output.{extension}", self.next))
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.dir) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(
                    dir = %self.dir.display(),
                    error = %err,
                    "failed to remove scratch directory"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sequential_within_a_space() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::create(root.path()).unwrap();

        let first = scratch.next_file("png");
        let second = scratch.next_file("jpg");
        assert_eq!(first.file_name().unwrap(), "1output.png");
        assert_eq!(second.file_name().unwrap(), "2output.jpg");
        assert_eq!(first.parent(), Some(scratch.path()));
    }

    #[test]
    fn spaces_do_not_share_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchSpace::create(root.path()).unwrap();
        let b = ScratchSpace::create(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn drop_removes_directory_and_contents() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::create(root.path()).unwrap();
        let file = scratch.next_file("png");
        fs::write(&file, b"data").unwrap();
        let dir = scratch.path().to_path_buf();

        drop(scratch);
        assert!(!dir.exists());
        assert!(root.path().exists());
    }

    #[test]
    fn create_makes_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("tmp");
        let scratch = ScratchSpace::create(&root).unwrap();
        assert!(scratch.path().starts_with(&root));
    }
}
