//! Scratch directories for snapshot, config, and script files.

// Setup failures in tests should panic.
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory removed on drop.
///
/// # Example
///
/// ```
/// use passport_ledger_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let script = dir.write_file("ops.json", "[]");
/// assert!(script.exists());
/// assert!(!dir.snapshot_path().exists());
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Creates an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("create scratch directory");
        Self { inner }
    }

    /// Root of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// `relative` resolved inside the directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.inner.path().join(relative)
    }

    /// Location for a ledger state file. Nothing is created.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.join("ledger.snap")
    }

    /// Writes `contents` to `name` and returns its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        std::fs::write(&path, contents).expect("write scratch file");
        path
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
