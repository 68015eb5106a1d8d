//! [`TestWorkspace`] builder for multi-project reconciliation scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// Fixed point all scripted modification times are offset from, so that
/// "older" and "newer" never depend on wall-clock time.
const EPOCH_OFFSET: u64 = 1_700_000_000;

/// A temporary base directory holding any number of project directories.
///
/// # Example
///
/// ```rust,no_run
/// use rulesync_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.write_at("alpha", ".clinerules/style.md", "tabs", 10);
/// ws.project("beta");
/// ws.assert_missing("beta", ".clinerules/style.md");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
    root: PathBuf,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty base directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp_dir.path()).unwrap();
        Self { temp_dir, root }
    }

    /// Canonical path of the base directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying temporary directory.
    pub fn temp_dir(&self) -> &TempDir {
        &self.temp_dir
    }

    /// Create (if needed) and return the project directory `name`.
    pub fn project(&self, name: &str) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .unwrap_or_else(|e| panic!("TestWorkspace::project: cannot create {name}: {e}"));
        dir
    }

    /// Path of `rel` inside project `name`, without creating anything.
    pub fn path(&self, name: &str, rel: &str) -> PathBuf {
        self.root.join(name).join(rel)
    }

    /// Write `content` to `rel` inside project `name`.
    pub fn write(&self, name: &str, rel: &str, content: &str) -> PathBuf {
        let path = self.path(name, rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("TestWorkspace::write: {}: {e}", path.display()));
        path
    }

    /// Write `content` and set its modification time to `secs` after a
    /// fixed epoch.
    pub fn write_at(&self, name: &str, rel: &str, content: &str, secs: u64) -> PathBuf {
        let path = self.write(name, rel, content);
        self.set_mtime(name, rel, secs);
        path
    }

    /// Set the modification time of an existing file to `secs` after a fixed
    /// epoch.
    pub fn set_mtime(&self, name: &str, rel: &str, secs: u64) {
        let path = self.path(name, rel);
        let file = fs::File::options()
            .write(true)
            .open(&path)
            .unwrap_or_else(|e| panic!("TestWorkspace::set_mtime: {}: {e}", path.display()));
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(EPOCH_OFFSET + secs);
        file.set_modified(time).unwrap();
    }

    /// Content of `rel` in project `name`, `None` if it does not exist.
    pub fn read(&self, name: &str, rel: &str) -> Option<String> {
        fs::read_to_string(self.path(name, rel)).ok()
    }

    /// Write `.rulesync/manifest.txt` with one entry per line.
    pub fn allow_list(&self, name: &str, entries: &[&str]) -> PathBuf {
        let mut content = entries.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        self.write(name, ".rulesync/manifest.txt", &content)
    }

    /// Write `.rulesync/manifest.json` verbatim.
    pub fn condition_manifest(&self, name: &str, json: &str) -> PathBuf {
        self.write(name, ".rulesync/manifest.json", json)
    }

    /// Write `.rulesync/manifest.local.json` verbatim.
    pub fn local_override(&self, name: &str, json: &str) -> PathBuf {
        self.write(name, ".rulesync/manifest.local.json", json)
    }

    /// Assert that `rel` in project `name` holds exactly `content`.
    ///
    /// # Panics
    /// Panics with a descriptive message if the file is missing or differs.
    pub fn assert_file(&self, name: &str, rel: &str, content: &str) {
        let path = self.path(name, rel);
        let actual = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Expected file to exist: {}", path.display()));
        assert_eq!(
            actual,
            content,
            "Unexpected content in {}",
            path.display()
        );
    }

    /// Assert that `rel` in project `name` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_missing(&self, name: &str, rel: &str) {
        let path = self.path(name, rel);
        assert!(
            !path.exists(),
            "Expected file NOT to exist: {}",
            path.display()
        );
    }
}
