//! Well-known file and directory names.

use std::path::Path;

/// Extension every rule file must carry.
pub const RULE_EXTENSION: &str = "md";

/// Segment that marks a project-local file, never synchronized.
pub const LOCAL_MARKER: &str = ".local.";

/// Files at or above this size are skipped by the scanner.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Standard rulesync filesystem markers and paths, relative to a project
/// (or, for the config files, to the base directory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSyncPath {
    /// Per-project directory holding the manifests
    ManifestDir,
    /// Line-oriented allow-list manifest
    AllowList,
    /// Condition manifest
    ConditionManifest,
    /// Local override for the condition manifest
    LocalOverride,
    /// Shared configuration in the base directory
    Config,
    /// Uncommitted configuration overrides in the base directory
    LocalConfig,
}

impl RuleSyncPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManifestDir => ".rulesync",
            Self::AllowList => ".rulesync/manifest.txt",
            Self::ConditionManifest => ".rulesync/manifest.json",
            Self::LocalOverride => ".rulesync/manifest.local.json",
            Self::Config => ".rulesync.toml",
            Self::LocalConfig => ".rulesync.local.toml",
        }
    }
}

impl AsRef<Path> for RuleSyncPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for RuleSyncPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for RuleSyncPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a relative path names a project-local file.
pub fn is_local_path(relative_path: &str) -> bool {
    relative_path.contains(LOCAL_MARKER)
}

/// Whether a relative path has the rule-file extension.
pub fn has_rule_extension(relative_path: &str) -> bool {
    Path::new(relative_path)
        .extension()
        .is_some_and(|ext| ext == RULE_EXTENSION)
}
