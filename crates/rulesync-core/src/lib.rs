//! Multi-project rule-file reconciliation
//!
//! Given several project directories, each holding `.md` rule files, this
//! crate computes and applies the copies, updates and deletions that bring
//! them to the same content, within each project's manifest-defined scope.
//!
//! # Architecture
//!
//! ```text
//!   discovery ──> scanner ──> manifest (scope) ──> reconcile ──> executor
//!       │                                              │
//!   rulesync-fs (path security, checksums, atomic writes, config store)
//! ```
//!
//! [`SyncEngine`] runs the whole pipeline; every stage is also usable on its
//! own.
//!
//! # Example
//!
//! ```ignore
//! use rulesync_core::{ScriptedPrompter, SyncEngine, SyncOptions};
//!
//! let options = SyncOptions {
//!     base_dir: Some("/work".into()),
//!     auto_confirm: true,
//!     ..SyncOptions::default()
//! };
//! let report = SyncEngine::new(options).run(&mut ScriptedPrompter::default())?;
//! println!("{} added, {} updated", report.added, report.updated);
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod patterns;
pub mod reconcile;
pub mod scanner;
pub mod sync;

pub use config::{ConfigResolver, PartialOptions, SyncOptions};
pub use discovery::{ProjectInfo, discover_projects, resolve_projects, validate_projects};
pub use error::{Error, Result};
pub use executor::{ActionFailure, ActionOutcome, ExecuteOptions, ExecutionReport, execute_actions};
pub use manifest::{
    AllowListManifest, AllowListScope, ConditionManifest, ConditionScope, LocalManifestOverride,
    OrphanedEntry, ProjectScope, ScopePlan, ScopeResolver, ScopeStrategy,
};
pub use patterns::{ExpandedPattern, expand_pattern, expand_patterns};
pub use reconcile::{
    ActionKind, ConflictPolicy, GlobalFileState, NoPrompt, Prompter, Reconciler, ScriptedPrompter,
    SyncAction, scan_all_projects,
};
pub use scanner::{FileInfo, ProjectScan, ScanOptions, resolve_rule_files, scan};
pub use sync::{SyncEngine, SyncReport};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn path_errors_are_distinguishable() {
        let missing = Error::PathNotFound {
            path: PathBuf::from("/work/gone"),
        };
        let file = Error::NotADirectory {
            path: PathBuf::from("/work/notes.md"),
        };
        assert!(missing.to_string().contains("does not exist"));
        assert!(file.to_string().contains("is not a directory"));
    }

    #[test]
    fn all_scans_failed_message() {
        assert_eq!(
            Error::AllScansFailed.to_string(),
            "No projects could be successfully scanned."
        );
    }

    #[test]
    fn security_errors_are_flagged() {
        let err = Error::from(rulesync_fs::Error::PathTraversal {
            path: "../x".to_string(),
        });
        assert!(err.is_security());
        assert!(!Error::AllScansFailed.is_security());
    }
}
