//! Result surface of a sync pass

use serde::Serialize;

use crate::executor::{ActionFailure, ActionOutcome, ExecutionReport};
use crate::manifest::OrphanedEntry;
use crate::reconcile::{ActionKind, Conflict, ExtraneousFile, ScanFailure};
use crate::scanner::SkippedFile;

/// A file a project's scan matched but left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub project: String,
    #[serde(flatten)]
    pub file: SkippedFile,
}

/// Report from a sync pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// False when any action failed (or would fail, in a dry run)
    pub success: bool,
    pub dry_run: bool,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub orphaned: Vec<OrphanedEntry>,
    pub extraneous: Vec<ExtraneousFile>,
    pub conflicts: Vec<Conflict>,
    pub skipped_files: Vec<SkippedEntry>,
    pub scan_failures: Vec<ScanFailure>,
    pub failures: Vec<ActionFailure>,
    /// Every attempted action in execution order
    pub actions: Vec<ActionOutcome>,
}

impl SyncReport {
    /// Report of a pass that had nothing to do.
    pub fn empty(dry_run: bool) -> Self {
        Self {
            success: true,
            dry_run,
            ..Self::default()
        }
    }

    /// Fold an execution's outcomes into the report.
    pub fn absorb(&mut self, execution: ExecutionReport) {
        self.success &= execution.success;
        for outcome in &execution.written {
            let failed = execution.failures.iter().any(|f| f.action == outcome.action);
            if failed {
                continue;
            }
            match outcome.action.kind {
                ActionKind::Add => self.added += 1,
                ActionKind::Update => self.updated += 1,
                ActionKind::Delete => self.deleted += 1,
            }
        }
        self.actions.extend(execution.written);
        self.failures.extend(execution.failures);
    }

    /// Whether the pass changed (or would change) anything.
    pub fn has_changes(&self) -> bool {
        self.added + self.updated + self.deleted > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProjectInfo;
    use crate::reconcile::SyncAction;

    #[test]
    fn absorb_counts_only_successful_actions() {
        let target = ProjectInfo::new("b", "/work/b");
        let ok = SyncAction::delete("x.md", &target);
        let bad = SyncAction::delete("y.md", &target);
        let execution = ExecutionReport {
            success: false,
            dry_run: false,
            written: vec![
                ActionOutcome {
                    action: ok.clone(),
                    message: "Deleted x.md".to_string(),
                },
                ActionOutcome {
                    action: bad.clone(),
                    message: "Failed".to_string(),
                },
            ],
            failures: vec![ActionFailure {
                action: bad,
                message: "denied".to_string(),
            }],
        };

        let mut report = SyncReport::empty(false);
        report.absorb(execution);
        assert!(!report.success);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.actions.len(), 2);
        assert!(report.has_changes());
    }
}
