//! Applies sync actions to disk
//!
//! Real runs and dry runs share one code path: a dry run performs every
//! read-only check a real run would (target resolution, source re-hash,
//! writability) and stops before the mutation.

use rulesync_fs::{NormalizedPath, RobustnessConfig, checksum, io, security};
use serde::Serialize;

use crate::Result;
use crate::reconcile::{ActionKind, SyncAction};

/// Options for [`execute_actions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    pub robustness: RobustnessConfig,
}

/// An action that was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action: SyncAction,
    /// Human-readable description, prefixed `[dry-run]` when nothing changed
    pub message: String,
}

/// An action that failed (or, in a dry run, would fail).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub action: SyncAction,
    pub message: String,
}

/// Outcome of [`execute_actions`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    /// False when any action failed
    pub success: bool,
    pub dry_run: bool,
    /// Every attempted action, failed ones included
    pub written: Vec<ActionOutcome>,
    pub failures: Vec<ActionFailure>,
}

#[derive(Debug, thiserror::Error)]
enum ActionError {
    #[error("source changed since scan: {path}")]
    SourceChanged { path: NormalizedPath },

    #[error("action has no source file")]
    MissingSource,

    #[error("target does not exist: {path}")]
    TargetMissing { path: NormalizedPath },

    #[error(transparent)]
    Fs(#[from] rulesync_fs::Error),
}

/// Apply `actions` in order. Individual failures are recorded and never stop
/// the remaining actions.
///
/// # Errors
///
/// Fails before touching anything if any target path escapes its project
/// directory.
pub fn execute_actions(actions: &[SyncAction], options: &ExecuteOptions) -> Result<ExecutionReport> {
    let targets = actions
        .iter()
        .map(|action| {
            security::contain(&action.relative_path, action.payload.target_dir.to_native())
        })
        .collect::<rulesync_fs::Result<Vec<_>>>()?;

    let mut report = ExecutionReport {
        success: true,
        dry_run: options.dry_run,
        ..ExecutionReport::default()
    };

    for (action, target) in actions.iter().zip(targets) {
        let result = match action.kind {
            ActionKind::Add | ActionKind::Update => copy_file(action, &target, options),
            ActionKind::Delete => delete_file(&target, options),
        };
        let verb = action.kind;

        let message = match &result {
            Ok(()) if options.dry_run => format!("[dry-run] Would {verb} {target}"),
            Ok(()) => format!("{} {target}", past_tense(action.kind)),
            Err(e) if options.dry_run => format!("[dry-run] Would fail to {verb} {target}: {e}"),
            Err(e) => format!("Failed to {verb} {target}: {e}"),
        };

        if let Err(e) = result {
            tracing::error!(action = %action, error = %e, "Action failed");
            report.success = false;
            report.failures.push(ActionFailure {
                action: action.clone(),
                message: e.to_string(),
            });
        } else {
            tracing::debug!(action = %action, dry_run = options.dry_run, "Action applied");
        }
        report.written.push(ActionOutcome {
            action: action.clone(),
            message,
        });
    }

    tracing::info!(
        attempted = report.written.len(),
        failed = report.failures.len(),
        dry_run = options.dry_run,
        "Execution complete"
    );
    Ok(report)
}

fn past_tense(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Add => "Added",
        ActionKind::Update => "Updated",
        ActionKind::Delete => "Deleted",
    }
}

fn copy_file(
    action: &SyncAction,
    target: &NormalizedPath,
    options: &ExecuteOptions,
) -> std::result::Result<(), ActionError> {
    let source = action
        .payload
        .source_path
        .as_ref()
        .ok_or(ActionError::MissingSource)?;
    let content = io::read_bytes(source)?;
    if let Some(expected) = &action.payload.content_hash
        && &checksum::compute_bytes_checksum(&content) != expected
    {
        return Err(ActionError::SourceChanged {
            path: source.clone(),
        });
    }

    if options.dry_run {
        io::probe_writable(target)?;
        return Ok(());
    }
    io::write_atomic(target, &content, options.robustness)?;
    Ok(())
}

fn delete_file(target: &NormalizedPath, options: &ExecuteOptions) -> std::result::Result<(), ActionError> {
    if !target.is_file() {
        return Err(ActionError::TargetMissing {
            path: target.clone(),
        });
    }
    if options.dry_run {
        return Ok(());
    }
    io::remove_file(target, options.robustness)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProjectInfo;
    use crate::scanner::FileInfo;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn project(root: &TempDir, name: &str) -> ProjectInfo {
        let dir = root.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        ProjectInfo::new(name, dunce::canonicalize(&dir).unwrap())
    }

    fn source(project: &ProjectInfo, rel: &str, content: &str) -> FileInfo {
        let path = project.path.join(rel);
        fs::create_dir_all(path.parent().unwrap().to_native()).unwrap();
        fs::write(path.to_native(), content).unwrap();
        FileInfo {
            relative_path: rel.to_string(),
            absolute_path: path,
            content_hash: checksum::compute_content_checksum(content),
            is_local: false,
            size: content.len() as u64,
            mtime: SystemTime::now(),
        }
    }

    #[test]
    fn add_creates_missing_directories() {
        let root = TempDir::new().unwrap();
        let a = project(&root, "a");
        let b = project(&root, "b");
        let file = source(&a, ".clinerules/deep/x.md", "1");

        let action = SyncAction::copy(ActionKind::Add, "a", &file, &b);
        let report = execute_actions(&[action], &ExecuteOptions::default()).unwrap();

        assert!(report.success);
        let written = fs::read_to_string(b.path.join(".clinerules/deep/x.md").to_native()).unwrap();
        assert_eq!(written, "1");
    }

    #[test]
    fn changed_source_fails_without_stopping_others() {
        let root = TempDir::new().unwrap();
        let a = project(&root, "a");
        let b = project(&root, "b");
        let stale = source(&a, "x.md", "1");
        let fresh = source(&a, "y.md", "2");
        fs::write(stale.absolute_path.to_native(), "edited").unwrap();

        let actions = vec![
            SyncAction::copy(ActionKind::Add, "a", &stale, &b),
            SyncAction::copy(ActionKind::Add, "a", &fresh, &b),
        ];
        let report = execute_actions(&actions, &ExecuteOptions::default()).unwrap();

        assert!(!report.success);
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("source changed since scan"));
        assert!(b.path.join("y.md").is_file());
        assert!(!b.path.join("x.md").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let root = TempDir::new().unwrap();
        let a = project(&root, "a");
        let b = project(&root, "b");
        let file = source(&a, "x.md", "1");
        let victim = source(&b, "old.md", "bye");

        let actions = vec![
            SyncAction::copy(ActionKind::Add, "a", &file, &b),
            SyncAction::delete(&victim.relative_path, &b),
        ];
        let options = ExecuteOptions {
            dry_run: true,
            ..ExecuteOptions::default()
        };
        let report = execute_actions(&actions, &options).unwrap();

        assert!(report.success);
        assert!(report.written.iter().all(|o| o.message.starts_with("[dry-run]")));
        assert!(!b.path.join("x.md").exists());
        assert!(b.path.join("old.md").is_file());
    }

    #[test]
    fn dry_run_reports_missing_delete_target() {
        let root = TempDir::new().unwrap();
        let b = project(&root, "b");
        let options = ExecuteOptions {
            dry_run: true,
            ..ExecuteOptions::default()
        };
        let report = execute_actions(&[SyncAction::delete("gone.md", &b)], &options).unwrap();
        assert!(!report.success);
        assert_eq!(report.written.len(), 1);
    }

    #[test]
    fn escaping_target_is_fatal() {
        let root = TempDir::new().unwrap();
        let b = project(&root, "b");
        let result = execute_actions(&[SyncAction::delete("../outside.md", &b)], &ExecuteOptions::default());
        assert!(result.unwrap_err().is_security());
    }
}
