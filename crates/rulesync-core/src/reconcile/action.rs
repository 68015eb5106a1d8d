//! Units of convergence work

use rulesync_fs::NormalizedPath;
use serde::Serialize;

use crate::discovery::ProjectInfo;
use crate::scanner::FileInfo;

/// Kind of change an action makes to its target project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Update,
    Delete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// Where an action reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPayload {
    /// Source file for add/update
    pub source_path: Option<NormalizedPath>,
    /// Directory of the target project; the target file is
    /// `relative_path` resolved against it
    pub target_dir: NormalizedPath,
    /// Hash the source had when it was scanned
    pub content_hash: Option<String>,
}

/// One add, update or delete against one target project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncAction {
    pub kind: ActionKind,
    pub relative_path: String,
    pub source_project: Option<String>,
    pub target_project: String,
    pub payload: ActionPayload,
}

impl SyncAction {
    /// Copy `source` (held by `source_project`) into `target`.
    pub fn copy(
        kind: ActionKind,
        source_project: &str,
        source: &FileInfo,
        target: &ProjectInfo,
    ) -> Self {
        Self {
            kind,
            relative_path: source.relative_path.clone(),
            source_project: Some(source_project.to_string()),
            target_project: target.name.clone(),
            payload: ActionPayload {
                source_path: Some(source.absolute_path.clone()),
                target_dir: target.path.clone(),
                content_hash: Some(source.content_hash.clone()),
            },
        }
    }

    /// Remove `relative_path` from `target`.
    pub fn delete(relative_path: impl Into<String>, target: &ProjectInfo) -> Self {
        Self {
            kind: ActionKind::Delete,
            relative_path: relative_path.into(),
            source_project: None,
            target_project: target.name.clone(),
            payload: ActionPayload {
                source_path: None,
                target_dir: target.path.clone(),
                content_hash: None,
            },
        }
    }

    /// The target file path, unchecked.
    pub fn target_path(&self) -> NormalizedPath {
        self.payload.target_dir.join(&self.relative_path)
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_project {
            Some(source) => write!(
                f,
                "{} {} ({} -> {})",
                self.kind, self.relative_path, source, self.target_project
            ),
            None => write!(f, "{} {} ({})", self.kind, self.relative_path, self.target_project),
        }
    }
}
