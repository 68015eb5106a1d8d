//! Converging `manifest.json` itself before conditions are evaluated

use std::time::SystemTime;

use rulesync_fs::{RuleSyncPath, checksum, io};

use crate::discovery::ProjectInfo;
use crate::reconcile::{ActionKind, SyncAction};
use crate::scanner::FileInfo;

/// One project's copy of the condition manifest.
#[derive(Debug, Clone)]
pub struct ManifestCopy {
    pub project: String,
    pub file: FileInfo,
}

/// The newest manifest and the updates bringing every differing carrier to it.
#[derive(Debug, Clone)]
pub struct ManifestConvergence {
    pub source_project: String,
    /// Content of the newest manifest
    pub content: String,
    pub actions: Vec<SyncAction>,
}

fn read_copy(project: &ProjectInfo) -> Option<ManifestCopy> {
    let relative = RuleSyncPath::ConditionManifest.as_str();
    let path = project.path.join(relative);
    if !path.is_file() {
        return None;
    }
    let native = path.to_native();
    let read = std::fs::metadata(&native).and_then(|meta| {
        let mtime = meta.modified()?;
        let hash = checksum::compute_file_checksum(&native)?;
        Ok((meta.len(), mtime, hash))
    });
    match read {
        Ok((size, mtime, content_hash)) => Some(ManifestCopy {
            project: project.name.clone(),
            file: FileInfo {
                relative_path: relative.to_string(),
                absolute_path: path,
                content_hash,
                is_local: false,
                size,
                mtime,
            },
        }),
        Err(e) => {
            tracing::warn!(project = %project.name, error = %e, "Cannot read condition manifest, leaving it out of convergence");
            None
        }
    }
}

/// Plan convergence of `manifest.json` across the projects carrying one.
///
/// Returns `None` when fewer than two distinct contents exist. The newest
/// copy wins, ties going to the earlier project; projects without a manifest
/// are left alone.
pub fn plan_manifest_convergence(projects: &[ProjectInfo]) -> Option<ManifestConvergence> {
    let copies: Vec<(&ProjectInfo, ManifestCopy)> = projects
        .iter()
        .filter_map(|p| read_copy(p).map(|c| (p, c)))
        .collect();

    let (_, newest) = copies.iter().fold(None::<(SystemTime, &ManifestCopy)>, |best, (_, copy)| {
        match best {
            Some((t, _)) if copy.file.mtime <= t => best,
            _ => Some((copy.file.mtime, copy)),
        }
    })?;

    let hash = &newest.file.content_hash;
    if copies.iter().all(|(_, c)| &c.file.content_hash == hash) {
        return None;
    }

    let content = match io::read_text(&newest.file.absolute_path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(project = %newest.project, error = %e, "Cannot read newest condition manifest");
            return None;
        }
    };

    let actions = copies
        .iter()
        .filter(|(_, c)| &c.file.content_hash != hash)
        .map(|(project, _)| SyncAction::copy(ActionKind::Update, &newest.project, &newest.file, project))
        .collect();

    tracing::info!(source = %newest.project, "Condition manifests differ, converging on the newest");
    Some(ManifestConvergence {
        source_project: newest.project.clone(),
        content,
        actions,
    })
}

