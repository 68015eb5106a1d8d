//! Cross-project file state
//!
//! Every project is scanned independently (in parallel); the results are then
//! folded, in project order, into one [`GlobalFileState`] per relative path.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use rayon::prelude::*;
use serde::Serialize;

use crate::discovery::ProjectInfo;
use crate::patterns::{ExcludeMatcher, RuleMatcher};
use crate::scanner::{self, FileInfo, ProjectScan, ScanOptions, SkippedFile};
use crate::{Error, Result};

/// A file attributed to the project holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVersion {
    pub project_name: String,
    pub file_info: FileInfo,
    pub last_modified: SystemTime,
}

/// Projects sharing one content hash for a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentGroup {
    pub content_hash: String,
    /// Holders, in project order
    pub projects: Vec<String>,
    /// Most recently modified holder
    pub representative: String,
}

/// One relative path across every project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalFileState {
    pub relative_path: String,
    pub versions: BTreeMap<String, FileVersion>,
    /// Projects without this path, in project order
    pub missing_from: Vec<String>,
    pub newest_version: FileVersion,
    pub all_identical: bool,
    holder_order: Vec<String>,
}

impl GlobalFileState {
    /// Holders in project order.
    pub fn holders(&self) -> impl Iterator<Item = &FileVersion> {
        self.holder_order.iter().filter_map(|p| self.versions.get(p))
    }

    pub fn version(&self, project: &str) -> Option<&FileVersion> {
        self.versions.get(project)
    }

    /// Distinct contents, the group holding the newest version first and the
    /// rest by first appearance in project order.
    pub fn content_groups(&self) -> Vec<ContentGroup> {
        let mut groups: Vec<ContentGroup> = Vec::new();
        let mut group_newest: Vec<SystemTime> = Vec::new();
        for version in self.holders() {
            let hash = &version.file_info.content_hash;
            match groups.iter().position(|g| &g.content_hash == hash) {
                Some(idx) => {
                    groups[idx].projects.push(version.project_name.clone());
                    if version.last_modified > group_newest[idx] {
                        group_newest[idx] = version.last_modified;
                        groups[idx].representative = version.project_name.clone();
                    }
                }
                None => {
                    groups.push(ContentGroup {
                        content_hash: hash.clone(),
                        projects: vec![version.project_name.clone()],
                        representative: version.project_name.clone(),
                    });
                    group_newest.push(version.last_modified);
                }
            }
        }

        let newest_hash = &self.newest_version.file_info.content_hash;
        if let Some(idx) = groups.iter().position(|g| &g.content_hash == newest_hash) {
            let newest = groups.remove(idx);
            groups.insert(0, newest);
        }
        groups
    }
}

/// A project whose scan failed this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub project: String,
    pub message: String,
}

/// Inputs shared by every per-project scan.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub rule_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_file_size: u64,
}

/// Outcome of scanning every project.
#[derive(Debug, Clone, Default)]
pub struct GlobalScan {
    pub states: BTreeMap<String, GlobalFileState>,
    /// Successful scans keyed by project name
    pub scans: BTreeMap<String, ProjectScan>,
    pub failures: Vec<ScanFailure>,
}

impl GlobalScan {
    /// Every non-local relative path held by some project.
    pub fn known_paths(&self) -> BTreeSet<String> {
        self.states.keys().cloned().collect()
    }

    /// Files matched but left out, as `(project, file)` pairs.
    pub fn skipped(&self) -> Vec<(String, SkippedFile)> {
        self.scans
            .iter()
            .flat_map(|(project, scan)| {
                scan.skipped
                    .iter()
                    .map(move |s| (project.clone(), s.clone()))
            })
            .collect()
    }
}

/// Fold completed scans into per-path state. Projects missing from `scans`
/// contribute nothing and show up in every `missing_from`.
pub fn merge_scans(
    projects: &[ProjectInfo],
    scans: &BTreeMap<String, ProjectScan>,
) -> BTreeMap<String, GlobalFileState> {
    let mut holders: BTreeMap<String, Vec<FileVersion>> = BTreeMap::new();
    for project in projects {
        let Some(scan) = scans.get(&project.name) else {
            continue;
        };
        for info in scan.files.values().filter(|f| !f.is_local) {
            holders
                .entry(info.relative_path.clone())
                .or_default()
                .push(FileVersion {
                    project_name: project.name.clone(),
                    last_modified: info.mtime,
                    file_info: info.clone(),
                });
        }
    }

    holders
        .into_iter()
        .filter_map(|(relative_path, ordered)| {
            let mut newest = ordered.first()?;
            for version in &ordered[1..] {
                if version.last_modified > newest.last_modified {
                    newest = version;
                }
            }
            let newest_version = newest.clone();
            let all_identical = ordered
                .iter()
                .all(|v| v.file_info.content_hash == newest_version.file_info.content_hash);
            let holder_order: Vec<String> =
                ordered.iter().map(|v| v.project_name.clone()).collect();
            let missing_from = projects
                .iter()
                .filter(|p| !holder_order.contains(&p.name))
                .map(|p| p.name.clone())
                .collect();
            let versions = ordered
                .into_iter()
                .map(|v| (v.project_name.clone(), v))
                .collect();

            Some((
                relative_path.clone(),
                GlobalFileState {
                    relative_path,
                    versions,
                    missing_from,
                    newest_version,
                    all_identical,
                    holder_order,
                },
            ))
        })
        .collect()
}

/// Scan every project concurrently and merge the results.
///
/// A failing project is logged and left out of the merge.
///
/// # Errors
///
/// Fails up front on an invalid pattern, and with [`Error::AllScansFailed`]
/// when no project could be scanned.
pub fn scan_all_projects(projects: &[ProjectInfo], settings: &ScanSettings) -> Result<GlobalScan> {
    RuleMatcher::new(&settings.rule_patterns)?;
    ExcludeMatcher::new(&settings.exclude_patterns)?;

    tracing::info!(projects = projects.len(), "Scanning projects");
    let results: Vec<(&ProjectInfo, Result<ProjectScan>)> = projects
        .par_iter()
        .map(|project| {
            let native = project.path.to_native();
            let options = ScanOptions {
                project_dir: &native,
                rule_patterns: &settings.rule_patterns,
                exclude_patterns: &settings.exclude_patterns,
                max_file_size: settings.max_file_size,
            };
            (project, scanner::scan(&options))
        })
        .collect();

    let mut global = GlobalScan::default();
    for (project, result) in results {
        match result {
            Ok(scan) => {
                tracing::debug!(project = %project.name, files = scan.files.len(), "Project scanned");
                global.scans.insert(project.name.clone(), scan);
            }
            Err(e) => {
                tracing::warn!(project = %project.name, error = %e, "Project scan failed, skipping it this pass");
                global.failures.push(ScanFailure {
                    project: project.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    if !projects.is_empty() && global.scans.is_empty() {
        return Err(Error::AllScansFailed);
    }

    global.states = merge_scans(projects, &global.scans);
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rulesync_fs::NormalizedPath;
    use std::time::Duration;

    fn file(project: &str, rel: &str, hash: &str, secs: u64) -> FileInfo {
        FileInfo {
            relative_path: rel.to_string(),
            absolute_path: NormalizedPath::new(format!("/work/{project}/{rel}")),
            content_hash: hash.to_string(),
            is_local: rulesync_fs::is_local_path(rel),
            size: 1,
            mtime: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    fn scan_of(files: Vec<FileInfo>) -> ProjectScan {
        ProjectScan {
            files: files
                .into_iter()
                .map(|f| (f.relative_path.clone(), f))
                .collect(),
            skipped: Vec::new(),
        }
    }

    fn projects(names: &[&str]) -> Vec<ProjectInfo> {
        names
            .iter()
            .map(|n| ProjectInfo::new(*n, format!("/work/{n}")))
            .collect()
    }

    #[test]
    fn merge_tracks_missing_and_identity() {
        let projects = projects(&["a", "b", "c"]);
        let mut scans = BTreeMap::new();
        scans.insert("a".to_string(), scan_of(vec![file("a", "x.md", "h1", 1)]));
        scans.insert("b".to_string(), scan_of(vec![file("b", "x.md", "h1", 2)]));
        scans.insert("c".to_string(), scan_of(vec![]));

        let states = merge_scans(&projects, &scans);
        let x = &states["x.md"];
        assert!(x.all_identical);
        assert_eq!(x.missing_from, vec!["c".to_string()]);
        assert_eq!(x.newest_version.project_name, "b");
    }

    #[test]
    fn newest_tie_goes_to_first_project() {
        let projects = projects(&["a", "b"]);
        let mut scans = BTreeMap::new();
        scans.insert("a".to_string(), scan_of(vec![file("a", "x.md", "h1", 5)]));
        scans.insert("b".to_string(), scan_of(vec![file("b", "x.md", "h2", 5)]));

        let states = merge_scans(&projects, &scans);
        assert_eq!(states["x.md"].newest_version.project_name, "a");
        assert!(!states["x.md"].all_identical);
    }

    #[test]
    fn local_files_never_merge() {
        let projects = projects(&["a", "b"]);
        let mut scans = BTreeMap::new();
        scans.insert(
            "a".to_string(),
            scan_of(vec![file("a", "rules/me.local.md", "h1", 1)]),
        );
        scans.insert("b".to_string(), scan_of(vec![]));

        assert!(merge_scans(&projects, &scans).is_empty());
    }

    #[test]
    fn unscanned_project_is_missing_everywhere() {
        let projects = projects(&["a", "broken"]);
        let mut scans = BTreeMap::new();
        scans.insert("a".to_string(), scan_of(vec![file("a", "x.md", "h1", 1)]));

        let states = merge_scans(&projects, &scans);
        assert_eq!(states["x.md"].missing_from, vec!["broken".to_string()]);
    }

    #[test]
    fn content_groups_lead_with_newest() {
        let projects = projects(&["a", "b", "c"]);
        let mut scans = BTreeMap::new();
        scans.insert("a".to_string(), scan_of(vec![file("a", "x.md", "old", 1)]));
        scans.insert("b".to_string(), scan_of(vec![file("b", "x.md", "new", 9)]));
        scans.insert("c".to_string(), scan_of(vec![file("c", "x.md", "old", 3)]));

        let groups = merge_scans(&projects, &scans)["x.md"].content_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].content_hash, "new");
        assert_eq!(groups[1].projects, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(groups[1].representative, "c");
    }
}
