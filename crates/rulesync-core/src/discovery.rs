//! Project discovery and validation of explicit project paths

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rulesync_fs::{NormalizedPath, has_rule_extension, security};
use serde::Serialize;
use walkdir::WalkDir;

use crate::patterns::{ExcludeMatcher, RuleMatcher};
use crate::{Error, Result};

/// A directory participating in reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    /// Unique name, normally the directory's basename
    pub name: String,
    /// Absolute, normalized directory path
    pub path: NormalizedPath,
}

impl ProjectInfo {
    pub fn new(name: impl Into<String>, path: impl Into<NormalizedPath>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Build a `ProjectInfo` named after the directory's basename.
    pub fn from_path(path: impl Into<NormalizedPath>) -> Self {
        let path = path.into();
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        Self { name, path }
    }
}

fn check_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::PathNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(Error::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Find every directory under `base_dir` that holds at least one rule file.
///
/// The walk includes dot-directories, never follows symlinks and prunes
/// directories matching `exclude_patterns`. `base_dir` itself is never a
/// project. Results are sorted by path.
pub fn discover_projects<S: AsRef<str>>(
    base_dir: &Path,
    rule_patterns: &[S],
    exclude_patterns: &[S],
) -> Result<Vec<ProjectInfo>> {
    check_directory(base_dir)?;
    let base = NormalizedPath::new(canonical_dir(base_dir)?);
    let matcher = RuleMatcher::new(rule_patterns)?;
    let excludes = ExcludeMatcher::new(exclude_patterns)?;

    tracing::debug!(base = %base, "Discovering projects");

    let mut found: BTreeSet<String> = BTreeSet::new();
    let walker = WalkDir::new(base.to_native())
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !excludes.is_excluded(&relative_to(&base, entry.path()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry during discovery");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative_to(&base, entry.path());
        let components: Vec<&str> = rel.split('/').collect();
        for split in 1..components.len() {
            let project_rel = components[..split].join("/");
            if found.contains(&project_rel) {
                continue;
            }
            let remainder = components[split..].join("/");
            if has_rule_extension(&remainder) && matcher.is_match(&remainder) {
                tracing::debug!(project = %project_rel, file = %remainder, "Found project");
                found.insert(project_rel);
            }
        }
    }

    Ok(name_projects(&base, found))
}

/// Assign names: basenames, unless two projects share one, in which case
/// every project with that basename is named by its base-relative path.
fn name_projects(base: &NormalizedPath, relative_dirs: BTreeSet<String>) -> Vec<ProjectInfo> {
    let mut by_basename: BTreeMap<String, usize> = BTreeMap::new();
    for rel in &relative_dirs {
        *by_basename.entry(basename(rel).to_string()).or_default() += 1;
    }

    relative_dirs
        .into_iter()
        .map(|rel| {
            let short = basename(&rel);
            let name = if by_basename.get(short).copied().unwrap_or(0) > 1 {
                rel.clone()
            } else {
                short.to_string()
            };
            ProjectInfo::new(name, base.join(&rel))
        })
        .collect()
}

fn basename(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

pub(crate) fn relative_to(base: &NormalizedPath, path: &Path) -> String {
    NormalizedPath::new(path).strip_base(base).unwrap_or_default()
}

pub(crate) fn canonical_dir(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).map_err(|e| Error::from(rulesync_fs::Error::io(path, e)))
}

/// Check that every explicitly supplied path exists and is a directory.
///
/// An empty list is valid.
pub fn validate_projects<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        check_directory(path.as_ref())?;
    }
    Ok(())
}

/// Turn explicit project arguments into [`ProjectInfo`]s.
///
/// With a `base_dir`, each argument is resolved through path security and
/// must stay inside it. Duplicate paths are dropped; clashing basenames are
/// disambiguated the same way discovery does.
pub fn resolve_projects<S: AsRef<str>>(
    paths: &[S],
    base_dir: Option<&Path>,
) -> Result<Vec<ProjectInfo>> {
    let candidates = paths
        .iter()
        .map(|raw| match base_dir {
            Some(base) => security::resolve(raw.as_ref(), base).map(|p| p.to_native()),
            None => Ok(PathBuf::from(raw.as_ref())),
        })
        .collect::<rulesync_fs::Result<Vec<_>>>()?;
    validate_projects(&candidates)?;

    let mut resolved: Vec<NormalizedPath> = Vec::new();
    for candidate in &candidates {
        let path = NormalizedPath::new(canonical_dir(candidate)?);
        if !resolved.contains(&path) {
            resolved.push(path);
        }
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for path in &resolved {
        *counts
            .entry(path.file_name().unwrap_or(path.as_str()).to_string())
            .or_default() += 1;
    }
    Ok(resolved
        .into_iter()
        .map(|path| {
            let short = path.file_name().unwrap_or(path.as_str()).to_string();
            if counts.get(&short).copied().unwrap_or(0) > 1 {
                ProjectInfo::new(path.as_str().to_string(), path)
            } else {
                ProjectInfo::new(short, path)
            }
        })
        .collect())
}
