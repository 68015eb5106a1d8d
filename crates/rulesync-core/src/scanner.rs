//! Rule-file scanning for a single project
//!
//! [`scan`] enumerates the rule files a project holds and hashes them.
//! [`resolve_rule_files`] is the same file selection without hashing, shared
//! with callers that only need the effective `.md` set of a directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use rulesync_fs::constants::DEFAULT_MAX_FILE_SIZE;
use rulesync_fs::{NormalizedPath, checksum, has_rule_extension, is_local_path};
use serde::Serialize;
use walkdir::WalkDir;

use crate::discovery::relative_to;
use crate::patterns::{ExcludeMatcher, RuleMatcher};
use crate::{Error, Result};

/// One rule file as seen by one project's scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Project-relative, forward-slash path
    pub relative_path: String,
    pub absolute_path: NormalizedPath,
    /// `sha256:<hex>` of the file content
    pub content_hash: String,
    /// Whether the path carries a `.local.` segment
    pub is_local: bool,
    pub size: u64,
    #[serde(skip)]
    pub mtime: SystemTime,
}

/// Why a matched file was left out of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Matched a rule pattern but is not a `.md` file
    NotMarkdown,
    /// At or above the size ceiling
    TooLarge { size: u64, limit: u64 },
}

/// A file the scan matched but did not include.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub relative_path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Input to [`scan`].
#[derive(Debug, Clone)]
pub struct ScanOptions<'a> {
    pub project_dir: &'a Path,
    pub rule_patterns: &'a [String],
    pub exclude_patterns: &'a [String],
    pub max_file_size: u64,
}

impl<'a> ScanOptions<'a> {
    pub fn new(
        project_dir: &'a Path,
        rule_patterns: &'a [String],
        exclude_patterns: &'a [String],
    ) -> Self {
        Self {
            project_dir,
            rule_patterns,
            exclude_patterns,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Result of scanning one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectScan {
    /// Included rule files keyed by relative path
    pub files: BTreeMap<String, FileInfo>,
    /// Matched files that were left out, with the reason
    pub skipped: Vec<SkippedFile>,
}

/// Files selected by the rule patterns, split into rule files and the rest.
struct Selection {
    rule_files: Vec<(String, NormalizedPath)>,
    not_markdown: Vec<String>,
}

fn project_label(dir: &Path) -> String {
    NormalizedPath::new(dir)
        .file_name()
        .unwrap_or_default()
        .to_string()
}

fn select_files<S: AsRef<str>>(
    dir: &Path,
    rule_patterns: &[S],
    exclude_patterns: &[S],
) -> Result<Selection> {
    let matcher = RuleMatcher::new(rule_patterns)?;
    let excludes = ExcludeMatcher::new(exclude_patterns)?;
    let root = NormalizedPath::new(dir);
    let label = project_label(dir);

    let mut selection = Selection {
        rule_files: Vec::new(),
        not_markdown: Vec::new(),
    };

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !excludes.is_excluded(&relative_to(&root, entry.path()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(|p| relative_to(&root, p))
                .unwrap_or_default();
            Error::Scan {
                project: label.clone(),
                path,
                message: e.to_string(),
            }
        })?;

        if entry.file_type().is_symlink() {
            tracing::debug!(path = %entry.path().display(), "Skipping symlink");
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative_to(&root, entry.path());
        if !matcher.is_match(&rel) {
            continue;
        }
        if has_rule_extension(&rel) {
            selection
                .rule_files
                .push((rel, NormalizedPath::new(entry.path())));
        } else {
            tracing::warn!(project = %label, path = %rel, "Ignoring non-markdown file matched by rule patterns");
            selection.not_markdown.push(rel);
        }
    }

    Ok(selection)
}

/// The effective `.md` rule files of `dir`, sorted by relative path.
pub fn resolve_rule_files<S: AsRef<str>>(
    dir: &Path,
    rule_patterns: &[S],
    exclude_patterns: &[S],
) -> Result<Vec<NormalizedPath>> {
    let selection = select_files(dir, rule_patterns, exclude_patterns)?;
    Ok(selection
        .rule_files
        .into_iter()
        .map(|(_, absolute)| absolute)
        .collect())
}

/// Every regular file under `dir` (symlinks and excluded directories
/// skipped), as project-relative paths.
pub fn list_project_files<S: AsRef<str>>(dir: &Path, exclude_patterns: &[S]) -> Result<Vec<String>> {
    let excludes = ExcludeMatcher::new(exclude_patterns)?;
    let root = NormalizedPath::new(dir);
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !excludes.is_excluded(&relative_to(&root, entry.path()))
        });
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                files.push(relative_to(&root, entry.path()));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable entry"),
        }
    }
    Ok(files)
}

/// Scan one project: select, size-check and hash its rule files.
///
/// # Errors
///
/// Fails on an invalid pattern or on the first unreadable file or
/// directory; the error names the offending relative path.
pub fn scan(options: &ScanOptions<'_>) -> Result<ProjectScan> {
    let dir = options.project_dir;
    let label = project_label(dir);
    let selection = select_files(dir, options.rule_patterns, options.exclude_patterns)?;

    let mut result = ProjectScan {
        files: BTreeMap::new(),
        skipped: selection
            .not_markdown
            .into_iter()
            .map(|relative_path| SkippedFile {
                relative_path,
                reason: SkipReason::NotMarkdown,
            })
            .collect(),
    };

    for (rel, absolute) in selection.rule_files {
        let scan_error = |e: std::io::Error| Error::Scan {
            project: label.clone(),
            path: rel.clone(),
            message: e.to_string(),
        };

        let metadata = fs::metadata(absolute.to_native()).map_err(scan_error)?;
        let size = metadata.len();
        if size >= options.max_file_size {
            tracing::warn!(project = %label, path = %rel, size, "Skipping oversized rule file");
            result.skipped.push(SkippedFile {
                relative_path: rel,
                reason: SkipReason::TooLarge {
                    size,
                    limit: options.max_file_size,
                },
            });
            continue;
        }

        let mtime = metadata.modified().map_err(scan_error)?;
        let content_hash = checksum::compute_file_checksum(&absolute.to_native()).map_err(scan_error)?;
        tracing::debug!(project = %label, path = %rel, hash = %content_hash, "Scanned rule file");

        result.files.insert(
            rel.clone(),
            FileInfo {
                is_local: is_local_path(&rel),
                relative_path: rel,
                absolute_path: absolute,
                content_hash,
                size,
                mtime,
            },
        );
    }

    Ok(result)
}
