//! Line-oriented allow-list manifest (`.rulesync/manifest.txt`)
//!
//! One project-relative path per line; blank lines and `#` comments are
//! ignored. A missing file means no restriction. A present but empty file is
//! an explicit directive to delete every rule file in the project.

use std::collections::BTreeSet;

use rulesync_fs::{NormalizedPath, RuleSyncPath, io, is_local_path, security};

use super::scope::{Restriction, ScopeContext, ScopeDecision, ScopeStrategy};
use crate::Result;

/// Ordered, de-duplicated allow-list entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowListManifest {
    entries: Vec<String>,
}

impl AllowListManifest {
    /// Parse manifest text. Entries are normalized to forward slashes but
    /// not yet checked against a project directory.
    pub fn parse(content: &str) -> Self {
        let mut entries: Vec<String> = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = line.replace('\\', "/");
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        Self { entries }
    }

    /// Load the allow-list of a project, `None` when the file is absent.
    pub fn load(project_dir: &NormalizedPath) -> Result<Option<Self>> {
        let path = project_dir.join(RuleSyncPath::AllowList.as_str());
        if !path.is_file() {
            return Ok(None);
        }
        let content = io::read_text(&path)?;
        Ok(Some(Self::parse(&content)))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.iter().any(|e| e == relative_path)
    }
}

/// [`ScopeStrategy`] backed by [`AllowListManifest`].
#[derive(Debug, Default)]
pub struct AllowListScope;

impl ScopeStrategy for AllowListScope {
    fn name(&self) -> &'static str {
        "allow-list"
    }

    fn evaluate(&self, ctx: &ScopeContext<'_>) -> Result<Option<ScopeDecision>> {
        let project = ctx.project;
        let manifest = match AllowListManifest::load(&project.path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(project = %project.name, error = %e, "Unreadable allow-list manifest, ignoring it");
                return Ok(None);
            }
        };

        let mut allowed = BTreeSet::new();
        let mut orphaned = Vec::new();
        for entry in manifest.entries() {
            let relative = security::resolve_relative(entry, project.path.to_native())?;
            if relative.is_empty() {
                tracing::warn!(project = %project.name, entry = %entry, "Ignoring allow-list entry naming the project itself");
                continue;
            }
            if !is_local_path(&relative) && !ctx.known_paths.contains(&relative) {
                tracing::warn!(project = %project.name, entry = %relative, "Allow-list entry has no backing file in any project");
                orphaned.push(relative.clone());
            }
            allowed.insert(relative);
        }

        let mut decision = ScopeDecision::new(self.name(), Restriction::Only(allowed));
        decision.orphaned = orphaned;
        decision.delete_all = manifest.is_empty();
        if decision.delete_all {
            tracing::warn!(project = %project.name, "Empty allow-list manifest: every rule file is scheduled for deletion");
        }
        Ok(Some(decision))
    }
}
