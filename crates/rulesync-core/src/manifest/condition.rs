//! Condition manifest (`.rulesync/manifest.json`) and its local override
//! (`.rulesync/manifest.local.json`)
//!
//! A rule declared in the manifest belongs in a project when its condition
//! glob matches at least one file physically present there. The local
//! override can force a rule in (`include`) or out (`exclude`); include beats
//! exclude, and both beat the condition.

use std::collections::{BTreeMap, BTreeSet};

use globset::GlobMatcher;
use rulesync_fs::{ConfigStore, NormalizedPath, RuleSyncPath, has_rule_extension, io, security};
use serde::{Deserialize, Serialize};

use super::scope::{Restriction, ScopeContext, ScopeDecision, ScopeStrategy};
use crate::patterns::compile_glob;
use crate::scanner::list_project_files;
use crate::{Error, Result};

/// Per-rule condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleCondition {
    /// Glob evaluated against the project's files
    pub condition: String,
}

/// `{"rules": {"<relative path>": {"condition": "<glob>"}}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionManifest {
    pub rules: BTreeMap<String, RuleCondition>,
}

impl ConditionManifest {
    /// Parse and schema-check manifest JSON.
    pub fn parse(content: &str) -> Result<Self> {
        let path = NormalizedPath::new(RuleSyncPath::ConditionManifest.as_str());
        let manifest: Self = ConfigStore::parse(&path, content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check every key is a non-empty `.md` path and every condition a
    /// non-empty, compilable glob.
    pub fn validate(&self) -> Result<()> {
        for (path, rule) in &self.rules {
            if path.trim().is_empty() {
                return Err(Error::Validation {
                    message: "manifest rule path is empty".to_string(),
                });
            }
            if !has_rule_extension(path) {
                return Err(Error::Validation {
                    message: format!("manifest rule '{path}' is not a .md file"),
                });
            }
            if rule.condition.trim().is_empty() {
                return Err(Error::Validation {
                    message: format!("manifest rule '{path}' has an empty condition"),
                });
            }
            compile_glob(&rule.condition)?;
        }
        Ok(())
    }

    /// Load a project's manifest. A missing file is `None`; so is an
    /// unreadable or malformed one, with a warning.
    pub fn load(project_dir: &NormalizedPath) -> Option<Self> {
        let path = project_dir.join(RuleSyncPath::ConditionManifest.as_str());
        let content = read_optional(&path)?;
        Self::parse_or_warn(&path, &content)
    }

    pub(crate) fn parse_or_warn(path: &NormalizedPath, content: &str) -> Option<Self> {
        match Self::parse(content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Ignoring malformed condition manifest");
                None
            }
        }
    }
}

/// `{"include": [...], "exclude": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalManifestOverride {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl LocalManifestOverride {
    pub fn parse(content: &str) -> Result<Self> {
        let path = NormalizedPath::new(RuleSyncPath::LocalOverride.as_str());
        let manifest: Self = ConfigStore::parse(&path, content)?;
        if let Some(blank) = manifest
            .include
            .iter()
            .chain(&manifest.exclude)
            .find(|p| p.trim().is_empty())
        {
            return Err(Error::Validation {
                message: format!("local override entry {blank:?} is empty"),
            });
        }
        Ok(manifest)
    }

    /// Load a project's local override; missing or malformed is `None`.
    pub fn load(project_dir: &NormalizedPath) -> Option<Self> {
        let path = project_dir.join(RuleSyncPath::LocalOverride.as_str());
        let content = read_optional(&path)?;
        match Self::parse(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Ignoring malformed local manifest override");
                None
            }
        }
    }
}

fn read_optional(path: &NormalizedPath) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    match io::read_text(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Ignoring unreadable manifest");
            None
        }
    }
}

/// [`ScopeStrategy`] backed by [`ConditionManifest`] and
/// [`LocalManifestOverride`].
#[derive(Debug, Default)]
pub struct ConditionScope {
    /// Manifest content to assume for every project carrying a manifest,
    /// used when convergence was planned but not written (dry run)
    converged: Option<String>,
}

impl ConditionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate carriers as if their manifest already held `content`.
    pub fn with_converged(content: impl Into<String>) -> Self {
        Self {
            converged: Some(content.into()),
        }
    }

    fn manifest_for(&self, project_dir: &NormalizedPath) -> Option<ConditionManifest> {
        let path = project_dir.join(RuleSyncPath::ConditionManifest.as_str());
        match &self.converged {
            Some(content) if path.is_file() => ConditionManifest::parse_or_warn(&path, content),
            _ => ConditionManifest::load(project_dir),
        }
    }
}

fn project_relative(entry: &str, project_dir: &NormalizedPath) -> Result<String> {
    let relative = security::resolve_relative(entry, project_dir.to_native())?;
    if relative.is_empty() {
        return Err(Error::Validation {
            message: format!("manifest entry '{entry}' names the project directory itself"),
        });
    }
    Ok(relative)
}

impl ScopeStrategy for ConditionScope {
    fn name(&self) -> &'static str {
        "conditions"
    }

    fn evaluate(&self, ctx: &ScopeContext<'_>) -> Result<Option<ScopeDecision>> {
        let project = ctx.project;
        let manifest = self.manifest_for(&project.path);
        let local = LocalManifestOverride::load(&project.path);
        if manifest.is_none() && local.is_none() {
            return Ok(None);
        }

        let local = local.unwrap_or_default();
        let include = local
            .include
            .iter()
            .map(|p| project_relative(p, &project.path))
            .collect::<Result<BTreeSet<_>>>()?;
        let exclude = local
            .exclude
            .iter()
            .map(|p| project_relative(p, &project.path))
            .collect::<Result<BTreeSet<_>>>()?;

        let mut denied: BTreeSet<String> = exclude.difference(&include).cloned().collect();

        if let Some(manifest) = manifest {
            let present = present_files(&project.path, ctx.exclude_patterns)?;
            for (rule, condition) in &manifest.rules {
                let rule = project_relative(rule, &project.path)?;
                if include.contains(&rule) || denied.contains(&rule) {
                    continue;
                }
                let glob = compile_glob(&condition.condition)?.compile_matcher();
                if !condition_holds(&glob, &present) {
                    tracing::debug!(
                        project = %project.name,
                        rule = %rule,
                        condition = %condition.condition,
                        "Rule out of scope"
                    );
                    denied.insert(rule);
                }
            }
        }

        Ok(Some(ScopeDecision::new(self.name(), Restriction::Deny(denied))))
    }
}

/// Files a condition is evaluated against; the manifest directory itself is
/// not part of the project's content.
fn present_files(project_dir: &NormalizedPath, exclude_patterns: &[String]) -> Result<Vec<String>> {
    let manifest_dir = format!("{}/", RuleSyncPath::ManifestDir.as_str());
    Ok(list_project_files(&project_dir.to_native(), exclude_patterns)?
        .into_iter()
        .filter(|f| !f.starts_with(&manifest_dir))
        .collect())
}

fn condition_holds(glob: &GlobMatcher, files: &[String]) -> bool {
    files.iter().any(|f| glob.is_match(f))
}
