//! Options consumed by a sync pass

use std::path::PathBuf;

use rulesync_fs::constants::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};

use crate::patterns::{default_exclude_patterns, default_rule_patterns};
use crate::reconcile::ConflictPolicy;

/// Fully resolved options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub rule_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Report every action without touching the filesystem
    pub dry_run: bool,
    /// Never prompt; apply only the decisions that need no confirmation
    pub auto_confirm: bool,
    /// Directory searched for projects and against which explicit project
    /// paths are resolved
    pub base_dir: Option<PathBuf>,
    /// Explicit project paths; empty means discover under `base_dir`
    pub projects: Vec<String>,
    /// Files at or above this many bytes are skipped
    pub max_file_size: u64,
    pub conflict_policy: ConflictPolicy,
    /// Honour `manifest.txt` allow-lists
    pub allow_list: bool,
    /// Honour `manifest.json` conditions and their local overrides
    pub conditions: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            rule_patterns: default_rule_patterns(),
            exclude_patterns: default_exclude_patterns(),
            dry_run: false,
            auto_confirm: false,
            base_dir: None,
            projects: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            conflict_policy: ConflictPolicy::default(),
            allow_list: true,
            conditions: true,
        }
    }
}

impl SyncOptions {
    /// Whether the user may be asked anything this pass.
    pub fn interactive(&self) -> bool {
        !self.dry_run && !self.auto_confirm
    }
}

/// One configuration layer; unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialOptions {
    pub rule_patterns: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub dry_run: Option<bool>,
    pub auto_confirm: Option<bool>,
    pub base_dir: Option<PathBuf>,
    pub projects: Option<Vec<String>>,
    pub max_file_size: Option<u64>,
    pub conflict_policy: Option<ConflictPolicy>,
    pub allow_list: Option<bool>,
    pub conditions: Option<bool>,
}

impl PartialOptions {
    /// Overlay `other` on top of `self`.
    pub fn merge(&mut self, other: PartialOptions) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            rule_patterns,
            exclude_patterns,
            dry_run,
            auto_confirm,
            base_dir,
            projects,
            max_file_size,
            conflict_policy,
            allow_list,
            conditions
        );
    }

    /// Fill the unset fields from the defaults.
    pub fn into_options(self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            rule_patterns: self.rule_patterns.unwrap_or(defaults.rule_patterns),
            exclude_patterns: self.exclude_patterns.unwrap_or(defaults.exclude_patterns),
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
            auto_confirm: self.auto_confirm.unwrap_or(defaults.auto_confirm),
            base_dir: self.base_dir.or(defaults.base_dir),
            projects: self.projects.unwrap_or(defaults.projects),
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            conflict_policy: self.conflict_policy.unwrap_or(defaults.conflict_policy),
            allow_list: self.allow_list.unwrap_or(defaults.allow_list),
            conditions: self.conditions.unwrap_or(defaults.conditions),
        }
    }
}
