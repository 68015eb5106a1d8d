//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rulesync_core::{ConflictPolicy, PartialOptions};

/// rulesync - Keep rule files consistent across sibling projects
#[derive(Parser, Debug)]
#[command(name = "rulesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project directories to reconcile (discovered under the base directory when omitted)
    pub projects: Vec<String>,

    /// Directory projects are discovered in and resolved against
    #[arg(short, long)]
    pub base_dir: Option<PathBuf>,

    /// Preview changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Apply every change without asking
    #[arg(short = 'y', long = "yes", alias = "auto-confirm")]
    pub auto_confirm: bool,

    /// Rule pattern (repeatable, replaces the defaults)
    #[arg(long = "rule-pattern", value_name = "PATTERN")]
    pub rule_patterns: Vec<String>,

    /// Directory exclusion pattern (repeatable, replaces the defaults)
    #[arg(long = "exclude-pattern", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Files at or above this size in bytes are skipped
    #[arg(long, value_name = "BYTES")]
    pub max_file_size: Option<u64>,

    /// How divergent content is handled without prompting
    #[arg(long, value_enum)]
    pub conflict_policy: Option<PolicyArg>,

    /// Ignore allow-list manifests
    #[arg(long)]
    pub no_allow_list: bool,

    /// Ignore condition manifests and local overrides
    #[arg(long)]
    pub no_conditions: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory holding the user config.toml
    #[arg(long, env = "RULESYNC_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    NewestWins,
    Report,
}

impl From<PolicyArg> for ConflictPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::NewestWins => ConflictPolicy::NewestWins,
            PolicyArg::Report => ConflictPolicy::Report,
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

impl Cli {
    /// Command-line layer of the configuration. Flags left at their
    /// defaults do not override config files.
    pub fn overrides(&self) -> PartialOptions {
        PartialOptions {
            rule_patterns: non_empty(&self.rule_patterns),
            exclude_patterns: non_empty(&self.exclude_patterns),
            dry_run: self.dry_run.then_some(true),
            auto_confirm: self.auto_confirm.then_some(true),
            base_dir: self.base_dir.clone(),
            projects: non_empty(&self.projects),
            max_file_size: self.max_file_size,
            conflict_policy: self.conflict_policy.map(Into::into),
            allow_list: self.no_allow_list.then_some(false),
            conditions: self.no_conditions.then_some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_projects_and_flags() {
        let cli = Cli::parse_from(["rulesync", "a", "b", "--dry-run", "-y"]);
        assert_eq!(cli.projects, vec!["a", "b"]);
        assert!(cli.dry_run);
        assert!(cli.auto_confirm);
    }

    #[test]
    fn auto_confirm_alias() {
        let cli = Cli::parse_from(["rulesync", "--auto-confirm"]);
        assert!(cli.auto_confirm);
    }

    #[test]
    fn unset_flags_do_not_override() {
        let cli = Cli::parse_from(["rulesync"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.dry_run, None);
        assert_eq!(overrides.projects, None);
        assert_eq!(overrides.allow_list, None);
        assert_eq!(overrides.conflict_policy, None);
    }

    #[test]
    fn negative_toggles_and_policy() {
        let cli = Cli::parse_from([
            "rulesync",
            "--no-allow-list",
            "--conflict-policy",
            "report",
            "--rule-pattern",
            "docs/rules/",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.allow_list, Some(false));
        assert_eq!(overrides.conditions, None);
        assert_eq!(overrides.conflict_policy, Some(ConflictPolicy::Report));
        assert_eq!(overrides.rule_patterns, Some(vec!["docs/rules/".to_string()]));
    }
}
