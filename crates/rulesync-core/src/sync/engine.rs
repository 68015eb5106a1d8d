//! SyncEngine implementation
//!
//! One pass: projects, scan, manifest convergence, scope, decisions,
//! execution.

use std::path::PathBuf;

use rulesync_fs::RobustnessConfig;

use super::report::{SkippedEntry, SyncReport};
use crate::Result;
use crate::config::SyncOptions;
use crate::discovery::{ProjectInfo, discover_projects, resolve_projects};
use crate::executor::{ExecuteOptions, execute_actions};
use crate::manifest::{
    AllowListScope, ConditionScope, ScopeResolver, ScopeStrategy, plan_manifest_convergence,
};
use crate::reconcile::{GlobalScan, Prompter, Reconciler, ScanSettings, scan_all_projects};

/// Engine reconciling rule files across projects
pub struct SyncEngine {
    options: SyncOptions,
    robustness: RobustnessConfig,
}

impl SyncEngine {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            robustness: RobustnessConfig::default(),
        }
    }

    /// Use custom retry settings for filesystem mutations.
    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn base_dir(&self) -> Result<PathBuf> {
        match &self.options.base_dir {
            Some(base) => Ok(base.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    /// The projects taking part: the explicit ones when given, otherwise
    /// everything discovered under the base directory.
    pub fn projects(&self) -> Result<Vec<ProjectInfo>> {
        if !self.options.projects.is_empty() {
            return resolve_projects(&self.options.projects, self.options.base_dir.as_deref());
        }
        let base = self.base_dir()?;
        discover_projects(
            &base,
            &self.options.rule_patterns,
            &self.options.exclude_patterns,
        )
    }

    fn scan(&self, projects: &[ProjectInfo]) -> Result<GlobalScan> {
        let settings = ScanSettings {
            rule_patterns: self.options.rule_patterns.clone(),
            exclude_patterns: self.options.exclude_patterns.clone(),
            max_file_size: self.options.max_file_size,
        };
        scan_all_projects(projects, &settings)
    }

    fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            dry_run: self.options.dry_run,
            robustness: self.robustness,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// `prompter` is consulted only when neither dry-run nor auto-confirm is
    /// set. Fewer than two projects yields an empty, successful report.
    ///
    /// # Errors
    ///
    /// Validation, security and all-scans-failed errors abort the pass
    /// before anything is written. Per-action failures do not; they are
    /// listed in the report.
    pub fn run(&self, prompter: &mut dyn Prompter) -> Result<SyncReport> {
        let options = &self.options;
        let projects = self.projects()?;
        let mut report = SyncReport::empty(options.dry_run);
        if projects.len() < 2 {
            tracing::info!(projects = projects.len(), "Fewer than two projects, nothing to reconcile");
            return Ok(report);
        }
        tracing::info!(projects = projects.len(), dry_run = options.dry_run, "Starting sync");

        let mut global = self.scan(&projects)?;

        // Projects that failed to scan are left alone this pass.
        let scanned: Vec<ProjectInfo> = projects
            .iter()
            .filter(|p| global.scans.contains_key(&p.name))
            .cloned()
            .collect();
        let mut converged = None;
        if options.conditions
            && let Some(convergence) = plan_manifest_convergence(&scanned)
        {
            let apply = if options.interactive() {
                let prompt = "Condition manifests differ between projects".to_string();
                let choices = vec![
                    format!("Use the newest, from {}", convergence.source_project),
                    "Keep each project's own manifest".to_string(),
                ];
                prompter.select(&prompt, &choices)? == 0
            } else {
                true
            };

            if apply {
                let execution = execute_actions(&convergence.actions, &self.execute_options())?;
                report.absorb(execution);
                if options.dry_run {
                    converged = Some(convergence.content);
                } else {
                    global = self.scan(&projects)?;
                }
            }
        }

        let mut strategies: Vec<Box<dyn ScopeStrategy>> = Vec::new();
        if options.allow_list {
            strategies.push(Box::new(AllowListScope));
        }
        if options.conditions {
            strategies.push(Box::new(match converged {
                Some(content) => ConditionScope::with_converged(content),
                None => ConditionScope::new(),
            }));
        }
        let plan = ScopeResolver::new(strategies).resolve(
            &projects,
            &global.scans,
            &global.known_paths(),
            &options.exclude_patterns,
        )?;

        let decision = Reconciler::new(&projects, options.interactive(), options.conflict_policy)
            .get_user_confirmations(&global.states, &global.scans, &plan, prompter)?;

        let execution = execute_actions(&decision.actions, &self.execute_options())?;
        report.absorb(execution);

        report.orphaned = plan.orphaned();
        report.extraneous = decision.extraneous;
        report.conflicts = decision.conflicts;
        report.skipped_files = global
            .skipped()
            .into_iter()
            .map(|(project, file)| SkippedEntry { project, file })
            .collect();
        report.scan_failures = global.failures;

        tracing::info!(
            added = report.added,
            updated = report.updated,
            deleted = report.deleted,
            success = report.success,
            "Sync complete"
        );
        Ok(report)
    }
}
