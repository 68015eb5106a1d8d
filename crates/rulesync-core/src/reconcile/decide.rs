//! Turning cross-project state into actions
//!
//! Decisions follow a fixed order: empty allow-list directives first, then
//! every relative path in sorted order, then extraneous files. Only
//! interactive runs consult the [`Prompter`]. Copies are emitted ahead of
//! deletions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::action::{ActionKind, SyncAction};
use super::prompt::Prompter;
use super::state::{ContentGroup, FileVersion, GlobalFileState};
use crate::Result;
use crate::discovery::ProjectInfo;
use crate::manifest::ScopePlan;
use crate::scanner::ProjectScan;

/// How divergent content is handled when nobody can be asked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Propagate the most recently modified version
    #[default]
    NewestWins,
    /// Leave divergent paths alone and list them as conflicts
    Report,
}

/// A path whose content differs between projects and was left unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub relative_path: String,
    pub groups: Vec<ContentGroup>,
}

/// A rule file present in a project but outside its scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraneousFile {
    pub project: String,
    pub relative_path: String,
}

/// Everything the decision step produced.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub actions: Vec<SyncAction>,
    pub conflicts: Vec<Conflict>,
    pub extraneous: Vec<ExtraneousFile>,
}

/// Decides actions for one pass.
pub struct Reconciler<'a> {
    projects: BTreeMap<&'a str, &'a ProjectInfo>,
    order: Vec<&'a str>,
    interactive: bool,
    policy: ConflictPolicy,
}

const COPY: &str = "Copy to the missing projects";
const DELETE_EVERYWHERE: &str = "Delete from every project";
const SKIP: &str = "Skip";

impl<'a> Reconciler<'a> {
    /// `interactive` is false under dry-run or auto-confirm.
    pub fn new(projects: &'a [ProjectInfo], interactive: bool, policy: ConflictPolicy) -> Self {
        Self {
            projects: projects.iter().map(|p| (p.name.as_str(), p)).collect(),
            order: projects.iter().map(|p| p.name.as_str()).collect(),
            interactive,
            policy,
        }
    }

    /// Derive the actions needed to converge `states` within `plan`.
    pub fn get_user_confirmations(
        &self,
        states: &BTreeMap<String, GlobalFileState>,
        scans: &BTreeMap<String, ProjectScan>,
        plan: &ScopePlan,
        prompter: &mut dyn Prompter,
    ) -> Result<Decision> {
        let mut decision = Decision::default();
        let mut deleting: BTreeSet<(String, String)> = BTreeSet::new();

        self.clear_projects(scans, plan, prompter, &mut decision, &mut deleting)?;

        for state in states.values() {
            self.decide_path(state, plan, prompter, &mut decision, &mut deleting)?;
        }

        self.collect_extraneous(scans, plan, prompter, &mut decision, &mut deleting)?;

        // A file may be both the source of a copy and slated for deletion.
        decision
            .actions
            .sort_by_key(|a| a.kind == ActionKind::Delete);

        tracing::info!(
            actions = decision.actions.len(),
            conflicts = decision.conflicts.len(),
            extraneous = decision.extraneous.len(),
            "Decisions complete"
        );
        Ok(decision)
    }

    fn project(&self, name: &str) -> Option<&'a ProjectInfo> {
        self.projects.get(name).copied()
    }

    fn push_delete(
        &self,
        project: &str,
        relative_path: &str,
        decision: &mut Decision,
        deleting: &mut BTreeSet<(String, String)>,
    ) {
        let Some(target) = self.project(project) else {
            return;
        };
        if deleting.insert((project.to_string(), relative_path.to_string())) {
            decision
                .actions
                .push(SyncAction::delete(relative_path, target));
        }
    }

    /// Empty allow-lists: every non-local rule file of the project goes.
    fn clear_projects(
        &self,
        scans: &BTreeMap<String, ProjectScan>,
        plan: &ScopePlan,
        prompter: &mut dyn Prompter,
        decision: &mut Decision,
        deleting: &mut BTreeSet<(String, String)>,
    ) -> Result<()> {
        for name in &self.order {
            let scope = plan.scope(name);
            if !scope.delete_all() || scope.is_frozen() {
                continue;
            }
            let Some(scan) = scans.get(*name) else {
                continue;
            };
            let doomed: Vec<&str> = scan
                .files
                .values()
                .filter(|f| !f.is_local)
                .map(|f| f.relative_path.as_str())
                .collect();
            if doomed.is_empty() {
                continue;
            }

            if self.interactive {
                let prompt = format!(
                    "The allow-list of {name} is empty. Delete its {} rule files?",
                    doomed.len()
                );
                let options = vec!["Delete them".to_string(), "Keep them".to_string()];
                if prompter.select(&prompt, &options)? != 0 {
                    continue;
                }
            }
            for path in doomed {
                self.push_delete(name, path, decision, deleting);
            }
        }
        Ok(())
    }

    fn copy_action(&self, kind: ActionKind, source: &FileVersion, target: &str) -> Option<SyncAction> {
        let target = self.project(target)?;
        Some(SyncAction::copy(kind, &source.project_name, &source.file_info, target))
    }

    /// Bring every accepting project to the content of `source`.
    fn propagate(
        &self,
        state: &GlobalFileState,
        source: &FileVersion,
        plan: &ScopePlan,
        decision: &mut Decision,
    ) {
        let hash = &source.file_info.content_hash;
        for name in &self.order {
            if !plan.scope(name).accepts(&state.relative_path) {
                continue;
            }
            let kind = match state.version(name) {
                Some(held) if &held.file_info.content_hash == hash => continue,
                Some(_) => ActionKind::Update,
                None if state.missing_from.iter().any(|m| m.as_str() == *name) => ActionKind::Add,
                None => continue,
            };
            if let Some(action) = self.copy_action(kind, source, name) {
                decision.actions.push(action);
            }
        }
    }

    fn decide_path(
        &self,
        state: &GlobalFileState,
        plan: &ScopePlan,
        prompter: &mut dyn Prompter,
        decision: &mut Decision,
        deleting: &mut BTreeSet<(String, String)>,
    ) -> Result<()> {
        let path = &state.relative_path;
        let targets: Vec<&str> = state
            .missing_from
            .iter()
            .map(String::as_str)
            .filter(|p| plan.scope(p).accepts(path))
            .collect();

        if state.all_identical {
            if targets.is_empty() {
                return Ok(());
            }
            if !self.interactive {
                for target in targets {
                    if let Some(action) = self.copy_action(ActionKind::Add, &state.newest_version, target) {
                        decision.actions.push(action);
                    }
                }
                return Ok(());
            }

            let prompt = format!("{path} is missing from {}", targets.join(", "));
            let options = vec![COPY.to_string(), DELETE_EVERYWHERE.to_string(), SKIP.to_string()];
            match prompter.select(&prompt, &options)? {
                0 => {
                    for target in targets {
                        if let Some(action) = self.copy_action(ActionKind::Add, &state.newest_version, target) {
                            decision.actions.push(action);
                        }
                    }
                }
                1 => {
                    let holders: Vec<String> = state.holders().map(|v| v.project_name.clone()).collect();
                    for holder in holders {
                        self.push_delete(&holder, path, decision, deleting);
                    }
                }
                _ => tracing::debug!(path = %path, "Skipped by user"),
            }
            return Ok(());
        }

        let groups = state.content_groups();
        if !self.interactive {
            match self.policy {
                ConflictPolicy::NewestWins => {
                    tracing::debug!(
                        path = %path,
                        source = %state.newest_version.project_name,
                        "Divergent content, propagating newest"
                    );
                    self.propagate(state, &state.newest_version, plan, decision);
                }
                ConflictPolicy::Report => {
                    tracing::warn!(path = %path, versions = groups.len(), "Divergent content left unresolved");
                    decision.conflicts.push(Conflict {
                        relative_path: path.clone(),
                        groups,
                    });
                }
            }
            return Ok(());
        }

        let mut options: Vec<String> = groups
            .iter()
            .map(|g| {
                format!(
                    "Use {} ({}) held by {}",
                    g.representative,
                    short_hash(&g.content_hash),
                    g.projects.join(", ")
                )
            })
            .collect();
        options.push(SKIP.to_string());
        let prompt = format!("{path} differs between projects");
        let choice = prompter.select(&prompt, &options)?;
        match groups.get(choice) {
            Some(group) => {
                if let Some(source) = state.version(&group.representative) {
                    self.propagate(state, source, plan, decision);
                }
            }
            None => decision.conflicts.push(Conflict {
                relative_path: path.clone(),
                groups,
            }),
        }
        Ok(())
    }

    /// Present-but-out-of-scope files: listed always, deleted only on an
    /// interactive confirmation.
    fn collect_extraneous(
        &self,
        scans: &BTreeMap<String, ProjectScan>,
        plan: &ScopePlan,
        prompter: &mut dyn Prompter,
        decision: &mut Decision,
        deleting: &mut BTreeSet<(String, String)>,
    ) -> Result<()> {
        let mut found = Vec::new();
        for name in &self.order {
            let scope = plan.scope(name);
            let Some(scan) = scans.get(*name) else {
                continue;
            };
            // Projects under an empty allow-list were already decided.
            if scope.is_frozen() || scope.delete_all() {
                continue;
            }
            for file in scan.files.values().filter(|f| !f.is_local) {
                let key = (name.to_string(), file.relative_path.clone());
                if !scope.permits(&file.relative_path) && !deleting.contains(&key) {
                    tracing::warn!(project = %name, path = %file.relative_path, "Rule file outside project scope");
                    found.push(ExtraneousFile {
                        project: name.to_string(),
                        relative_path: file.relative_path.clone(),
                    });
                }
            }
        }

        if self.interactive && !found.is_empty() {
            let prompt = format!("Delete {} rule files outside their project's scope?", found.len());
            let options = vec!["Delete them".to_string(), "Keep them".to_string()];
            if prompter.select(&prompt, &options)? == 0 {
                for file in &found {
                    self.push_delete(&file.project, &file.relative_path, decision, deleting);
                }
            }
        }
        decision.extraneous = found;
        Ok(())
    }
}

fn short_hash(hash: &str) -> &str {
    let hex = hash.strip_prefix("sha256:").unwrap_or(hash);
    hex.get(..8).unwrap_or(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ProjectScope, Restriction, ScopeDecision};
    use crate::reconcile::merge_scans;
    use crate::reconcile::prompt::{NoPrompt, ScriptedPrompter};
    use crate::scanner::FileInfo;
    use pretty_assertions::assert_eq;
    use rulesync_fs::NormalizedPath;
    use std::time::{Duration, SystemTime};

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

    struct Fixture {
        projects: Vec<ProjectInfo>,
        scans: BTreeMap<String, ProjectScan>,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            Self {
                projects: names
                    .iter()
                    .map(|n| ProjectInfo::new(*n, format!("/work/{n}")))
                    .collect(),
                scans: names
                    .iter()
                    .map(|n| (n.to_string(), ProjectScan::default()))
                    .collect(),
            }
        }

        fn with(mut self, project: &str, rel: &str, hash: &str, secs: u64) -> Self {
            let info = file(project, rel, hash, secs);
            self.scans
                .entry(project.to_string())
                .or_default()
                .files
                .insert(rel.to_string(), info);
            self
        }

        fn decide(
            &self,
            interactive: bool,
            policy: ConflictPolicy,
            plan: &ScopePlan,
            prompter: &mut dyn Prompter,
        ) -> Decision {
            let states = merge_scans(&self.projects, &self.scans);
            Reconciler::new(&self.projects, interactive, policy)
                .get_user_confirmations(&states, &self.scans, plan, prompter)
                .unwrap()
        }
    }

    fn summary(decision: &Decision) -> Vec<String> {
        decision.actions.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn identical_everywhere_yields_nothing() {
        let fx = Fixture::new(&["a", "b"])
            .with("a", "x.md", "h", 1)
            .with("b", "x.md", "h", 2);
        let decision = fx.decide(false, ConflictPolicy::NewestWins, &ScopePlan::default(), &mut NoPrompt);
        assert!(decision.actions.is_empty());
    }

    #[test]
    fn missing_copies_are_added_from_newest() {
        let fx = Fixture::new(&["a", "b", "c"])
            .with("a", "x.md", "h", 1)
            .with("b", "x.md", "h", 7);
        let decision = fx.decide(false, ConflictPolicy::NewestWins, &ScopePlan::default(), &mut NoPrompt);
        assert_eq!(summary(&decision), vec!["add x.md (b -> c)"]);
    }

    #[test]
    fn newest_wins_updates_and_adds() {
        let fx = Fixture::new(&["a", "b", "c"])
            .with("a", "x.md", "old", 1)
            .with("b", "x.md", "new", 2);
        let decision = fx.decide(false, ConflictPolicy::NewestWins, &ScopePlan::default(), &mut NoPrompt);
        assert_eq!(
            summary(&decision),
            vec!["update x.md (b -> a)", "add x.md (b -> c)"]
        );
    }

    #[test]
    fn report_policy_never_resolves_divergence() {
        let fx = Fixture::new(&["a", "b", "c"])
            .with("a", "x.md", "old", 1)
            .with("b", "x.md", "new", 2);
        let decision = fx.decide(false, ConflictPolicy::Report, &ScopePlan::default(), &mut NoPrompt);
        assert!(decision.actions.is_empty());
        assert_eq!(decision.conflicts.len(), 1);
        assert_eq!(decision.conflicts[0].groups.len(), 2);
    }

    #[test]
    fn interactive_delete_everywhere_removes_from_holders() {
        let fx = Fixture::new(&["a", "b", "c"])
            .with("a", "x.md", "h", 1)
            .with("b", "x.md", "h", 2);
        let mut prompter = ScriptedPrompter::new([1]);
        let decision = fx.decide(true, ConflictPolicy::NewestWins, &ScopePlan::default(), &mut prompter);
        assert_eq!(summary(&decision), vec!["delete x.md (a)", "delete x.md (b)"]);
        assert_eq!(prompter.asked()[0].1.len(), 3);
    }

    #[test]
    fn interactive_group_choice_uses_its_representative() {
        let fx = Fixture::new(&["a", "b"])
            .with("a", "x.md", "old", 1)
            .with("b", "x.md", "new", 2);
        // Groups lead with the newest content, so index 1 is a's version.
        let mut prompter = ScriptedPrompter::new([1]);
        let decision = fx.decide(true, ConflictPolicy::NewestWins, &ScopePlan::default(), &mut prompter);
        assert_eq!(summary(&decision), vec!["update x.md (a -> b)"]);
    }

    #[test]
    fn interactive_skip_records_conflict() {
        let fx = Fixture::new(&["a", "b"])
            .with("a", "x.md", "old", 1)
            .with("b", "x.md", "new", 2);
        let mut prompter = ScriptedPrompter::new([2]);
        let decision = fx.decide(true, ConflictPolicy::NewestWins, &ScopePlan::default(), &mut prompter);
        assert!(decision.actions.is_empty());
        assert_eq!(decision.conflicts.len(), 1);
    }

    #[test]
    fn denied_targets_get_nothing_and_holders_are_extraneous() {
        let fx = Fixture::new(&["a", "b", "c"])
            .with("a", "x.md", "h", 1)
            .with("b", "x.md", "h", 1);
        let mut plan = ScopePlan::default();
        let deny = |p: &str| {
            ProjectScope::new(vec![ScopeDecision::new(
                "conditions",
                Restriction::Deny([p.to_string()].into_iter().collect()),
            )])
        };
        plan.insert("b", deny("x.md"));
        plan.insert("c", deny("x.md"));

        let decision = fx.decide(false, ConflictPolicy::NewestWins, &plan, &mut NoPrompt);
        assert!(decision.actions.is_empty());
        assert_eq!(
            decision.extraneous,
            vec![ExtraneousFile {
                project: "b".to_string(),
                relative_path: "x.md".to_string()
            }]
        );
    }

    #[test]
    fn empty_allow_list_deletes_under_auto_confirm() {
        let fx = Fixture::new(&["a", "b"])
            .with("a", "x.md", "h", 1)
            .with("b", "x.md", "h", 1)
            .with("b", "y.md", "h", 1)
            .with("b", "mine.local.md", "h", 1);
        let mut cleared = ScopeDecision::new("allow-list", Restriction::Only(BTreeSet::new()));
        cleared.delete_all = true;
        let mut plan = ScopePlan::default();
        plan.insert("b", ProjectScope::new(vec![cleared]));

        let decision = fx.decide(false, ConflictPolicy::NewestWins, &plan, &mut NoPrompt);
        assert_eq!(
            summary(&decision),
            vec!["add y.md (b -> a)", "delete x.md (b)", "delete y.md (b)"]
        );
        assert!(decision.extraneous.is_empty());
    }

    #[test]
    fn frozen_project_is_never_a_target() {
        let fx = Fixture::new(&["a", "broken"]).with("a", "x.md", "h", 1);
        let mut plan = ScopePlan::default();
        plan.insert("broken", ProjectScope::frozen());
        let decision = fx.decide(false, ConflictPolicy::NewestWins, &plan, &mut NoPrompt);
        assert!(decision.actions.is_empty());
    }

    #[test]
    fn short_hash_trims_prefix() {
        assert_eq!(short_hash("sha256:0123456789abcdef"), "01234567");
        assert_eq!(short_hash("abc"), "abc");
    }
}
