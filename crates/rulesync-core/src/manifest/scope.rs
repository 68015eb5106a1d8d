//! Scope resolution shared by the allow-list and condition manifests
//!
//! Each mechanism is a [`ScopeStrategy`]. The [`ScopeResolver`] runs every
//! enabled strategy for every project and composes the decisions into one
//! [`ProjectScope`] per project; a path is permitted only if every decision
//! permits it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::Result;
use crate::discovery::ProjectInfo;
use crate::scanner::ProjectScan;

/// What one strategy says about which paths may exist in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// Only these paths may exist
    Only(BTreeSet<String>),
    /// These paths may not exist; everything else may
    Deny(BTreeSet<String>),
}

impl Restriction {
    pub fn permits(&self, relative_path: &str) -> bool {
        match self {
            Self::Only(allowed) => allowed.contains(relative_path),
            Self::Deny(denied) => !denied.contains(relative_path),
        }
    }
}

/// One strategy's verdict for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDecision {
    pub strategy: &'static str,
    pub restriction: Restriction,
    /// Entries naming paths with no backing file in any project
    pub orphaned: Vec<String>,
    /// Explicit directive to delete every rule file in the project
    pub delete_all: bool,
}

impl ScopeDecision {
    pub fn new(strategy: &'static str, restriction: Restriction) -> Self {
        Self {
            strategy,
            restriction,
            orphaned: Vec::new(),
            delete_all: false,
        }
    }
}

/// Everything a strategy may look at when evaluating one project.
pub struct ScopeContext<'a> {
    pub project: &'a ProjectInfo,
    /// Every non-local rule path held by any project
    pub known_paths: &'a BTreeSet<String>,
    pub exclude_patterns: &'a [String],
}

/// A scope-control mechanism.
pub trait ScopeStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Evaluate the project; `None` means the mechanism is absent for it.
    fn evaluate(&self, ctx: &ScopeContext<'_>) -> Result<Option<ScopeDecision>>;
}

/// Composed scope of one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectScope {
    decisions: Vec<ScopeDecision>,
    frozen: bool,
}

impl ProjectScope {
    pub fn new(decisions: Vec<ScopeDecision>) -> Self {
        Self {
            decisions,
            frozen: false,
        }
    }

    /// Scope for a project whose content is unknown this pass: nothing may
    /// be written to or deleted from it.
    pub fn frozen() -> Self {
        Self {
            decisions: Vec::new(),
            frozen: true,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether `relative_path` may exist in this project.
    pub fn permits(&self, relative_path: &str) -> bool {
        self.decisions
            .iter()
            .all(|d| d.restriction.permits(relative_path))
    }

    /// Whether the project may receive an add or update for this path.
    pub fn accepts(&self, relative_path: &str) -> bool {
        !self.frozen && !self.delete_all() && self.permits(relative_path)
    }

    pub fn delete_all(&self) -> bool {
        self.decisions.iter().any(|d| d.delete_all)
    }

    pub fn orphaned(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .flat_map(|d| d.orphaned.iter().map(String::as_str))
    }
}

/// An allow-list entry with no backing file anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedEntry {
    pub project: String,
    pub relative_path: String,
}

/// Per-project scopes for one pass.
#[derive(Debug, Clone, Default)]
pub struct ScopePlan {
    scopes: BTreeMap<String, ProjectScope>,
}

impl ScopePlan {
    pub fn insert(&mut self, project: impl Into<String>, scope: ProjectScope) {
        self.scopes.insert(project.into(), scope);
    }

    /// Scope of a project; unknown projects are unrestricted.
    pub fn scope(&self, project: &str) -> ProjectScope {
        self.scopes.get(project).cloned().unwrap_or_default()
    }

    pub fn orphaned(&self) -> Vec<OrphanedEntry> {
        self.scopes
            .iter()
            .flat_map(|(project, scope)| {
                scope.orphaned().map(move |path| OrphanedEntry {
                    project: project.clone(),
                    relative_path: path.to_string(),
                })
            })
            .collect()
    }
}

/// Runs every enabled strategy for every project.
pub struct ScopeResolver {
    strategies: Vec<Box<dyn ScopeStrategy>>,
}

impl ScopeResolver {
    pub fn new(strategies: Vec<Box<dyn ScopeStrategy>>) -> Self {
        Self { strategies }
    }

    /// A resolver with no strategies: every path is permitted everywhere.
    pub fn unrestricted() -> Self {
        Self::new(Vec::new())
    }

    /// Compose the scope of every project. Projects without a scan result
    /// are frozen.
    pub fn resolve(
        &self,
        projects: &[ProjectInfo],
        scans: &BTreeMap<String, ProjectScan>,
        known_paths: &BTreeSet<String>,
        exclude_patterns: &[String],
    ) -> Result<ScopePlan> {
        let mut plan = ScopePlan::default();
        for project in projects {
            if !scans.contains_key(&project.name) {
                plan.insert(project.name.clone(), ProjectScope::frozen());
                continue;
            }

            let ctx = ScopeContext {
                project,
                known_paths,
                exclude_patterns,
            };
            let mut decisions = Vec::new();
            for strategy in &self.strategies {
                if let Some(decision) = strategy.evaluate(&ctx)? {
                    tracing::debug!(
                        project = %project.name,
                        strategy = strategy.name(),
                        delete_all = decision.delete_all,
                        "Scope decision"
                    );
                    decisions.push(decision);
                }
            }
            plan.insert(project.name.clone(), ProjectScope::new(decisions));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn composed_scope_requires_every_decision() {
        let scope = ProjectScope::new(vec![
            ScopeDecision::new("allow-list", Restriction::Only(set(&["a.md", "b.md"]))),
            ScopeDecision::new("conditions", Restriction::Deny(set(&["b.md"]))),
        ]);
        assert!(scope.permits("a.md"));
        assert!(!scope.permits("b.md"));
        assert!(!scope.permits("c.md"));
    }

    #[test]
    fn frozen_scope_accepts_nothing() {
        let scope = ProjectScope::frozen();
        assert!(scope.permits("a.md"));
        assert!(!scope.accepts("a.md"));
    }

    #[test]
    fn delete_all_blocks_writes() {
        let mut decision = ScopeDecision::new("allow-list", Restriction::Only(BTreeSet::new()));
        decision.delete_all = true;
        let scope = ProjectScope::new(vec![decision]);
        assert!(scope.delete_all());
        assert!(!scope.accepts("a.md"));
    }
}
