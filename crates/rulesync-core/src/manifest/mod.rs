//! Per-project scope from allow-list and condition manifests

mod allow_list;
mod condition;
mod converge;
mod scope;

pub use allow_list::{AllowListManifest, AllowListScope};
pub use condition::{ConditionManifest, ConditionScope, LocalManifestOverride, RuleCondition};
pub use converge::{ManifestConvergence, ManifestCopy, plan_manifest_convergence};
pub use scope::{
    OrphanedEntry, ProjectScope, Restriction, ScopeContext, ScopeDecision, ScopePlan, ScopeResolver,
    ScopeStrategy,
};
