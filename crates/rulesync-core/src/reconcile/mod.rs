//! Cross-project merge and action decisions

mod action;
mod decide;
mod prompt;
mod state;

pub use action::{ActionKind, ActionPayload, SyncAction};
pub use decide::{Conflict, ConflictPolicy, Decision, ExtraneousFile, Reconciler};
pub use prompt::{NoPrompt, Prompter, ScriptedPrompter};
pub use state::{
    ContentGroup, FileVersion, GlobalFileState, GlobalScan, ScanFailure, ScanSettings, merge_scans,
    scan_all_projects,
};
