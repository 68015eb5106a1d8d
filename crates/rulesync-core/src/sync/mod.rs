//! The full reconciliation pipeline

mod engine;
mod report;

pub use engine::SyncEngine;
pub use report::{SkippedEntry, SyncReport};
