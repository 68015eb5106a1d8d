//! Shared test utilities for the rulesync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`workspace`]: [`TestWorkspace`] builder for multi-project scenarios

pub mod workspace;

pub use workspace::TestWorkspace;
