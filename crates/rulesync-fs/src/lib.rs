//! Filesystem primitives for rulesync
//!
//! Provides forward-slash normalized paths, resolution of user-supplied paths
//! against a base directory, content checksums and whole-file atomic writes.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;
pub mod security;

pub use config::ConfigStore;
pub use constants::{RuleSyncPath, has_rule_extension, is_local_path};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
