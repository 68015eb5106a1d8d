//! Sync options and their layered resolution

mod options;
mod resolver;

pub use options::{PartialOptions, SyncOptions};
pub use resolver::ConfigResolver;
