//! Configuration resolution with layered overrides
//!
//! Layers, later overriding earlier field by field:
//! 1. Built-in defaults
//! 2. User config (`<config_dir>/rulesync/config.toml`)
//! 3. Shared base-directory config (`<base>/.rulesync.toml`)
//! 4. Local base-directory config (`<base>/.rulesync.local.toml`)
//! 5. Explicit overrides (command-line flags)

use std::path::PathBuf;

use rulesync_fs::{ConfigStore, NormalizedPath, RuleSyncPath};

use super::options::{PartialOptions, SyncOptions};
use crate::Result;

/// Resolves [`SyncOptions`] from every configuration layer.
pub struct ConfigResolver {
    store: ConfigStore,
    /// Override for the user config directory (used for testing).
    /// When `None`, the platform directory from `dirs::config_dir()` is used.
    global_config_dir_override: Option<PathBuf>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            store: ConfigStore::new(),
            global_config_dir_override: None,
        }
    }

    /// Use `dir` instead of the platform config directory.
    pub fn with_global_config_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: ConfigStore::new(),
            global_config_dir_override: Some(dir.into()),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.global_config_dir_override {
            return Some(dir.clone());
        }
        dirs::config_dir().map(|d| d.join("rulesync"))
    }

    fn load_layer(&self, path: &NormalizedPath, layer: &str) -> Result<Option<PartialOptions>> {
        let loaded = self.store.load_optional::<PartialOptions>(path)?;
        if loaded.is_some() {
            tracing::debug!(path = %path, layer, "Loaded config layer");
        }
        Ok(loaded)
    }

    /// Merge every layer under `overrides` and fill in defaults.
    ///
    /// The base directory comes from `overrides`, then the user config; the
    /// base-directory layers are skipped when neither names one.
    ///
    /// # Errors
    ///
    /// Fails when a present config file cannot be read or parsed.
    pub fn resolve(&self, overrides: PartialOptions) -> Result<SyncOptions> {
        let mut merged = PartialOptions::default();

        if let Some(dir) = self.global_config_dir() {
            let path = NormalizedPath::new(dir.join("config.toml"));
            if let Some(layer) = self.load_layer(&path, "user")? {
                merged.merge(layer);
            }
        }

        let base_dir = overrides.base_dir.clone().or_else(|| merged.base_dir.clone());
        if let Some(base) = base_dir {
            let base = NormalizedPath::new(base);
            for (file, layer) in [
                (RuleSyncPath::Config, "shared"),
                (RuleSyncPath::LocalConfig, "local"),
            ] {
                if let Some(options) = self.load_layer(&base.join(file.as_str()), layer)? {
                    merged.merge(options);
                }
            }
        }

        merged.merge(overrides);
        Ok(merged.into_options())
    }
}
