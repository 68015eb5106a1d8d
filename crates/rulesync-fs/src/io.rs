//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Retry settings for transient I/O failures (interrupted syscalls,
/// would-block on a busy file).
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// First delay between attempts.
    pub initial_interval: Duration,
    /// Give up once this much time has been spent retrying.
    pub max_elapsed: Duration,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(10),
            max_elapsed: Duration::from_secs(2),
        }
    }
}

impl RobustnessConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_elapsed_time: Some(self.max_elapsed),
            ..ExponentialBackoff::default()
        }
    }
}

fn is_transient(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
}

/// Run `op`, retrying while it fails with a transient I/O error.
fn with_retry<T>(
    robustness: RobustnessConfig,
    mut op: impl FnMut() -> std::io::Result<T>,
) -> std::io::Result<T> {
    backoff::retry(robustness.backoff(), || {
        op().map_err(|e| {
            if is_transient(&e) {
                tracing::debug!(error = %e, "Retrying transient I/O failure");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .map_err(|e| match e {
        backoff::Error::Permanent(err) => err,
        backoff::Error::Transient { err, .. } => err,
    })
}

fn reject_symlink(path: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(path)
        && meta.file_type().is_symlink()
    {
        return Err(Error::SymlinkInPath {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers only ever see the old or the new
/// content. Refuses to write when the target or its parent directory is a
/// symlink.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        reject_symlink(parent)?;
        with_retry(robustness, || fs::create_dir_all(parent)).map_err(|e| Error::io(parent, e))?;
    }
    reject_symlink(&native_path)?;

    // Temp file in the same directory keeps the rename on one filesystem.
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let result = (|| -> Result<()> {
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::io(&temp_path, e))?;

        temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;

        with_retry(robustness, || temp_file.write_all(content))
            .map_err(|e| Error::io(&temp_path, e))?;
        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
        temp_file.unlock().map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;

        with_retry(robustness, || fs::rename(&temp_path, &native_path))
            .map_err(|e| Error::io(&native_path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Read the raw bytes of a file.
pub fn read_bytes(path: &NormalizedPath) -> Result<Vec<u8>> {
    let native_path = path.to_native();
    fs::read(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Remove a single file, retrying transient failures.
pub fn remove_file(path: &NormalizedPath, robustness: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();
    reject_symlink(&native_path)?;
    with_retry(robustness, || fs::remove_file(&native_path)).map_err(|e| Error::io(&native_path, e))
}

/// Whether a new file could be created at `path`: the nearest existing
/// ancestor must be a directory that is not read-only.
pub fn probe_writable(path: &NormalizedPath) -> Result<()> {
    let mut current = path.parent();
    while let Some(dir) = current {
        let native = dir.to_native();
        match fs::metadata(&native) {
            Ok(meta) if meta.is_dir() => {
                if meta.permissions().readonly() {
                    return Err(Error::io(
                        native,
                        std::io::Error::new(ErrorKind::PermissionDenied, "directory is read-only"),
                    ));
                }
                return Ok(());
            }
            Ok(_) => {
                return Err(Error::io(
                    native,
                    std::io::Error::new(ErrorKind::NotADirectory, "ancestor is not a directory"),
                ));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => current = dir.parent(),
            Err(e) => return Err(Error::io(native, e)),
        }
    }
    Ok(())
}
