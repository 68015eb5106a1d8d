//! Resolution of user-supplied paths against a base directory.
//!
//! Every path a user supplies (explicit project arguments, manifest
//! entries) goes through [`resolve`]. Input is percent-decoded until it
//! stops changing, so `%2e%2e%2f` and `%252e%252e%252f` are treated exactly
//! like `../`. Paths read off disk go through [`contain`], which runs the
//! same checks on the literal name.

use std::borrow::Cow;
use std::path::Path;

use crate::{Error, NormalizedPath, Result};

/// Resolve `user_path` relative to `base_dir` and return the canonical,
/// forward-slash normalized result.
///
/// Accepts `""` and `"."` as `base_dir` itself and any strict descendant of
/// `base_dir`. Anything landing outside fails with
/// [`Error::PathTraversal`]; a non-trivial path that collapses back onto
/// `base_dir` (such as `x/..`) fails with [`Error::ResolvesToBase`].
pub fn resolve(user_path: &str, base_dir: impl AsRef<Path>) -> Result<NormalizedPath> {
    let decoded = fully_decode(user_path)?;
    confine(user_path, &decoded, base_dir.as_ref())
}

/// Confine an already-known relative path (a scanned file name, never user
/// input) to `base_dir` without percent-decoding it.
///
/// Performs the same null-byte, containment and symlink checks as
/// [`resolve`], so `a%20b.md` stays `a%20b.md`.
pub fn contain(relative_path: &str, base_dir: impl AsRef<Path>) -> Result<NormalizedPath> {
    confine(relative_path, relative_path, base_dir.as_ref())
}

fn confine(original: &str, path: &str, base_dir: &Path) -> Result<NormalizedPath> {
    if path.contains('\0') {
        return Err(Error::NullByte {
            path: original.to_string(),
        });
    }

    let base = canonical_base(base_dir)?;
    if path.is_empty() || path == "." {
        return Ok(base);
    }

    let candidate = if is_absolute_like(path) {
        NormalizedPath::new(path)
    } else {
        base.join(path)
    };

    if candidate == base {
        return Err(Error::ResolvesToBase {
            path: original.to_string(),
        });
    }
    if !candidate.is_descendant_of(&base) {
        tracing::warn!(path = original, base = %base, "Rejected path outside base directory");
        return Err(Error::PathTraversal {
            path: original.to_string(),
        });
    }

    // The nearest existing ancestor is re-checked after symlink resolution.
    let mut probe = Some(candidate.clone());
    while let Some(current) = probe {
        if !current.exists() {
            probe = current.parent();
            continue;
        }
        let real = dunce::canonicalize(current.to_native())
            .map_err(|e| Error::io(current.to_native(), e))?;
        let real = NormalizedPath::new(real);
        let is_candidate = current == candidate;
        if is_candidate && real == base {
            return Err(Error::ResolvesToBase {
                path: original.to_string(),
            });
        }
        if real != base && !real.is_descendant_of(&base) {
            tracing::warn!(path = original, target = %real, "Rejected symlink escaping base directory");
            return Err(Error::PathTraversal {
                path: original.to_string(),
            });
        }
        return Ok(if is_candidate { real } else { candidate });
    }

    Ok(candidate)
}

/// Like [`resolve`], but returns the `base_dir`-relative form (`""` for the
/// base itself).
pub fn resolve_relative(user_path: &str, base_dir: impl AsRef<Path>) -> Result<String> {
    let base = canonical_base(base_dir.as_ref())?;
    let resolved = resolve(user_path, base.to_native())?;
    Ok(resolved.strip_base(&base).unwrap_or_default())
}

/// Percent-decode repeatedly until a fixed point is reached.
pub fn fully_decode(input: &str) -> Result<String> {
    let mut current = input.to_string();
    loop {
        let next = match urlencoding::decode(&current) {
            Ok(Cow::Borrowed(_)) => return Ok(current),
            Ok(Cow::Owned(decoded)) => decoded,
            Err(_) => {
                return Err(Error::InvalidEncoding {
                    path: input.to_string(),
                });
            }
        };
        if next == current {
            return Ok(current);
        }
        current = next;
    }
}

fn canonical_base(base_dir: &Path) -> Result<NormalizedPath> {
    if base_dir.exists() {
        let canonical = dunce::canonicalize(base_dir).map_err(|e| Error::io(base_dir, e))?;
        return Ok(NormalizedPath::new(canonical));
    }
    let absolute = std::path::absolute(base_dir).map_err(|e| Error::io(base_dir, e))?;
    Ok(NormalizedPath::new(absolute))
}

/// Absolute on any platform: `/x`, `\x`, `C:/x`, `C:\x`.
fn is_absolute_like(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reaches_fixed_point() {
        assert_eq!(fully_decode("%252e%252e%252f").unwrap(), "../");
        assert_eq!(fully_decode("plain/path.md").unwrap(), "plain/path.md");
    }

    #[test]
    fn contain_keeps_percent_sequences_literal() {
        let dir = tempfile::tempdir().unwrap();
        let base = NormalizedPath::new(dunce::canonicalize(dir.path()).unwrap());
        let resolved = contain("rules/a%20b.md", base.to_native()).unwrap();
        assert_eq!(resolved, base.join("rules/a%20b.md"));
        assert!(contain("rules/100%ff.md", base.to_native()).is_ok());
        assert!(matches!(
            contain("../x.md", base.to_native()),
            Err(Error::PathTraversal { .. })
        ));
    }

    #[test]
    fn drive_letters_count_as_absolute() {
        assert!(is_absolute_like("C:\\Windows"));
        assert!(is_absolute_like("/etc/passwd"));
        assert!(!is_absolute_like("rules/a.md"));
    }
}
