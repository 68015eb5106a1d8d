//! Rule and exclude pattern handling
//!
//! Declared rule patterns are expanded into concrete globs by a pure
//! function ([`expand_pattern`]) and compiled into a [`RuleMatcher`].
//! Exclude patterns are compiled into an [`ExcludeMatcher`] that decides
//! whether a directory is pruned from a walk.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::{Error, Result};

/// Default rule patterns used when none are configured.
pub const DEFAULT_RULE_PATTERNS: &[&str] = &[".clinerules", ".cursorrules", ".kilocode"];

/// Default directory exclusions used when none are configured.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "memory-bank",
    "node_modules",
    ".git",
    ".cache",
    "dist",
    "build",
    "target",
];

/// One concrete glob produced from a declared pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedPattern {
    pub glob: String,
    pub negated: bool,
}

impl ExpandedPattern {
    fn new(glob: impl Into<String>, negated: bool) -> Self {
        Self {
            glob: glob.into(),
            negated,
        }
    }
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand one declared pattern into the globs it stands for.
///
/// - `!p` negates every glob `p` expands to
/// - a pattern with glob metacharacters is used verbatim
/// - `name.md` is a single file
/// - `name/` is a directory of rule files only
/// - any other bare `name` is both a file and a directory of rule files
pub fn expand_pattern(pattern: &str) -> Vec<ExpandedPattern> {
    let trimmed = pattern.trim();
    let (negated, body) = match trimmed.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, trimmed),
    };

    let body = body.replace('\\', "/");
    let mut body = body.as_str();
    while let Some(rest) = body.strip_prefix("./") {
        body = rest;
    }
    let directory_only = body.ends_with('/');
    let body = body.trim_end_matches('/');
    if body.is_empty() {
        return Vec::new();
    }

    if has_glob_meta(body) {
        if directory_only {
            return vec![ExpandedPattern::new(format!("{body}/**/*.md"), negated)];
        }
        return vec![ExpandedPattern::new(body, negated)];
    }
    if body.ends_with(".md") {
        return vec![ExpandedPattern::new(body, negated)];
    }

    let as_directory = ExpandedPattern::new(format!("{body}/**/*.md"), negated);
    if directory_only {
        vec![as_directory]
    } else {
        vec![ExpandedPattern::new(body, negated), as_directory]
    }
}

/// Expand every declared pattern, preserving order.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<ExpandedPattern> {
    patterns
        .iter()
        .flat_map(|p| expand_pattern(p.as_ref()))
        .collect()
}

/// Compile a glob where `*` and `?` never cross a `/`.
pub(crate) fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::invalid_pattern(pattern, e))
}

fn build_set<'a>(globs: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(compile_glob(glob)?);
    }
    builder
        .build()
        .map_err(|e| Error::invalid_pattern("<set>", e))
}

/// Compiled positive and negated rule globs, anchored at a project root.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl RuleMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let expanded = expand_patterns(patterns);
        let include = build_set(
            expanded
                .iter()
                .filter(|p| !p.negated)
                .map(|p| p.glob.as_str()),
        )?;
        let exclude = build_set(
            expanded
                .iter()
                .filter(|p| p.negated)
                .map(|p| p.glob.as_str()),
        )?;
        Ok(Self { include, exclude })
    }

    /// Whether a project-relative, forward-slash path is selected.
    pub fn is_match(&self, relative_path: &str) -> bool {
        self.include.is_match(relative_path) && !self.exclude.is_match(relative_path)
    }
}

/// Compiled directory exclusions.
///
/// Patterns without a `/` are matched against a directory's name (`build`,
/// `build*`); patterns with one (`**/vendor`) against its walk-relative path.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    by_name: GlobSet,
    by_path: GlobSet,
}

impl ExcludeMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let cleaned: Vec<String> = patterns
            .iter()
            .map(|p| p.as_ref().trim().replace('\\', "/"))
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let by_name = build_set(cleaned.iter().filter(|p| !p.contains('/')).map(String::as_str))?;
        let by_path = build_set(cleaned.iter().filter(|p| p.contains('/')).map(String::as_str))?;
        Ok(Self { by_name, by_path })
    }

    /// Whether the directory at `relative_dir` (relative to the walk root)
    /// should be skipped.
    pub fn is_excluded(&self, relative_dir: &str) -> bool {
        let name = relative_dir.rsplit('/').next().unwrap_or(relative_dir);
        self.by_name.is_match(name) || self.by_path.is_match(relative_dir)
    }
}

/// Owned copies of the default rule patterns.
pub fn default_rule_patterns() -> Vec<String> {
    DEFAULT_RULE_PATTERNS.iter().map(|s| s.to_string()).collect()
}

/// Owned copies of the default exclude patterns.
pub fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn globs(pattern: &str) -> Vec<(String, bool)> {
        expand_pattern(pattern)
            .into_iter()
            .map(|p| (p.glob, p.negated))
            .collect()
    }

    #[test]
    fn bare_name_expands_to_file_and_directory() {
        assert_eq!(
            globs(".clinerules"),
            vec![
                (".clinerules".to_string(), false),
                (".clinerules/**/*.md".to_string(), false),
            ]
        );
    }

    #[test]
    fn trailing_slash_keeps_directory_variant_only() {
        assert_eq!(globs("docs/"), vec![("docs/**/*.md".to_string(), false)]);
    }

    #[test]
    fn markdown_file_is_single_glob() {
        assert_eq!(globs("./CLAUDE.md"), vec![("CLAUDE.md".to_string(), false)]);
    }

    #[test]
    fn glob_is_verbatim() {
        assert_eq!(globs("rules/*.md"), vec![("rules/*.md".to_string(), false)]);
    }

    #[test]
    fn negation_applies_to_every_expansion() {
        assert_eq!(
            globs("!drafts"),
            vec![
                ("drafts".to_string(), true),
                ("drafts/**/*.md".to_string(), true),
            ]
        );
    }

    #[test]
    fn empty_patterns_expand_to_nothing() {
        assert!(expand_pattern("").is_empty());
        assert!(expand_pattern("!").is_empty());
        assert!(expand_pattern("/").is_empty());
    }

    #[rstest]
    #[case(".clinerules/style.md", true)]
    #[case(".clinerules/nested/deep.md", true)]
    #[case(".clinerules/drafts/wip.md", false)]
    #[case("other/style.md", false)]
    #[case("sub/.clinerules/style.md", false)]
    fn matcher_respects_negation_and_anchoring(#[case] path: &str, #[case] expected: bool) {
        let matcher = RuleMatcher::new(&[".clinerules", "!.clinerules/drafts/"]).unwrap();
        assert_eq!(matcher.is_match(path), expected);
    }

    #[rstest]
    #[case("node_modules", true)]
    #[case("a/b/node_modules", true)]
    #[case("build-output", true)]
    #[case("src", false)]
    #[case("third_party/vendor", true)]
    #[case("vendor", true)]
    fn exclude_forms(#[case] dir: &str, #[case] expected: bool) {
        let matcher = ExcludeMatcher::new(&["node_modules", "build*", "**/vendor"]).unwrap();
        assert_eq!(matcher.is_excluded(dir), expected);
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = RuleMatcher::new(&["rules/[unclosed"]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
