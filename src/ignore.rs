use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A compiled set of gitignore-style patterns.
///
/// Supports the common subset of gitignore syntax: comments, `*`, `**`, `?`,
/// leading-`/` root anchoring and trailing-`/` directory patterns. Negation
/// (`!`) lines are dropped rather than honored. `.git` and everything inside
/// it is always ignored regardless of the pattern list.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
}

impl IgnoreMatcher {
    /// Compiles newline-delimited pattern source. Blank lines, `#` comments
    /// and `!` negations are dropped; a pattern whose translated regex fails
    /// to compile is skipped rather than reported.
    pub fn compile(source: &str) -> Self {
        let patterns = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(pattern_to_regex)
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Tests a path (absolute or already root-relative) against the set.
    ///
    /// Every ancestor prefix of the relative path is tested as well, so
    /// ignoring a directory ignores its descendants without any recursion
    /// bookkeeping on the caller's side.
    pub fn is_ignored(&self, path: &str, root: &str) -> bool {
        let relative = normalize_path(path, root);

        let parts: Vec<&str> = relative.split('/').collect();
        if relative == ".git" || relative.starts_with(".git/") || parts.contains(&".git") {
            return true;
        }

        for regex in &self.patterns {
            if regex.is_match(&relative) {
                return true;
            }
            for end in 1..=parts.len() {
                let prefix = parts[..end].join("/");
                if regex.is_match(&prefix) {
                    return true;
                }
            }
        }

        false
    }
}

/// Reads the repository's `.gitignore`. A missing file is an empty pattern
/// set, not an error.
pub fn read_ignore_file(root: &Path) -> Result<String> {
    let path = root.join(".gitignore");
    match fs::read_to_string(&path) {
        Ok(source) => Ok(source),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to read ignore file: {}", path.display()))
        }
    }
}

/// Strips the repository root (and separator) from an absolute path and
/// flips backslashes, leaving a forward-slash relative path.
fn normalize_path(path: &str, root: &str) -> String {
    let normalized = path.replace('\\', "/");
    let root_normalized = root.replace('\\', "/");

    match normalized.strip_prefix(&root_normalized) {
        Some(rest) => rest.trim_start_matches('/').to_string(),
        None => normalized,
    }
}

/// Glob-to-regex translation: `.` escaped, `**` crosses segments, `*` and
/// `?` stay within one segment. Other regex metacharacters pass through,
/// which keeps valid gitignore lines compiling and lets anything stranger
/// degrade to best-effort matching.
fn pattern_to_regex(pattern: &str) -> Option<Regex> {
    let mut body = pattern
        .replace('.', "\\.")
        .replace("**", "\u{1}")
        .replace('*', "[^/]*")
        .replace('\u{1}', ".*")
        .replace('?', "[^/]");

    if pattern.starts_with('/') {
        body = body[1..].to_string();
    } else {
        body = format!(".*{body}");
    }

    if pattern.ends_with('/') {
        body.push_str(".*");
    }

    Regex::new(&format!("^{body}$")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(source: &str) -> IgnoreMatcher {
        IgnoreMatcher::compile(source)
    }

    #[test]
    fn bare_name_matches_at_any_depth_including_descendants() {
        let m = matcher("node_modules");
        assert!(m.is_ignored("node_modules/pkg/index.js", ""));
        assert!(m.is_ignored("a/b/node_modules", ""));
        assert!(!m.is_ignored("src/main.rs", ""));
    }

    #[test]
    fn leading_slash_anchors_to_root() {
        let m = matcher("/build");
        assert!(m.is_ignored("build/out.txt", ""));
        assert!(!m.is_ignored("sub/build/out.txt", ""));
    }

    #[test]
    fn single_star_does_not_cross_segments() {
        let m = matcher("*.log");
        assert!(m.is_ignored("debug.log", ""));
        assert!(m.is_ignored("logs/debug.log", ""));
        assert!(!m.is_ignored("debug.log.txt", ""));
    }

    #[test]
    fn double_star_crosses_segments() {
        let m = matcher("docs/**/draft.md");
        assert!(m.is_ignored("docs/a/b/draft.md", ""));
        assert!(!m.is_ignored("docs/a/b/final.md", ""));
    }

    #[test]
    fn question_mark_matches_one_non_separator_character() {
        let m = matcher("file?.txt");
        assert!(m.is_ignored("file1.txt", ""));
        assert!(!m.is_ignored("file12.txt", ""));
        assert!(!m.is_ignored("file/.txt", ""));
    }

    #[test]
    fn trailing_slash_matches_directory_and_contents() {
        let m = matcher("target/");
        assert!(m.is_ignored("target/debug/gitview", ""));
    }

    #[test]
    fn comments_blanks_and_negations_are_dropped() {
        let m = matcher("# a comment\n\n!keep.log\n");
        assert!(m.is_empty());
        assert!(!m.is_ignored("keep.log", ""));
    }

    #[test]
    fn git_directory_is_always_ignored() {
        let m = matcher("");
        assert!(m.is_ignored(".git", ""));
        assert!(m.is_ignored(".git/config", ""));
        assert!(m.is_ignored("vendor/.git/HEAD", ""));
        assert!(!m.is_ignored(".github/workflows/ci.yml", ""));
    }

    #[test]
    fn absolute_paths_are_relativized_against_root() {
        let m = matcher("node_modules");
        assert!(m.is_ignored("/repo/app/node_modules/x.js", "/repo/app"));
        assert!(!m.is_ignored("/repo/app/src/x.js", "/repo/app"));
    }

    #[test]
    fn backslash_paths_are_normalized() {
        let m = matcher("/build");
        assert!(m.is_ignored("C:\\repo\\build\\out.txt", "C:\\repo"));
    }
}
