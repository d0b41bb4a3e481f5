//! Pattern resolution within the key store
// (c) 2024 Ross Younger

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use tracing::{debug, trace};

use crate::diagnostic::Diagnostic;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Lexically normalizes a pattern: collapses `.`, `..` and repeated separators.
///
/// A leading `..` that cannot be collapsed is kept, so the pattern still points outside
/// (and is then caught by the containment check).
#[must_use]
pub fn normalize(pattern: &str) -> String {
    let absolute = pattern.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in pattern.split('/') {
        match part {
            "" | "." => (),
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    let _ = parts.pop();
                } else if !absolute {
                    parts.push(part);
                }
            }
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".into(),
        (false, false) => joined,
    }
}

/// Rewrites a normalized pattern into the form the glob matcher expects.
///
/// * A final `**` component becomes `**/*`, so it selects every file beneath that point.
/// * Runs of `*` inside a longer component (`alice**`) collapse to a single `*`.
fn glob_pattern(normalized: &str) -> String {
    let mut parts: Vec<String> = normalized
        .split('/')
        .map(|part| {
            if part == "**" {
                return part.to_owned();
            }
            let mut out = String::with_capacity(part.len());
            for c in part.chars() {
                if c != '*' || !out.ends_with('*') {
                    out.push(c);
                }
            }
            out
        })
        .collect();
    if parts.last().is_some_and(|p| p == "**") {
        parts.push("*".into());
    }
    parts.join("/")
}

/// Counts the literal (non-wildcard) characters in a pattern.
///
/// More literal characters means a more specific pattern.
#[must_use]
pub fn specificity(pattern: &str) -> usize {
    pattern.chars().filter(|c| !matches!(c, '?' | '*')).count()
}

/// The directory tree holding the public key files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    /// Canonical path to the store
    base: PathBuf,
}

impl KeyStore {
    /// Opens a key store, canonicalizing its path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let base = std::fs::canonicalize(path)
            .with_context(|| format!("key store {path:?} is not accessible"))?;
        anyhow::ensure!(base.is_dir(), "key store {base:?} is not a directory");
        Ok(Self { base })
    }

    /// Canonical path to the store
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Finds the key files matched by a pattern.
    ///
    /// Results are canonical paths, always within the store, in glob order
    /// (which is sorted within each directory).
    /// * Matches that resolve outside the store are reported and dropped.
    /// * Matches that are not regular files are silently dropped.
    /// * A pattern matching nothing at all is reported.
    pub fn resolve(&self, pattern: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<PathBuf> {
        let normalized = normalize(pattern);
        let full = Path::new(&Pattern::escape(&self.base.to_string_lossy()))
            .join(glob_pattern(&normalized));

        let entries = match glob_with(&full.to_string_lossy(), GLOB_OPTIONS) {
            Ok(entries) => entries,
            Err(e) => {
                diagnostics.push(Diagnostic::InvalidPattern {
                    pattern: normalized,
                    reason: e.to_string(),
                });
                return Vec::new();
            }
        };

        let mut result = Vec::new();
        let mut matched_any = false;
        for entry in entries {
            matched_any = true;
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    debug!("{normalized}: {e}");
                    continue;
                }
            };
            trace!("path {path:?} from {pattern} normalized {normalized}");
            let real = match std::fs::canonicalize(&path) {
                Ok(r) => r,
                Err(e) => {
                    debug!("cannot resolve {path:?}: {e}");
                    continue;
                }
            };
            if !real.starts_with(&self.base) {
                diagnostics.push(Diagnostic::OutsideBase {
                    pattern: normalized.clone(),
                    path: real,
                });
                continue;
            }
            if !real.is_file() {
                continue;
            }
            result.push(real);
        }

        if !matched_any {
            diagnostics.push(Diagnostic::Unmatched {
                pattern: normalized,
            });
        }
        result
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use anyhow::{anyhow, Context, Result};
    use assertables::assert_eq_as_result;

    use super::{glob_pattern, normalize, specificity, KeyStore};
    use crate::diagnostic::Diagnostic;

    #[test]
    fn normalization() -> Result<()> {
        for (input, expected) in [
            ("alice", "alice"),
            ("./alice", "alice"),
            ("team//alice", "team/alice"),
            ("team/../alice", "alice"),
            ("team/./*/", "team/*"),
            ("../alice", "../alice"),
            ("../../x/../y", "../../y"),
            ("a/../..", ".."),
            ("/etc/passwd", "/etc/passwd"),
            ("/../etc", "/etc"),
            ("**/*", "**/*"),
            (".", "."),
            ("a/..", "."),
        ] {
            assert_eq_as_result!(normalize(input), expected)
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("input {input}"))?;
        }
        Ok(())
    }

    #[test]
    fn specificity_counts_literals() {
        assert_eq!(specificity("abc"), 3);
        assert_eq!(specificity("a*"), 1);
        assert_eq!(specificity("**/*"), 1);
        assert_eq!(specificity("f?o"), 2);
        assert_eq!(specificity("team/[ab]*"), 9);
    }

    fn store_with(files: &[&str]) -> (tempfile::TempDir, KeyStore) {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        fs::create_dir(&keys).unwrap();
        for f in files {
            let path = keys.join(f);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("ssh-ed25519 AAAA {f}\n")).unwrap();
        }
        let store = KeyStore::open(&keys).unwrap();
        (dir, store)
    }

    fn names(store: &KeyStore, paths: &[std::path::PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(store.base())
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn literal_and_wildcards() {
        let (_dir, store) = store_with(&["alice", "bob", "team/carol", "team/dave"]);
        let mut diags = Vec::new();
        assert_eq!(
            names(&store, &store.resolve("alice", &mut diags)),
            vec!["alice"]
        );
        assert_eq!(
            names(&store, &store.resolve("*", &mut diags)),
            vec!["alice", "bob"]
        );
        assert_eq!(
            names(&store, &store.resolve("team/*", &mut diags)),
            vec!["team/carol", "team/dave"]
        );
        assert_eq!(
            names(&store, &store.resolve("**/*", &mut diags)),
            vec!["alice", "bob", "team/carol", "team/dave"]
        );
        assert_eq!(
            names(&store, &store.resolve("?o?", &mut diags)),
            vec!["bob"]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn hidden_files_need_literal_dot() {
        let (_dir, store) = store_with(&[".hidden", "shown"]);
        let mut diags = Vec::new();
        assert_eq!(names(&store, &store.resolve("*", &mut diags)), vec!["shown"]);
        assert_eq!(
            names(&store, &store.resolve(".hidden", &mut diags)),
            vec![".hidden"]
        );
    }

    #[test]
    fn unmatched_pattern_warns() {
        let (_dir, store) = store_with(&["alice"]);
        let mut diags = Vec::new();
        assert!(store.resolve("mallory", &mut diags).is_empty());
        assert_eq!(
            diags,
            vec![Diagnostic::Unmatched {
                pattern: "mallory".into()
            }]
        );
    }

    #[test]
    fn directories_are_skipped() {
        let (_dir, store) = store_with(&["team/carol"]);
        let mut diags = Vec::new();
        assert!(store.resolve("team", &mut diags).is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn recursive_wildcards() {
        let (_dir, store) = store_with(&["alice", "team/carol", "team/ops/dave"]);
        let mut diags = Vec::new();
        for (pattern, expected) in [
            ("**", &["alice", "team/carol", "team/ops/dave"][..]),
            ("**/*", &["alice", "team/carol", "team/ops/dave"][..]),
            ("team/**", &["team/carol", "team/ops/dave"][..]),
            ("team/**/dave", &["team/ops/dave"][..]),
            ("./team/ops/../**", &["team/carol", "team/ops/dave"][..]),
        ] {
            let mut found = names(&store, &store.resolve(pattern, &mut diags));
            found.sort();
            assert_eq!(found, expected, "pattern {pattern}");
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn doubled_star_inside_a_name() {
        let (_dir, store) = store_with(&["alice", "alice-laptop", "bob"]);
        let mut diags = Vec::new();
        assert_eq!(
            names(&store, &store.resolve("alice**", &mut diags)),
            vec!["alice", "alice-laptop"]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn glob_rewriting() -> Result<()> {
        for (input, expected) in [
            ("**", "**/*"),
            ("team/**", "team/**/*"),
            ("**/*", "**/*"),
            ("a**b", "a*b"),
            ("team/***", "team/*"),
            ("/abs/**", "/abs/**/*"),
            ("alice", "alice"),
        ] {
            assert_eq_as_result!(glob_pattern(input), expected)
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("input {input}"))?;
        }
        Ok(())
    }

    #[test]
    fn outside_only_warns_once() {
        let (dir, store) = store_with(&["alice"]);
        fs::write(dir.path().join("secret"), "not a key").unwrap();
        let mut diags = Vec::new();
        assert!(store.resolve("../secret", &mut diags).is_empty());
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0], Diagnostic::OutsideBase { .. }));
    }

    #[test]
    fn traversal_is_contained() {
        let (dir, store) = store_with(&["alice"]);
        fs::write(dir.path().join("secret"), "not a key").unwrap();
        let mut diags = Vec::new();
        assert!(store.resolve("../secret", &mut diags).is_empty());
        assert!(matches!(diags[0], Diagnostic::OutsideBase { .. }));
    }

    #[test]
    fn absolute_pattern_is_contained() {
        let (dir, store) = store_with(&["alice"]);
        let outside = dir.path().join("secret");
        fs::write(&outside, "not a key").unwrap();
        let mut diags = Vec::new();
        assert!(store
            .resolve(&outside.to_string_lossy(), &mut diags)
            .is_empty());
        assert!(matches!(diags[0], Diagnostic::OutsideBase { .. }));
    }

    #[test]
    fn sibling_with_common_prefix_is_outside() {
        let (dir, store) = store_with(&["alice"]);
        let sibling = dir.path().join("keys2");
        fs::create_dir(&sibling).unwrap();
        fs::write(sibling.join("eve"), "ssh-ed25519 EVE").unwrap();
        let mut diags = Vec::new();
        assert!(store.resolve("../keys2/eve", &mut diags).is_empty());
        assert!(matches!(diags[0], Diagnostic::OutsideBase { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_contained() {
        let (dir, store) = store_with(&["alice"]);
        let outside = dir.path().join("secret");
        fs::write(&outside, "not a key").unwrap();
        std::os::unix::fs::symlink(&outside, store.base().join("sneaky")).unwrap();
        let mut diags = Vec::new();
        assert_eq!(names(&store, &store.resolve("*", &mut diags)), vec!["alice"]);
        assert!(matches!(diags[0], Diagnostic::OutsideBase { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_within_store_resolves_to_target() {
        let (_dir, store) = store_with(&["team/carol"]);
        std::os::unix::fs::symlink(
            store.base().join("team/carol"),
            store.base().join("carol"),
        )
        .unwrap();
        let mut diags = Vec::new();
        assert_eq!(
            names(&store, &store.resolve("carol", &mut diags)),
            vec!["team/carol"]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn base_with_glob_characters() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("k[e]ys*");
        fs::create_dir(&keys).unwrap();
        fs::write(keys.join("alice"), "ssh-ed25519 AAAA").unwrap();
        let store = KeyStore::open(&keys).unwrap();
        let mut diags = Vec::new();
        assert_eq!(store.resolve("alice", &mut diags).len(), 1);
        assert!(diags.is_empty());
    }

    #[test]
    fn invalid_pattern_warns() {
        let (_dir, store) = store_with(&["alice"]);
        let mut diags = Vec::new();
        assert!(store.resolve("[", &mut diags).is_empty());
        assert!(matches!(diags[0], Diagnostic::InvalidPattern { .. }));
    }

    #[test]
    fn missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let _ = KeyStore::open(dir.path().join("keys")).unwrap_err();
        let _ = KeyStore::open(Path::new("/dev/null")).unwrap_err();
    }
}
