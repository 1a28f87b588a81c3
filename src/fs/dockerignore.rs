// src/fs/dockerignore.rs

//! `.dockerignore`-style exclude lists.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use super::paths::clean;
use super::FileSystem;

/// Read exclude patterns from a `.dockerignore` file.
///
/// A missing file yields an empty list. Comment lines (`#`) and blank lines
/// are skipped; each pattern is trimmed and lexically cleaned.
pub fn read_all(fs: &dyn FileSystem, path: &Path) -> Result<Vec<String>> {
    if !fs.exists(path) {
        return Ok(Vec::new());
    }
    let contents = fs.read_to_string(path)?;
    Ok(parse(&contents))
}

/// Parse the contents of an ignore file.
pub fn parse(contents: &str) -> Vec<String> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut patterns = Vec::new();
    for line in contents.lines() {
        if line.starts_with('#') {
            continue;
        }
        let pattern = line.trim();
        if pattern.is_empty() {
            continue;
        }
        let (negate, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, pattern),
        };
        let cleaned = clean(Path::new(body)).to_string_lossy().replace('\\', "/");
        patterns.push(if negate { format!("!{cleaned}") } else { cleaned });
    }
    patterns
}

/// Compiled exclude patterns. The last matching pattern wins, so a later
/// `!pattern` re-includes paths an earlier pattern excluded.
#[derive(Debug, Clone, Default)]
pub struct Excludes {
    rules: Vec<(GlobMatcher, bool)>,
}

impl Excludes {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let (negate, body) = match pattern.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pattern.as_str()),
            };
            let glob = GlobBuilder::new(body)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid exclude pattern {pattern:?}"))?;
            rules.push((glob.compile_matcher(), negate));
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a slash-separated path relative to the walk root is excluded.
    /// The root itself (`.`) is never excluded.
    pub fn is_excluded(&self, rel: &str) -> bool {
        if rel == "." {
            return false;
        }
        let mut excluded = false;
        for (matcher, negate) in &self.rules {
            if matcher.is_match(rel) {
                excluded = !negate;
            }
        }
        excluded
    }
}
