// src/fs/globs.rs

//! Glob lists used by job `artifact` and `sources`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher};
use serde::Deserialize;

use super::paths::relative_str;
use super::FileSystem;

/// A list of glob patterns, written in config as a single string or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct PathGlobs {
    globs: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for PathGlobs {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => PathGlobs { globs: vec![s] },
            OneOrMany::Many(v) => PathGlobs { globs: v },
        }
    }
}

impl From<Vec<String>> for PathGlobs {
    fn from(globs: Vec<String>) -> Self {
        PathGlobs { globs }
    }
}

impl PathGlobs {
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// Check every pattern parses.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for g in &self.globs {
            Glob::new(g).map_err(|e| format!("invalid glob {g:?}: {e}"))?;
        }
        Ok(())
    }

    /// Apply `f` to each pattern, keeping errors.
    pub fn try_map<E>(
        &self,
        mut f: impl FnMut(&str) -> std::result::Result<String, E>,
    ) -> std::result::Result<Self, E> {
        let globs = self
            .globs
            .iter()
            .map(|g| f(g))
            .collect::<std::result::Result<Vec<_>, E>>()?;
        Ok(PathGlobs { globs })
    }

    /// Expand the patterns against the filesystem under `root`. Patterns
    /// without wildcards are returned when the path exists; wildcard
    /// patterns are matched by walking from their literal prefix.
    pub fn paths(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();
        for pattern in &self.globs {
            if !has_meta(pattern) {
                let path = resolve(root, pattern);
                if fs.exists(&path) {
                    found.insert(path);
                }
                continue;
            }

            let base = resolve(root, &literal_prefix(pattern));
            if !fs.exists(&base) {
                continue;
            }
            let absolute = Path::new(pattern).is_absolute();
            let matcher = compile(pattern)?;

            let mut stack = vec![base];
            while let Some(current) = stack.pop() {
                let candidate = if absolute {
                    Some(current.to_string_lossy().replace('\\', "/"))
                } else {
                    relative_str(root, &current)
                };
                if let Some(candidate) = candidate {
                    if matcher.is_match(&candidate) {
                        found.insert(current.clone());
                    }
                }
                if fs.is_dir(&current) {
                    stack.extend(fs.read_dir(&current)?);
                }
            }
        }
        Ok(found.into_iter().collect())
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    let glob = GlobBuilder::new(trimmed)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob {pattern:?}"))?;
    Ok(glob.compile_matcher())
}

fn has_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Leading path components that contain no glob metacharacters.
fn literal_prefix(pattern: &str) -> String {
    let mut parts = Vec::new();
    for part in pattern.split('/') {
        if has_meta(part) {
            break;
        }
        parts.push(part);
    }
    let prefix = parts.join("/");
    if prefix.is_empty() && pattern.starts_with('/') {
        "/".to_string()
    } else if prefix.is_empty() {
        ".".to_string()
    } else {
        prefix
    }
}

fn resolve(root: &Path, pattern: &str) -> PathBuf {
    let p = Path::new(pattern);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        super::paths::clean(&root.join(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn deserializes_string_or_list() {
        let one: PathGlobs = serde_yaml::from_str("dist/out").unwrap();
        assert_eq!(one.globs(), ["dist/out"]);
        let many: PathGlobs = serde_yaml::from_str("[a, 'b/*.go']").unwrap();
        assert_eq!(many.globs(), ["a", "b/*.go"]);
    }

    #[test]
    fn expands_wildcards_from_literal_prefix() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/src/a.go", "");
        fs.add_file("/work/src/a_test.go", "");
        fs.add_file("/work/src/pkg/b.go", "");
        fs.add_file("/work/README.md", "");

        let globs = PathGlobs::from(vec!["src/*.go".to_string()]);
        let paths = globs.paths(&fs, Path::new("/work")).unwrap();
        assert_eq!(
            paths,
            vec![PathBuf::from("/work/src/a.go"), PathBuf::from("/work/src/a_test.go")]
        );

        let globs = PathGlobs::from(vec!["src/**/*.go".to_string()]);
        let paths = globs.paths(&fs, Path::new("/work")).unwrap();
        assert!(paths.contains(&PathBuf::from("/work/src/pkg/b.go")));
    }

    #[test]
    fn literal_paths_only_when_present() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/dist/out", "");
        let globs = PathGlobs::from(vec!["dist/out".to_string(), "dist/missing".to_string()]);
        assert_eq!(
            globs.paths(&fs, Path::new("/work")).unwrap(),
            vec![PathBuf::from("/work/dist/out")]
        );
    }

    #[test]
    fn validate_reports_bad_glob() {
        let globs = PathGlobs::from(vec!["src/[".to_string()]);
        assert!(globs.validate().is_err());
    }
}
