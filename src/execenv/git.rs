// src/execenv/git.rs

//! `git.*` namespace lookups.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use git2::Repository;

/// Number of characters in `git.short-sha`.
pub const SHORT_SHA_LEN: usize = 10;

/// Look up `branch`, `sha` or `short-sha` for the repository containing
/// `dir`.
pub fn lookup(dir: &Path, key: &str) -> Result<String> {
    let repo = Repository::discover(dir)
        .with_context(|| format!("opening git repository at {:?}", dir))?;
    match key {
        "branch" => branch(&repo),
        "sha" => head_sha(&repo),
        "short-sha" => {
            let sha = head_sha(&repo)?;
            Ok(sha.chars().take(SHORT_SHA_LEN).collect())
        }
        other => bail!("unknown variable \"git.{other}\""),
    }
}

fn branch(repo: &Repository) -> Result<String> {
    let head = repo.head().context("reading HEAD")?;
    head.shorthand()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("HEAD is not a valid UTF-8 reference"))
}

fn head_sha(repo: &Repository) -> Result<String> {
    let head = repo.head().context("reading HEAD")?;
    let oid = head
        .target()
        .ok_or_else(|| anyhow!("HEAD does not point at a commit"))?;
    Ok(oid.to_string())
}

pub fn is_known_key(key: &str) -> bool {
    matches!(key, "branch" | "sha" | "short-sha")
}
