// src/fs/paths.rs

//! Path helpers: `~` expansion, joining against the working directory and
//! producing slash-separated relative strings for glob matching.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

/// Expand a leading `~` or `~/` using `HOME`.
///
/// `~user` forms are not supported and produce an error.
pub fn expand_user(path: &str) -> Result<String> {
    if !path.starts_with('~') {
        return Ok(path.to_string());
    }
    let rest = &path[1..];
    if !rest.is_empty() && !rest.starts_with('/') {
        bail!("expanding ~user/ paths is not supported: {path}");
    }
    let home = std::env::var("HOME").unwrap_or_default();
    if home.is_empty() {
        bail!("cannot expand {path}: HOME is not set");
    }
    Ok(format!("{home}{rest}"))
}

/// Expand `~` and make `path` absolute relative to `workdir`.
pub fn abs_path(workdir: &Path, path: &str) -> Result<PathBuf> {
    let expanded = expand_user(path)?;
    let candidate = Path::new(&expanded);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workdir.join(candidate)
    };
    Ok(clean(&joined))
}

/// Lexically normalise a path: drop `.` components and fold `..`.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(if s.is_empty() { ".".to_string() } else { s })
}
