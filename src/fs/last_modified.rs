// src/fs/last_modified.rs

//! Newest modification time across a set of paths.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

use super::dockerignore::Excludes;
use super::paths::relative_str;
use super::FileSystem;

/// Walk every path (recursively for directories) and return the newest
/// mtime seen. Relative paths are taken relative to `root`; excluded entries
/// are skipped and excluded directories are not descended into.
///
/// A path that does not exist is an error. An empty path list yields the
/// Unix epoch.
pub fn last_modified<P: AsRef<Path>>(
    fs: &dyn FileSystem,
    root: &Path,
    excludes: &Excludes,
    paths: &[P],
) -> Result<SystemTime> {
    let mut newest = SystemTime::UNIX_EPOCH;

    for path in paths {
        let path = path.as_ref();
        let start = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        if !fs.exists(&start) {
            anyhow::bail!("path {:?} does not exist", start);
        }

        let mut stack: Vec<PathBuf> = vec![start];
        while let Some(current) = stack.pop() {
            if !excludes.is_empty() {
                let rel = relative_str(root, &current)
                    .unwrap_or_else(|| current.to_string_lossy().into_owned());
                if excludes.is_excluded(&rel) {
                    continue;
                }
            }

            let mtime = fs
                .modified(&current)
                .with_context(|| format!("reading mtime of {:?}", current))?;
            if mtime > newest {
                newest = mtime;
            }

            if fs.is_dir(&current) {
                stack.extend(fs.read_dir(&current)?);
            }
        }
    }

    Ok(newest)
}
