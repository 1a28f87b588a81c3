// src/config/mount.rs

//! `mount` resources: host directories or files bound into job containers.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::types::{Annotations, FileMode};
use crate::errors::{DobiError, Result};
use crate::execenv::ExecEnv;
use crate::fs::paths::abs_path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MountConfig {
    /// Host path; may be relative to the project directory or start with `~`.
    pub bind: String,
    /// Path inside the container.
    pub path: String,
    #[serde(default)]
    pub read_only: bool,
    /// Create an empty file instead of a directory when `bind` is missing.
    #[serde(default)]
    pub file: bool,
    #[serde(default)]
    pub mode: Option<FileMode>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl MountConfig {
    /// Absolute host path.
    pub fn host_path(&self, work_dir: &Path) -> Result<PathBuf> {
        abs_path(work_dir, &self.bind).map_err(|e| DobiError::Resolve(format!("{e:#}")))
    }

    /// `host:container:rw|ro`, as passed to the engine.
    pub fn bind_spec(&self, work_dir: &Path) -> Result<String> {
        let host = self.host_path(work_dir)?;
        let mode = if self.read_only { "ro" } else { "rw" };
        Ok(format!("{}:{}:{}", host.display(), self.path, mode))
    }

    /// Permission bits used when creating the host path.
    pub fn create_mode(&self) -> u32 {
        match self.mode {
            Some(FileMode(bits)) => bits,
            None if self.file => 0o644,
            None => 0o755,
        }
    }

    pub fn resolve(&self, env: &ExecEnv) -> Result<Self> {
        Ok(Self {
            bind: env.resolve(&self.bind)?,
            path: env.resolve(&self.path)?,
            ..self.clone()
        })
    }
}

impl fmt::Display for MountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotations.description.is_empty() {
            return f.write_str(&self.annotations.description);
        }
        write!(f, "Create directory '{}' to be mounted at '{}'", self.bind, self.path)
    }
}
