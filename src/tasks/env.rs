// src/tasks/env.rs

//! `env:set` and `env:rm`.
//!
//! Variables are written into this process's environment, where `{env.*}`
//! lookups and every child process started afterwards see them.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::types::split_env;
use crate::config::EnvConfig;
use crate::dag::TaskName;
use crate::errors::{DobiError, Result};
use crate::exec::task::format_name;
use crate::exec::{set_env_var, ExecuteContext, Task};
use crate::fs::paths::abs_path;
use crate::fs::FileSystem;

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped.
pub fn parse_env_file(contents: &str) -> std::result::Result<Vec<(String, String)>, String> {
    let mut vars = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = split_env(line)
            .ok_or_else(|| format!("line {}: expected KEY=VALUE, got {line:?}", index + 1))?;
        vars.push((key.trim().to_string(), value.to_string()));
    }
    Ok(vars)
}

fn read_env_file(
    fs: &dyn FileSystem,
    work_dir: &Path,
    resource: &str,
    file: &str,
) -> Result<Vec<(String, String)>> {
    let path = abs_path(work_dir, file).map_err(|e| DobiError::Resolve(format!("{e:#}")))?;
    let contents = fs
        .read_to_string(&path)
        .map_err(|e| DobiError::config(format!("{resource}.files"), format!("{e:#}")))?;
    parse_env_file(&contents)
        .map_err(|msg| DobiError::config(format!("{resource}.files"), format!("{file}: {msg}")))
}

pub struct SetTask {
    name: TaskName,
    config: EnvConfig,
}

impl SetTask {
    pub fn new(name: TaskName, config: EnvConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for SetTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        format_name("env", &self.name)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let resource = self.name.resource();

        let mut vars = Vec::new();
        for file in &self.config.files {
            vars.extend(read_env_file(ctx.fs.as_ref(), ctx.work_dir(), resource, file)?);
        }
        for entry in &self.config.variables {
            let (key, value) = split_env(entry).ok_or_else(|| {
                DobiError::config(
                    format!("{resource}.variables"),
                    format!("expected KEY=VALUE, got {entry:?}"),
                )
            })?;
            vars.push((key.to_string(), value.to_string()));
        }

        let mut changed = 0;
        for (key, value) in &vars {
            if std::env::var(key).ok().as_deref() == Some(value.as_str()) {
                continue;
            }
            debug!(task = %repr, variable = %key, "setting variable");
            set_env_var(key, value);
            changed += 1;
        }

        if changed == 0 {
            info!(task = %repr, "is fresh");
        } else {
            info!(task = %repr, changed, "Set");
        }
        Ok(changed > 0)
    }
}

/// Variables are not unset; removal is a no-op.
pub struct RemoveTask {
    name: TaskName,
}

impl RemoveTask {
    pub fn new(name: TaskName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Task for RemoveTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        format_name("env", &self.name)
    }

    async fn run(&self, _ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_file_lines() {
        let vars = parse_env_file("# build settings\n\nGOOS=linux\n  CGO_ENABLED = 0\nLDFLAGS=-s -w\n")
            .unwrap();
        assert_eq!(
            vars,
            vec![
                ("GOOS".to_string(), "linux".to_string()),
                ("CGO_ENABLED".to_string(), " 0".to_string()),
                ("LDFLAGS".to_string(), "-s -w".to_string()),
            ]
        );
    }

    #[test]
    fn env_file_rejects_bare_words() {
        let err = parse_env_file("A=1\nnot-a-pair\n").unwrap_err();
        assert!(err.contains("line 2"), "{err}");
    }
}
