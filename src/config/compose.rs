// src/config/compose.rs

//! `compose` resources: a docker-compose project.

use std::fmt;

use serde::Deserialize;

use crate::config::types::Annotations;
use crate::errors::Result;
use crate::execenv::ExecEnv;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ComposeConfig {
    pub files: Vec<String>,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default)]
    pub depends: Vec<String>,
    /// Seconds to wait for containers to stop before killing them.
    #[serde(default = "default_stop_grace")]
    pub stop_grace: u64,
    #[serde(default)]
    pub annotations: Annotations,
}

fn default_project() -> String {
    "{unique}".to_string()
}

fn default_stop_grace() -> u64 {
    5
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            project: default_project(),
            depends: Vec::new(),
            stop_grace: default_stop_grace(),
            annotations: Annotations::default(),
        }
    }
}

impl ComposeConfig {
    /// `-f file ... -p project`, the prefix of every compose invocation.
    pub fn base_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.files.len() * 2 + 2);
        for file in &self.files {
            args.push("-f".to_string());
            args.push(file.clone());
        }
        args.push("-p".to_string());
        args.push(self.project.clone());
        args
    }

    pub fn resolve(&self, env: &ExecEnv) -> Result<Self> {
        Ok(Self {
            files: env.resolve_all(&self.files)?,
            project: env.resolve(&self.project)?,
            ..self.clone()
        })
    }
}

impl fmt::Display for ComposeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotations.description.is_empty() {
            return f.write_str(&self.annotations.description);
        }
        write!(f, "Run Compose project '{}' from: {}", self.project, self.files.join(", "))
    }
}
