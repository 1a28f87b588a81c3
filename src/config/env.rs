// src/config/env.rs

//! `env` resources: environment variables set for later tasks.

use std::fmt;

use serde::Deserialize;

use crate::config::types::{Annotations, Capture};
use crate::errors::Result;
use crate::execenv::ExecEnv;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EnvConfig {
    /// Files of `KEY=VALUE` lines.
    #[serde(default)]
    pub files: Vec<String>,
    /// `KEY=VALUE` entries; applied after `files`.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Jobs whose stdout becomes a variable.
    #[serde(default)]
    pub captures: Vec<Capture>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl EnvConfig {
    pub fn resolve(&self, env: &ExecEnv) -> Result<Self> {
        Ok(Self {
            files: env.resolve_all(&self.files)?,
            variables: env.resolve_all(&self.variables)?,
            ..self.clone()
        })
    }
}

impl fmt::Display for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotations.description.is_empty() {
            return f.write_str(&self.annotations.description);
        }
        let mut sources: Vec<String> = self.files.clone();
        if !self.variables.is_empty() {
            sources.push(format!("{} variables", self.variables.len()));
        }
        for capture in &self.captures {
            sources.push(format!("{} from {}", capture.variable, capture.job));
        }
        write!(f, "Set environment variables from: {}", sources.join(", "))
    }
}
