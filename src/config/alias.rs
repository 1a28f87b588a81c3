// src/config/alias.rs

//! `alias` resources: a named list of tasks.

use std::fmt;

use serde::Deserialize;

use crate::config::types::Annotations;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AliasConfig {
    /// Task names (`resource` or `resource:action`), run in order.
    pub tasks: Vec<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl fmt::Display for AliasConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotations.description.is_empty() {
            return f.write_str(&self.annotations.description);
        }
        write!(f, "Run tasks: {}", self.tasks.join(", "))
    }
}
