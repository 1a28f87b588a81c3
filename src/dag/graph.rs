// src/dag/graph.rs

//! Turn the requested task names into an ordered task list.
//!
//! The walk is a depth-first traversal over `(resource, action)` pairs.
//! Each task's dependencies come from the per-action mapping in
//! [`crate::tasks::dependencies`]. A [`Stack`] of the tasks currently being
//! visited detects cycles; a `seen` set collapses tasks reached through
//! several paths into a single entry.

use std::collections::HashSet;

use tracing::debug;

use crate::config::Config;
use crate::dag::name::TaskName;
use crate::dag::stack::Stack;
use crate::errors::{DobiError, Result};
use crate::tasks;

/// A task ready to run, with its direct dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
}

impl PlannedTask {
    /// Resource names of the direct dependencies.
    pub fn dep_resources(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(TaskName::resource)
    }
}

/// Order the tasks reachable from `roots` so that every task comes after
/// all of its dependencies.
pub fn collect(config: &Config, roots: &[String]) -> Result<Vec<PlannedTask>> {
    let mut walk = Walk {
        config,
        stack: Stack::new(),
        seen: HashSet::new(),
        ordered: Vec::new(),
    };

    for root in roots {
        let name = TaskName::parse(root).map_err(|msg| DobiError::config(root.as_str(), msg))?;
        walk.visit(name)?;
    }

    debug!(
        tasks = ?walk.ordered.iter().map(|t| t.name.to_string()).collect::<Vec<_>>(),
        "task order"
    );
    Ok(walk.ordered)
}

struct Walk<'a> {
    config: &'a Config,
    stack: Stack,
    seen: HashSet<TaskName>,
    ordered: Vec<PlannedTask>,
}

impl Walk<'_> {
    fn visit(&mut self, name: TaskName) -> Result<()> {
        let resource = self
            .config
            .get(name.resource())
            .ok_or_else(|| DobiError::MissingResource(name.resource().to_string()))?;
        let name = tasks::resolve_action(&name, resource)?;

        if self.stack.contains(&name) {
            return Err(DobiError::CyclicDependency(self.stack.names()));
        }
        if self.seen.contains(&name) {
            return Ok(());
        }

        self.stack.push(name.clone());
        let deps = tasks::dependencies(&name, resource)?;
        let mut resolved_deps = Vec::with_capacity(deps.len());
        for dep in deps {
            let dep_resource = self
                .config
                .get(dep.resource())
                .ok_or_else(|| DobiError::MissingResource(dep.resource().to_string()))?;
            resolved_deps.push(tasks::resolve_action(&dep, dep_resource)?);
            self.visit(dep)?;
        }
        self.stack.pop();

        self.seen.insert(name.clone());
        self.ordered.push(PlannedTask {
            name,
            deps: resolved_deps,
        });
        Ok(())
    }
}
