// src/tasks/alias.rs

//! `alias:run` and `alias:rm`. The work happens in the aliased tasks, which
//! run first as dependencies; the alias only passes their result on.

use async_trait::async_trait;
use tracing::debug;

use crate::dag::TaskName;
use crate::errors::Result;
use crate::exec::task::format_name;
use crate::exec::{ExecuteContext, Task};

pub struct AliasTask {
    name: TaskName,
}

impl AliasTask {
    pub fn new(name: TaskName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Task for AliasTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        format_name("alias", &self.name)
    }

    async fn run(&self, _ctx: &mut ExecuteContext, deps_modified: bool) -> Result<bool> {
        debug!(task = %self.repr(), deps_modified, "alias complete");
        Ok(deps_modified)
    }
}
