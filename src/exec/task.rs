// src/exec/task.rs

//! The unit of work the runner drives.

use async_trait::async_trait;

use crate::dag::TaskName;
use crate::errors::Result;
use crate::exec::context::ExecuteContext;

/// One `(resource, action)` ready to run.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &TaskName;

    /// Log prefix, e.g. `[job:run compile] builder go build ./...`.
    fn repr(&self) -> String;

    /// Perform the action. Returns whether anything changed, which makes
    /// dependents stale.
    async fn run(&self, ctx: &mut ExecuteContext, deps_modified: bool) -> Result<bool>;

    /// Undo or halt whatever `run` left behind. Called in reverse order on
    /// the tasks that completed before a later task failed.
    async fn stop(&self, _ctx: &mut ExecuteContext) -> Result<()> {
        Ok(())
    }
}

/// `[kind:action resource]`.
pub fn format_name(kind: &str, name: &TaskName) -> String {
    match name.action() {
        Some(action) => format!("[{kind}:{action} {}]", name.resource()),
        None => format!("[{kind} {}]", name.resource()),
    }
}
