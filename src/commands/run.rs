// src/commands/run.rs

//! `dobi run TASK...`.

use tracing::{debug, info};

use crate::config::Config;
use crate::dag;
use crate::errors::{DobiError, Result};
use crate::exec::{run_tasks, ExecuteContext, TaskReport};

/// The task names to run: the ones given, or `meta.default`.
pub fn requested_tasks(config: &Config, tasks: &[String]) -> Result<Vec<String>> {
    if !tasks.is_empty() {
        return Ok(tasks.to_vec());
    }
    match &config.meta.default {
        Some(default) => {
            debug!(task = %default, "running default task");
            Ok(vec![default.clone()])
        }
        None => Err(DobiError::config(
            "meta.default",
            "no task given and no default task is set",
        )),
    }
}

/// Plan and run `tasks` with everything they depend on.
pub async fn run(ctx: &mut ExecuteContext, tasks: &[String]) -> Result<Vec<TaskReport>> {
    let roots = requested_tasks(&ctx.config, tasks)?;
    let plan = dag::collect(&ctx.config, &roots)?;
    info!(
        tasks = plan.len(),
        exec_id = %ctx.env.exec_id(),
        "running {}",
        roots.join(", ")
    );
    run_tasks(ctx, &plan).await
}
