// src/exec/runner.rs

//! Run an ordered task list.
//!
//! Tasks run strictly in order. Each task is built from its resource after
//! variable resolution, is told whether any of its dependencies changed,
//! and reports whether it changed anything itself. When a task fails, every
//! task that was started, the failing one included, is stopped in reverse
//! order and the error is returned wrapped with the failing task's name.

use tracing::{debug, warn};

use crate::config::Resource;
use crate::dag::{PlannedTask, TaskName};
use crate::errors::{DobiError, Result};
use crate::exec::context::ExecuteContext;
use crate::exec::task::Task;
use crate::tasks;

/// Outcome of one task, in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    pub modified: bool,
}

pub async fn run_tasks(ctx: &mut ExecuteContext, plan: &[PlannedTask]) -> Result<Vec<TaskReport>> {
    run_tasks_with(ctx, plan, tasks::build_task).await
}

/// [`run_tasks`] with a custom way of turning a planned task into a driver.
pub async fn run_tasks_with<F>(
    ctx: &mut ExecuteContext,
    plan: &[PlannedTask],
    build: F,
) -> Result<Vec<TaskReport>>
where
    F: Fn(TaskName, Resource) -> Result<Box<dyn Task>>,
{
    let mut started: Vec<Box<dyn Task>> = Vec::new();
    let mut reports = Vec::with_capacity(plan.len());

    for planned in plan {
        let outcome = match prepare(ctx, planned, &build) {
            Ok(task) => {
                let outcome = run_one(ctx, planned, task.as_ref()).await;
                started.push(task);
                outcome
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(modified) => reports.push(TaskReport {
                task: planned.name.to_string(),
                modified,
            }),
            Err(err) => {
                stop_all(ctx, &started).await;
                return Err(DobiError::TaskFailed {
                    task: planned.name.to_string(),
                    source: Box::new(err),
                });
            }
        }
    }
    Ok(reports)
}

fn prepare<F>(ctx: &mut ExecuteContext, planned: &PlannedTask, build: &F) -> Result<Box<dyn Task>>
where
    F: Fn(TaskName, Resource) -> Result<Box<dyn Task>>,
{
    let resource = ctx.resource(planned.name.resource())?.clone();
    build(planned.name.clone(), resource)
}

async fn run_one(ctx: &mut ExecuteContext, planned: &PlannedTask, task: &dyn Task) -> Result<bool> {
    let deps_modified = ctx.is_modified(planned.dep_resources());
    debug!(task = %task.repr(), deps_modified, "running task");

    let modified = task.run(ctx, deps_modified).await?;
    if modified {
        ctx.set_modified(planned.name.resource());
    }
    Ok(modified)
}

async fn stop_all(ctx: &mut ExecuteContext, started: &[Box<dyn Task>]) {
    for task in started.iter().rev() {
        debug!(task = %task.repr(), "stopping task");
        if let Err(err) = task.stop(ctx).await {
            warn!(task = %task.repr(), error = %err, "failed to stop task");
        }
    }
}
