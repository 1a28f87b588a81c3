// src/tasks/job/remove.rs

//! `job:rm`: remove a leftover container and the job's artifact.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::repr;
use crate::config::JobConfig;
use crate::dag::TaskName;
use crate::errors::Result;
use crate::exec::{ExecuteContext, Task};

pub struct RemoveTask {
    name: TaskName,
    config: JobConfig,
}

impl RemoveTask {
    pub fn new(name: TaskName, config: JobConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for RemoveTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();

        let container = ctx.container_name(self.name.resource());
        if let Err(err) = ctx.engine.remove_container(&container, true, true).await {
            warn!(task = %repr, container = %container, error = %err, "failed to remove container");
        }

        match self.config.artifact.paths(ctx.fs.as_ref(), ctx.work_dir()) {
            Ok(paths) => {
                for path in paths {
                    debug!(task = %repr, path = %path.display(), "removing artifact");
                    if let Err(err) = ctx.fs.remove_all(&path) {
                        warn!(task = %repr, path = %path.display(), error = %err, "failed to remove artifact");
                    }
                }
            }
            Err(err) => warn!(task = %repr, error = %err, "failed to expand artifact paths"),
        }

        info!(task = %repr, "Removed");
        Ok(true)
    }
}
