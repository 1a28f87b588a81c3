// src/tasks/mount.rs

//! `mount:create` and `mount:rm`.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::MountConfig;
use crate::dag::TaskName;
use crate::errors::Result;
use crate::exec::task::format_name;
use crate::exec::{ExecuteContext, Task};

fn repr(name: &TaskName, config: &MountConfig) -> String {
    format!("{} {}:{}", format_name("mount", name), config.bind, config.path)
}

/// Creates the host side of a bind mount when it does not exist yet.
pub struct CreateTask {
    name: TaskName,
    config: MountConfig,
}

impl CreateTask {
    pub fn new(name: TaskName, config: MountConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for CreateTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let path = self.config.host_path(ctx.work_dir())?;
        if ctx.fs.exists(&path) {
            info!(task = %repr, "is fresh");
            return Ok(false);
        }

        let mode = self.config.create_mode();
        if self.config.file {
            if let Some(parent) = path.parent() {
                ctx.fs.create_dir_all(parent, 0o755)?;
            }
            ctx.fs.create_file(&path, mode)?;
        } else {
            ctx.fs.create_dir_all(&path, mode)?;
        }
        debug!(task = %repr, path = %path.display(), mode = format!("{mode:o}"), "created");
        info!(task = %repr, "Created");
        Ok(true)
    }
}

/// Bind mounts hold user files, so removal only reports.
pub struct RemoveTask {
    name: TaskName,
    config: MountConfig,
}

impl RemoveTask {
    pub fn new(name: TaskName, config: MountConfig) -> Self {
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

    async fn run(&self, _ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        warn!(task = %self.repr(), "bind mounts are not removed");
        Ok(false)
    }
}
