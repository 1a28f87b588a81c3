// src/tasks/job/run.rs

//! `job:run` and `job:capture(VAR)`.

use async_trait::async_trait;
use tracing::info;

use super::container::container_spec;
use super::freshness::is_stale;
use super::lifecycle::run_container;
use super::repr;
use crate::config::{ImageConfig, JobConfig, MountConfig};
use crate::dag::TaskName;
use crate::engine::{ContainerSpec, OutputMode};
use crate::errors::Result;
use crate::exec::{set_env_var, ExecuteContext, Task};

/// Image and mounts a job runs with, looked up through the context so their
/// variables are resolved.
struct Inputs {
    image: ImageConfig,
    mounts: Vec<MountConfig>,
}

fn inputs(ctx: &mut ExecuteContext, config: &JobConfig) -> Result<Inputs> {
    let image = ctx.image(&config.use_image)?;
    let mounts = config
        .mounts
        .iter()
        .map(|m| ctx.mount(m))
        .collect::<Result<Vec<_>>>()?;
    Ok(Inputs { image, mounts })
}

fn spec(
    ctx: &ExecuteContext,
    name: &TaskName,
    config: &JobConfig,
    inputs: &Inputs,
) -> Result<ContainerSpec> {
    let docker_host = std::env::var("DOCKER_HOST").ok();
    container_spec(
        ctx.container_name(name.resource()),
        config,
        &inputs.image,
        &inputs.mounts,
        &ctx.env,
        ctx.settings.bind_mount,
        docker_host.as_deref(),
    )
}

pub struct RunTask {
    name: TaskName,
    config: JobConfig,
}

impl RunTask {
    pub fn new(name: TaskName, config: JobConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for RunTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let inputs = inputs(ctx, &self.config)?;

        if !is_stale(ctx, &repr, &self.config, &inputs.image, &inputs.mounts, deps_modified).await {
            info!(task = %repr, "is fresh");
            return Ok(false);
        }

        let spec = spec(ctx, &self.name, &self.config, &inputs)?;
        info!(task = %repr, "Running");
        run_container(&ctx.engine, &repr, &spec, OutputMode::Inherit).await?;
        info!(task = %repr, "Done");
        Ok(true)
    }
}

/// Runs the job with stdout captured and exports the trimmed output.
/// Always runs; reports modified only when the variable's value changed.
pub struct CaptureTask {
    name: TaskName,
    config: JobConfig,
    variable: String,
}

impl CaptureTask {
    pub fn new(name: TaskName, config: JobConfig, variable: String) -> Self {
        Self {
            name,
            config,
            variable,
        }
    }
}

#[async_trait]
impl Task for CaptureTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let inputs = inputs(ctx, &self.config)?;

        let mut spec = spec(ctx, &self.name, &self.config, &inputs)?;
        spec.open_stdin = false;
        spec.tty = false;
        spec.stdin_once = false;

        let output = run_container(&ctx.engine, &repr, &spec, OutputMode::Capture).await?;
        let value = String::from_utf8_lossy(&output).trim().to_string();

        if std::env::var(&self.variable).ok().as_deref() == Some(value.as_str()) {
            info!(task = %repr, variable = %self.variable, "value unchanged");
            return Ok(false);
        }
        set_env_var(&self.variable, &value);
        info!(task = %repr, variable = %self.variable, "Captured");
        Ok(true)
    }
}
