// src/tasks/service.rs

//! `service:run` and `service:rm` for swarm services.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::dag::TaskName;
use crate::engine::ServiceSpec;
use crate::errors::Result;
use crate::exec::task::format_name;
use crate::exec::{ExecuteContext, Task};

fn repr(name: &TaskName, config: &ServiceConfig) -> String {
    format!(
        "{} {} x{}",
        format_name("service", name),
        config.job.use_image,
        config.replicas
    )
}

/// Creates the service, or scales it when the replica count changed.
pub struct RunTask {
    name: TaskName,
    config: ServiceConfig,
}

impl RunTask {
    pub fn new(name: TaskName, config: ServiceConfig) -> Self {
        Self { name, config }
    }

    fn spec(&self, ctx: &mut ExecuteContext) -> Result<ServiceSpec> {
        let job = &self.config.job;
        let image = ctx.image(&job.use_image)?;
        let mut binds = Vec::new();
        if ctx.settings.bind_mount {
            for mount in &job.mounts {
                binds.push(ctx.mount(mount)?.bind_spec(ctx.work_dir())?);
            }
        }
        Ok(ServiceSpec {
            name: ctx.container_name(self.name.resource()),
            image: image.canonical_name(&ctx.env),
            command: job.command.argv().to_vec(),
            env: job.env.clone(),
            labels: job.labels.clone(),
            ports: job.ports.clone(),
            binds,
            replicas: self.config.replicas,
        })
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

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let spec = self.spec(ctx)?;

        let existing = ctx
            .engine
            .list_services()
            .await?
            .into_iter()
            .find(|s| s.name == spec.name);

        match existing {
            None => {
                ctx.engine.create_service(&spec).await?;
                info!(task = %repr, service = %spec.name, "Created");
                Ok(true)
            }
            Some(current) if current.replicas != spec.replicas => {
                ctx.engine.update_service(&spec).await?;
                info!(task = %repr, service = %spec.name, from = current.replicas, to = spec.replicas, "Scaled");
                Ok(true)
            }
            Some(_) => {
                info!(task = %repr, service = %spec.name, "already running");
                Ok(false)
            }
        }
    }
}

pub struct RemoveTask {
    name: TaskName,
    config: ServiceConfig,
}

impl RemoveTask {
    pub fn new(name: TaskName, config: ServiceConfig) -> Self {
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
        let service = ctx.container_name(self.name.resource());
        if let Err(err) = ctx.engine.remove_service(&service).await {
            warn!(task = %repr, service = %service, error = %err, "failed to remove service");
            return Ok(false);
        }
        info!(task = %repr, "Removed");
        Ok(true)
    }
}
