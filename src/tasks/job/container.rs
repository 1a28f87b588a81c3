// src/tasks/job/container.rs

//! Translate a job resource into engine container options.

use std::path::Path;

use crate::config::{ImageConfig, JobConfig, MountConfig};
use crate::engine::ContainerSpec;
use crate::errors::Result;
use crate::execenv::ExecEnv;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Container options for `config`.
///
/// With `bind_mounts` off, `mounts` are ignored and the container gets no
/// binds apart from the engine socket of a `provide-docker` job.
///
/// `docker_host` is the caller's `DOCKER_HOST`; it only matters for
/// `provide-docker` jobs, which either inherit it or get the local engine
/// socket bound in.
pub fn container_spec(
    name: String,
    config: &JobConfig,
    image: &ImageConfig,
    mounts: &[MountConfig],
    env: &ExecEnv,
    bind_mounts: bool,
    docker_host: Option<&str>,
) -> Result<ContainerSpec> {
    let work_dir = env.work_dir();

    let mut binds = Vec::new();
    if bind_mounts {
        binds = bind_specs(mounts, work_dir)?;
    }
    let mut environ = config.env.clone();
    if config.provide_docker {
        match docker_host {
            Some(host) if !host.is_empty() => environ.push(format!("DOCKER_HOST={host}")),
            _ => binds.push(format!("{DOCKER_SOCKET}:{DOCKER_SOCKET}")),
        }
    }

    Ok(ContainerSpec {
        name,
        image: image.canonical_name(env),
        command: config.command.argv().to_vec(),
        entrypoint: config.entrypoint.argv().to_vec(),
        env: environ,
        working_dir: config.working_dir.clone(),
        user: config.user.clone(),
        labels: config.labels.clone(),
        net_mode: config.net_mode.clone(),
        privileged: config.privileged,
        binds,
        ports: config.ports.clone(),
        devices: config.devices.iter().map(|d| d.mapping()).collect(),
        open_stdin: config.interactive,
        tty: config.interactive,
        stdin_once: config.interactive,
    })
}

fn bind_specs(mounts: &[MountConfig], work_dir: &Path) -> Result<Vec<String>> {
    mounts.iter().map(|m| m.bind_spec(work_dir)).collect()
}
