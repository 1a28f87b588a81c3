// src/engine/docker.rs

//! [`Engine`] backed by the `docker` command-line client.
//!
//! Each operation is one `docker …` invocation. Argument lists are built by
//! plain functions so they can be tested without a daemon.
//!
//! Attaching is emulated with `docker start --attach`: `attach_container`
//! only records the request, and `start_container` spawns the attached
//! start in the background. `wait_container` waits for that process before
//! asking the daemon for the exit code, since `docker wait` on a container
//! that has not started yet returns immediately.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::DateTime;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::engine::auth::AuthConfig;
use crate::engine::command;
use crate::engine::{
    AttachOptions, Attachment, BuildOptions, ContainerSpec, Engine, ImageInfo, OutputMode,
    ServiceInfo, ServiceSpec,
};
use crate::errors::{DobiError, Result};

struct PendingAttach {
    opts: AttachOptions,
    tx: oneshot::Sender<Result<Vec<u8>>>,
}

/// Drives a local engine through the `docker` binary.
pub struct DockerCli {
    program: String,
    pending: Mutex<HashMap<String, PendingAttach>>,
    running: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl std::fmt::Debug for DockerCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerCli")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            pending: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
        }
    }

    async fn capture(&self, args: Vec<String>, op: &str, subject: &str) -> Result<String> {
        command::capture(&self.program, &args, op, subject).await
    }

    async fn stream(&self, args: Vec<String>, quiet: bool, op: &str, subject: &str) -> Result<()> {
        command::stream(&self.program, &args, quiet, op, subject).await
    }

    fn spawn_attached(&self, id: &str, pending: PendingAttach) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(start_args(id, true, pending.opts.stdin))
            .stderr(Stdio::inherit())
            .kill_on_drop(false);
        if pending.opts.stdin {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
            // Keep terminal signals away from the client; the job driver
            // forwards them to the container itself.
            #[cfg(unix)]
            cmd.process_group(0);
        }
        match pending.opts.output {
            OutputMode::Capture => cmd.stdout(Stdio::piped()),
            OutputMode::Inherit => cmd.stdout(Stdio::inherit()),
        };

        let mut child = cmd
            .spawn()
            .map_err(|e| DobiError::engine("start container", id, e.to_string()))?;

        let (done_tx, done_rx) = oneshot::channel();
        lock(&self.running).insert(id.to_string(), done_rx);

        let id = id.to_string();
        tokio::spawn(async move {
            let result: Result<Vec<u8>> = async {
                let mut output = Vec::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout
                        .read_to_end(&mut output)
                        .await
                        .map_err(|e| DobiError::engine("attach to container", &id, e.to_string()))?;
                }
                let status = child
                    .wait()
                    .await
                    .map_err(|e| DobiError::engine("attach to container", &id, e.to_string()))?;
                debug!(container = %id, code = ?status.code(), "attached client exited");
                Ok(output)
            }
            .await;
            let _ = pending.tx.send(result);
            let _ = done_tx.send(());
        });
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Engine for DockerCli {
    async fn build_image(&self, opts: &BuildOptions) -> Result<()> {
        self.stream(build_args(opts), opts.quiet, "build image", &opts.name)
            .await
    }

    async fn inspect_image(&self, name: &str) -> Result<Option<ImageInfo>> {
        let args = vec![
            "image".to_string(),
            "inspect".to_string(),
            "--format".to_string(),
            "{{.Id}} {{.Created}}".to_string(),
            name.to_string(),
        ];
        match self.capture(args, "inspect image", name).await {
            Ok(out) => parse_inspect(&out)
                .map(Some)
                .map_err(|msg| DobiError::engine("inspect image", name, msg)),
            Err(DobiError::Engine { message, .. }) if message.contains("No such image") => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn pull_image(
        &self,
        repo: &str,
        tag: &str,
        auth: Option<&AuthConfig>,
        quiet: bool,
    ) -> Result<()> {
        let name = format!("{repo}:{tag}");
        if let Some(auth) = auth {
            debug!(image = %name, registry = %auth.server_address, "pulling with stored credentials");
        }
        let mut args = vec!["pull".to_string()];
        if quiet {
            args.push("--quiet".to_string());
        }
        args.push(name.clone());
        self.stream(args, quiet, "pull image", &name).await
    }

    async fn push_image(&self, name: &str, auth: Option<&AuthConfig>, quiet: bool) -> Result<()> {
        if let Some(auth) = auth {
            debug!(image = %name, registry = %auth.server_address, "pushing with stored credentials");
        }
        let mut args = vec!["push".to_string()];
        if quiet {
            args.push("--quiet".to_string());
        }
        args.push(name.to_string());
        self.stream(args, quiet, "push image", name).await
    }

    async fn tag_image(&self, source: &str, repo: &str, tag: &str) -> Result<()> {
        let target = format!("{repo}:{tag}");
        let args = vec!["tag".to_string(), source.to_string(), target.clone()];
        self.capture(args, "tag image", &target).await.map(drop)
    }

    async fn remove_image(&self, name: &str) -> Result<()> {
        let args = vec!["rmi".to_string(), name.to_string()];
        self.capture(args, "remove image", name).await.map(drop)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let id = self
            .capture(create_args(spec), "create container", &spec.name)
            .await?;
        // Pull progress can precede the ID on stdout.
        let id = id.lines().last().unwrap_or_default().trim().to_string();
        if id.is_empty() {
            return Err(DobiError::engine(
                "create container",
                &spec.name,
                "no container ID returned",
            ));
        }
        Ok(id)
    }

    async fn attach_container(&self, id: &str, opts: AttachOptions) -> Result<Attachment> {
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id.to_string(), PendingAttach { opts, tx });
        Ok(Attachment::from_channel(rx))
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let pending = lock(&self.pending).remove(id);
        match pending {
            Some(pending) => self.spawn_attached(id, pending),
            None => self
                .capture(start_args(id, false, false), "start container", id)
                .await
                .map(drop),
        }
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        let attached = lock(&self.running).remove(id);
        if let Some(done) = attached {
            let _ = done.await;
        }
        let out = self
            .capture(vec!["wait".to_string(), id.to_string()], "wait for container", id)
            .await?;
        out.trim().parse::<i64>().map_err(|e| {
            DobiError::engine("wait for container", id, format!("bad exit code {out:?}: {e}"))
        })
    }

    async fn kill_container(&self, id: &str, signal: &str) -> Result<()> {
        let args = vec![
            "kill".to_string(),
            "--signal".to_string(),
            signal.to_string(),
            id.to_string(),
        ];
        self.capture(args, "kill container", id).await.map(drop)
    }

    async fn remove_container(&self, id: &str, force: bool, remove_volumes: bool) -> Result<()> {
        let attached = lock(&self.pending).remove(id);
        if attached.is_some() {
            warn!(container = %id, "removing container that was attached but never started");
        }
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("--force".to_string());
        }
        if remove_volumes {
            args.push("--volumes".to_string());
        }
        args.push(id.to_string());
        self.capture(args, "remove container", id).await.map(drop)
    }

    async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        let args = vec![
            "service".to_string(),
            "ls".to_string(),
            "--format".to_string(),
            "{{.Name}} {{.Replicas}}".to_string(),
        ];
        let out = self.capture(args, "list", "services").await?;
        Ok(parse_service_list(&out))
    }

    async fn create_service(&self, spec: &ServiceSpec) -> Result<()> {
        self.capture(service_create_args(spec), "create service", &spec.name)
            .await
            .map(drop)
    }

    async fn update_service(&self, spec: &ServiceSpec) -> Result<()> {
        let args = vec![
            "service".to_string(),
            "update".to_string(),
            "--replicas".to_string(),
            spec.replicas.to_string(),
            "--image".to_string(),
            spec.image.clone(),
            spec.name.clone(),
        ];
        self.capture(args, "update service", &spec.name).await.map(drop)
    }

    async fn remove_service(&self, name: &str) -> Result<()> {
        let args = vec!["service".to_string(), "rm".to_string(), name.to_string()];
        self.capture(args, "remove service", name).await.map(drop)
    }
}

pub fn build_args(opts: &BuildOptions) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--file".to_string(),
        opts.dockerfile.to_string_lossy().into_owned(),
        "--tag".to_string(),
        opts.name.clone(),
    ];
    if opts.rm {
        args.push("--rm".to_string());
    }
    if opts.pull {
        args.push("--pull".to_string());
    }
    if opts.quiet {
        args.push("--quiet".to_string());
    }
    for (key, value) in &opts.args {
        args.push("--build-arg".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(opts.context.to_string_lossy().into_owned());
    args
}

pub fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), spec.name.clone()];
    let mut push = |flag: &str, value: &str| {
        args.push(flag.to_string());
        args.push(value.to_string());
    };

    for env in &spec.env {
        push("--env", env);
    }
    if !spec.working_dir.is_empty() {
        push("--workdir", &spec.working_dir);
    }
    if !spec.user.is_empty() {
        push("--user", &spec.user);
    }
    for (key, value) in &spec.labels {
        push("--label", &format!("{key}={value}"));
    }
    if !spec.net_mode.is_empty() {
        push("--network", &spec.net_mode);
    }
    for bind in &spec.binds {
        push("--volume", bind);
    }
    for port in &spec.ports {
        push("--publish", port);
    }
    for device in &spec.devices {
        push("--device", device);
    }
    // The CLI takes a single entrypoint word; the rest leads the command.
    let (entrypoint, entry_args) = match spec.entrypoint.split_first() {
        Some((first, rest)) => (Some(first), rest),
        None => (None, &[][..]),
    };
    if let Some(entrypoint) = entrypoint {
        push("--entrypoint", entrypoint);
    }

    if spec.privileged {
        args.push("--privileged".to_string());
    }
    if spec.open_stdin {
        args.push("--interactive".to_string());
    }
    if spec.tty {
        args.push("--tty".to_string());
    }
    args.push(spec.image.clone());
    args.extend(entry_args.iter().cloned());
    args.extend(spec.command.iter().cloned());
    args
}

pub fn start_args(id: &str, attach: bool, stdin: bool) -> Vec<String> {
    let mut args = vec!["start".to_string()];
    if attach {
        args.push("--attach".to_string());
    }
    if stdin {
        args.push("--interactive".to_string());
    }
    args.push(id.to_string());
    args
}

pub fn service_create_args(spec: &ServiceSpec) -> Vec<String> {
    let mut args = vec![
        "service".to_string(),
        "create".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--replicas".to_string(),
        spec.replicas.to_string(),
    ];
    for env in &spec.env {
        args.push("--env".to_string());
        args.push(env.clone());
    }
    for (key, value) in &spec.labels {
        args.push("--label".to_string());
        args.push(format!("{key}={value}"));
    }
    for port in &spec.ports {
        args.push("--publish".to_string());
        args.push(port.clone());
    }
    for bind in &spec.binds {
        args.push("--mount".to_string());
        args.push(bind_to_mount(bind));
    }
    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

/// `host:container:mode` → `type=bind,source=host,target=container[,readonly]`.
fn bind_to_mount(bind: &str) -> String {
    let mut parts = bind.splitn(3, ':');
    let source = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or(source);
    let read_only = parts.next() == Some("ro");
    let mut mount = format!("type=bind,source={source},target={target}");
    if read_only {
        mount.push_str(",readonly");
    }
    mount
}

/// Parse `<id> <created>` as printed by `docker image inspect --format`.
fn parse_inspect(out: &str) -> std::result::Result<ImageInfo, String> {
    let (id, created) = out
        .trim()
        .split_once(' ')
        .ok_or_else(|| format!("unexpected inspect output {out:?}"))?;
    let created = DateTime::parse_from_rfc3339(created.trim())
        .map_err(|e| format!("bad creation time {created:?}: {e}"))?;
    Ok(ImageInfo {
        id: id.to_string(),
        created: SystemTime::from(created),
    })
}

/// Parse `<name> <running>/<desired>` lines from `docker service ls`.
fn parse_service_list(out: &str) -> Vec<ServiceInfo> {
    out.lines()
        .filter_map(|line| {
            let (name, replicas) = line.trim().split_once(' ')?;
            let desired = replicas
                .split_whitespace()
                .next()
                .and_then(|r| r.split_once('/'))
                .and_then(|(_, desired)| desired.parse().ok())
                .unwrap_or(0);
            Some(ServiceInfo {
                name: name.to_string(),
                replicas: desired,
            })
        })
        .collect()
}
