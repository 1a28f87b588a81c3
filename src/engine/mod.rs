// src/engine/mod.rs

//! Container engine capability interface.
//!
//! Task drivers talk to an [`Engine`] instead of a concrete client. The
//! production implementation is [`docker::DockerCli`], which drives the
//! `docker` command-line client; tests use a recording fake.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::errors::{DobiError, Result};

pub mod auth;
pub mod command;
pub mod docker;

pub use auth::{AuthConfig, AuthStore};
pub use docker::DockerCli;

/// Options for building an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// `image:tag` to apply to the result.
    pub name: String,
    /// Dockerfile path, absolute or relative to `context`.
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub args: BTreeMap<String, String>,
    /// Always attempt to pull a newer base image.
    pub pull: bool,
    /// Remove intermediate containers.
    pub rm: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// What the engine knows about a local image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub created: SystemTime,
}

/// Everything needed to create a job container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub entrypoint: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub user: String,
    pub labels: BTreeMap<String, String>,
    pub net_mode: String,
    pub privileged: bool,
    /// `host:container:mode` bind specs.
    pub binds: Vec<String>,
    /// `host:container[/proto]` port publications.
    pub ports: Vec<String>,
    /// `host:container:permissions` device mappings.
    pub devices: Vec<String>,
    pub open_stdin: bool,
    pub tty: bool,
    pub stdin_once: bool,
}

/// Where an attached container's stdout goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Straight to our stdout.
    #[default]
    Inherit,
    /// Buffered and returned from [`Attachment::wait`].
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttachOptions {
    pub stdin: bool,
    pub tty: bool,
    pub output: OutputMode,
}

/// Handle to a non-blocking attach. Resolves to the captured stdout (empty
/// unless [`OutputMode::Capture`] was requested) once the stream closes.
#[derive(Debug)]
pub struct Attachment {
    inner: AttachmentInner,
}

#[derive(Debug)]
enum AttachmentInner {
    Ready(Vec<u8>),
    Channel(oneshot::Receiver<Result<Vec<u8>>>),
}

impl Attachment {
    pub fn ready(output: Vec<u8>) -> Self {
        Self {
            inner: AttachmentInner::Ready(output),
        }
    }

    pub fn from_channel(rx: oneshot::Receiver<Result<Vec<u8>>>) -> Self {
        Self {
            inner: AttachmentInner::Channel(rx),
        }
    }

    /// Wait for the attached streams to close.
    pub async fn wait(self) -> Result<Vec<u8>> {
        match self.inner {
            AttachmentInner::Ready(output) => Ok(output),
            AttachmentInner::Channel(rx) => rx.await.map_err(|_| {
                DobiError::Other(anyhow::anyhow!("attach stream closed without a result"))
            })?,
        }
    }
}

/// Desired state of a swarm service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub ports: Vec<String>,
    /// `host:container:mode` bind specs.
    pub binds: Vec<String>,
    pub replicas: u64,
}

/// A running swarm service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub replicas: u64,
}

/// Operations the task drivers need from a container engine.
///
/// Methods returning `Result` fail with [`DobiError::Engine`] naming the
/// operation and its subject.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn build_image(&self, opts: &BuildOptions) -> Result<()>;

    /// `Ok(None)` when the image does not exist locally.
    async fn inspect_image(&self, name: &str) -> Result<Option<ImageInfo>>;

    async fn pull_image(
        &self,
        repo: &str,
        tag: &str,
        auth: Option<&AuthConfig>,
        quiet: bool,
    ) -> Result<()>;

    async fn push_image(&self, name: &str, auth: Option<&AuthConfig>, quiet: bool) -> Result<()>;

    /// Tag `source` as `repo:tag`, replacing an existing tag.
    async fn tag_image(&self, source: &str, repo: &str, tag: &str) -> Result<()>;

    async fn remove_image(&self, name: &str) -> Result<()>;

    /// Create a container and return its ID.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Attach to a created container's streams without blocking; output
    /// starts flowing once the container is started.
    async fn attach_container(&self, id: &str, opts: AttachOptions) -> Result<Attachment>;

    async fn start_container(&self, id: &str) -> Result<()>;

    /// Block until the container exits and return its exit code.
    async fn wait_container(&self, id: &str) -> Result<i64>;

    /// Send a signal (e.g. `SIGINT`) to the container's main process.
    async fn kill_container(&self, id: &str, signal: &str) -> Result<()>;

    async fn remove_container(&self, id: &str, force: bool, remove_volumes: bool) -> Result<()>;

    async fn list_services(&self) -> Result<Vec<ServiceInfo>>;

    async fn create_service(&self, spec: &ServiceSpec) -> Result<()>;

    async fn update_service(&self, spec: &ServiceSpec) -> Result<()>;

    async fn remove_service(&self, name: &str) -> Result<()>;
}
