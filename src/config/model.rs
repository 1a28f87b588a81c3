// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::alias::AliasConfig;
use crate::config::compose::ComposeConfig;
use crate::config::env::EnvConfig;
use crate::config::image::ImageConfig;
use crate::config::job::JobConfig;
use crate::config::mount::MountConfig;
use crate::config::service::ServiceConfig;
use crate::config::types::Annotations;
use crate::errors::Result;
use crate::execenv::ExecEnv;

/// `meta` block of the configuration file.
///
/// ```yaml
/// meta:
///   project: webapp
///   default: test
///   exec-id: "{env.CI_JOB_ID:local}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MetaConfig {
    /// Task run when `dobi run` gets no task names.
    #[serde(default)]
    pub default: Option<String>,
    /// Project name; defaults to the project directory's base name.
    #[serde(default)]
    pub project: Option<String>,
    /// Template for the exec-id.
    #[serde(default)]
    pub exec_id: Option<String>,
}

/// Resource variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Image,
    Mount,
    Job,
    Alias,
    Compose,
    Env,
    Service,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Mount => "mount",
            ResourceKind::Job => "job",
            ResourceKind::Alias => "alias",
            ResourceKind::Compose => "compose",
            ResourceKind::Env => "env",
            ResourceKind::Service => "service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(ResourceKind::Image),
            "mount" => Ok(ResourceKind::Mount),
            "job" | "run" => Ok(ResourceKind::Job),
            "alias" => Ok(ResourceKind::Alias),
            "compose" => Ok(ResourceKind::Compose),
            "env" => Ok(ResourceKind::Env),
            "service" => Ok(ResourceKind::Service),
            other => Err(format!("unknown resource type {other:?}")),
        }
    }
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Image(ImageConfig),
    Mount(MountConfig),
    Job(JobConfig),
    Alias(AliasConfig),
    Compose(ComposeConfig),
    Env(EnvConfig),
    Service(ServiceConfig),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Image(_) => ResourceKind::Image,
            Resource::Mount(_) => ResourceKind::Mount,
            Resource::Job(_) => ResourceKind::Job,
            Resource::Alias(_) => ResourceKind::Alias,
            Resource::Compose(_) => ResourceKind::Compose,
            Resource::Env(_) => ResourceKind::Env,
            Resource::Service(_) => ResourceKind::Service,
        }
    }

    pub fn annotations(&self) -> &Annotations {
        match self {
            Resource::Image(c) => &c.annotations,
            Resource::Mount(c) => &c.annotations,
            Resource::Job(c) => &c.annotations,
            Resource::Alias(c) => &c.annotations,
            Resource::Compose(c) => &c.annotations,
            Resource::Env(c) => &c.annotations,
            Resource::Service(c) => &c.job.annotations,
        }
    }

    /// Substitute `{…}` variables in every templated field.
    pub fn resolve(&self, env: &ExecEnv) -> Result<Resource> {
        Ok(match self {
            Resource::Image(c) => Resource::Image(c.resolve(env)?),
            Resource::Mount(c) => Resource::Mount(c.resolve(env)?),
            Resource::Job(c) => Resource::Job(c.resolve(env)?),
            Resource::Alias(c) => Resource::Alias(c.clone()),
            Resource::Compose(c) => Resource::Compose(c.resolve(env)?),
            Resource::Env(c) => Resource::Env(c.resolve(env)?),
            Resource::Service(c) => Resource::Service(c.resolve(env)?),
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Image(c) => c.fmt(f),
            Resource::Mount(c) => c.fmt(f),
            Resource::Job(c) => c.fmt(f),
            Resource::Alias(c) => c.fmt(f),
            Resource::Compose(c) => c.fmt(f),
            Resource::Env(c) => c.fmt(f),
            Resource::Service(c) => c.fmt(f),
        }
    }
}

/// Configuration as decoded from disk, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub meta: MetaConfig,
    pub resources: BTreeMap<String, Resource>,
    /// Directory containing the config file; relative paths resolve here.
    pub work_dir: PathBuf,
}

/// A validated configuration. Construct with `Config::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct Config {
    pub meta: MetaConfig,
    pub resources: BTreeMap<String, Resource>,
    pub work_dir: PathBuf,
    /// Project name after defaulting.
    pub project: String,
}

impl Config {
    pub(crate) fn new_unchecked(raw: RawConfig, project: String) -> Self {
        Self {
            meta: raw.meta,
            resources: raw.resources,
            work_dir: raw.work_dir,
            project,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Resource names in sorted order.
    pub fn sorted(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Build the variable resolver for a run of this configuration.
    pub fn exec_env(&self) -> Result<ExecEnv> {
        ExecEnv::new(&self.project, &self.work_dir, self.meta.exec_id.as_deref())
    }
}
