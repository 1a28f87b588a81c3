// src/exec/context.rs

//! State shared by the tasks of one run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::config::{Config, ImageConfig, MountConfig, Resource};
use crate::engine::{AuthStore, Engine};
use crate::errors::{DobiError, Result};
use crate::execenv::ExecEnv;
use crate::fs::FileSystem;

/// Run-wide flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Suppress engine progress output.
    pub quiet: bool,
    /// Attach mount resources to job and service containers. When false the
    /// containers get no mounts at all; nothing is copied in their place.
    /// The command line always leaves this on.
    pub bind_mount: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quiet: false,
            bind_mount: true,
        }
    }
}

/// Everything a task can see while it runs.
///
/// Tasks run one after another, so the modified set needs no locking: a
/// task sees every `set_modified` made by the tasks before it.
pub struct ExecuteContext {
    pub config: Arc<Config>,
    pub env: Arc<ExecEnv>,
    pub engine: Arc<dyn Engine>,
    pub fs: Arc<dyn FileSystem>,
    pub settings: Settings,
    modified: HashSet<String>,
    resolved: HashMap<String, Resource>,
    auth: OnceLock<AuthStore>,
}

impl ExecuteContext {
    pub fn new(
        config: Arc<Config>,
        env: Arc<ExecEnv>,
        engine: Arc<dyn Engine>,
        fs: Arc<dyn FileSystem>,
        settings: Settings,
    ) -> Self {
        Self {
            config,
            env,
            engine,
            fs,
            settings,
            modified: HashSet::new(),
            resolved: HashMap::new(),
            auth: OnceLock::new(),
        }
    }

    /// Absolute project directory.
    pub fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    /// `<work_dir>/.dobi`, where dobi keeps its own state.
    pub fn state_dir(&self) -> PathBuf {
        self.config.work_dir.join(".dobi")
    }

    pub fn set_modified(&mut self, name: &str) {
        debug!(resource = name, "marked modified");
        self.modified.insert(name.to_string());
    }

    /// Whether any of the named resources did work earlier in this run.
    pub fn is_modified<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().any(|name| self.modified.contains(name))
    }

    /// The named resource with its variables resolved. Resolution happens
    /// on first access and is cached for the rest of the run.
    pub fn resource(&mut self, name: &str) -> Result<&Resource> {
        if !self.resolved.contains_key(name) {
            let raw = self
                .config
                .get(name)
                .ok_or_else(|| DobiError::MissingResource(name.to_string()))?;
            let resolved = raw.resolve(&self.env)?;
            self.resolved.insert(name.to_string(), resolved);
        }
        self.resolved
            .get(name)
            .ok_or_else(|| DobiError::MissingResource(name.to_string()))
    }

    pub fn image(&mut self, name: &str) -> Result<ImageConfig> {
        match self.resource(name)? {
            Resource::Image(image) => Ok(image.clone()),
            _ => Err(DobiError::config(name, format!("{name} is not an image resource"))),
        }
    }

    pub fn mount(&mut self, name: &str) -> Result<MountConfig> {
        match self.resource(name)? {
            Resource::Mount(mount) => Ok(mount.clone()),
            _ => Err(DobiError::config(name, format!("{name} is not a mount resource"))),
        }
    }

    /// Registry credentials, loaded on first use.
    pub fn auth(&self) -> &AuthStore {
        self.auth.get_or_init(|| AuthStore::load(self.fs.as_ref()))
    }

    /// Replace the credential store, e.g. with one read from a test fixture.
    pub fn set_auth(&mut self, store: AuthStore) {
        self.auth = OnceLock::from(store);
    }

    /// `{project}-{exec_id}-{resource}`.
    pub fn container_name(&self, resource: &str) -> String {
        format!("{}-{}", self.env.unique(), resource)
    }
}

/// Set a variable in this process's environment so later `{env.*}`
/// lookups and child processes see it.
pub fn set_env_var(key: &str, value: &str) {
    // SAFETY: tasks run sequentially on a current-thread runtime and no
    // other thread reads or writes the environment while a task runs.
    unsafe { std::env::set_var(key, value) }
}
