#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dobi::config::{load_from_str, Config, RawConfig, Resource};
use dobi::engine::AuthStore;
use dobi::errors::Result;
use dobi::exec::{ExecuteContext, Settings};
use dobi::execenv::ExecEnv;
use dobi::fs::FileSystem;

use crate::fake_engine::FakeEngine;

/// Exec-id used by [`test_context`]; container names and default image
/// tags are `{project}-test-…`.
pub const TEST_EXEC_ID: &str = "test";

/// Builder for `Config` to simplify test setup.
///
/// Resources are written as YAML fragments, the way users write them:
///
/// ```ignore
/// let config = ConfigBuilder::new("/work")
///     .with_project("app")
///     .with_yaml("image=builder:\n  image: app-dev\n  context: .\n")
///     .build();
/// ```
pub struct ConfigBuilder {
    work_dir: PathBuf,
    project: Option<String>,
    default: Option<String>,
    yaml: String,
    extra: Vec<(String, Resource)>,
}

impl ConfigBuilder {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            project: None,
            default: None,
            yaml: String::new(),
            extra: Vec::new(),
        }
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.project = Some(project.to_string());
        self
    }

    pub fn with_default(mut self, task: &str) -> Self {
        self.default = Some(task.to_string());
        self
    }

    /// Append top-level YAML entries.
    pub fn with_yaml(mut self, yaml: &str) -> Self {
        self.yaml.push_str(yaml);
        if !yaml.ends_with('\n') {
            self.yaml.push('\n');
        }
        self
    }

    pub fn with_resource(mut self, name: &str, resource: Resource) -> Self {
        self.extra.push((name.to_string(), resource));
        self
    }

    pub fn raw(&self) -> Result<RawConfig> {
        let mut raw = load_from_str(&self.yaml, false)?;
        raw.work_dir = self.work_dir.clone();
        if self.project.is_some() {
            raw.meta.project = self.project.clone();
        }
        if self.default.is_some() {
            raw.meta.default = self.default.clone();
        }
        for (name, resource) in &self.extra {
            raw.resources.insert(name.clone(), resource.clone());
        }
        Ok(raw)
    }

    pub fn try_build(self) -> Result<Config> {
        Config::try_from(self.raw()?)
    }

    pub fn build(self) -> Config {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Context wired to a fake engine and the given filesystem, with a fixed
/// exec-id and an empty credential store.
pub fn test_context(config: Config, engine: &FakeEngine, fs: Arc<dyn FileSystem>) -> ExecuteContext {
    test_context_with(config, engine, fs, Settings::default())
}

pub fn test_context_with(
    config: Config,
    engine: &FakeEngine,
    fs: Arc<dyn FileSystem>,
    settings: Settings,
) -> ExecuteContext {
    let env = ExecEnv::with_exec_id(&config.project, TEST_EXEC_ID, &config.work_dir);
    let mut ctx = ExecuteContext::new(
        Arc::new(config),
        Arc::new(env),
        Arc::new(engine.clone()),
        fs,
        settings,
    );
    ctx.set_auth(AuthStore::default());
    ctx
}

/// `{project}-test-{resource}`.
pub fn container_name(project: &str, resource: &str) -> String {
    format!("{project}-{TEST_EXEC_ID}-{resource}")
}

pub fn path(work_dir: &Path, rel: &str) -> PathBuf {
    work_dir.join(rel)
}
