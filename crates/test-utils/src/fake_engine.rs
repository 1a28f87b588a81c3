use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use async_trait::async_trait;
use dobi::engine::{
    AttachOptions, Attachment, AuthConfig, BuildOptions, ContainerSpec, Engine, ImageInfo,
    OutputMode, ServiceInfo, ServiceSpec,
};
use dobi::errors::{DobiError, Result};
use dobi::fs::mock::base_time;

/// One engine operation, as recorded by [`FakeEngine`]. Inspections are not
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Build { name: String },
    Pull { repo: String, tag: String, authenticated: bool },
    Push { name: String },
    Tag { source: String, repo: String, tag: String },
    RemoveImage { name: String },
    Create { name: String },
    Attach { id: String },
    Start { id: String },
    Wait { id: String },
    Kill { id: String, signal: String },
    RemoveContainer { id: String },
    CreateService { name: String, replicas: u64 },
    UpdateService { name: String, replicas: u64 },
    RemoveService { name: String },
}

type RunHook = Box<dyn Fn(&ContainerSpec) + Send + Sync>;

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    images: HashMap<String, ImageInfo>,
    /// id → spec of containers that exist.
    containers: HashMap<String, ContainerSpec>,
    created: Vec<ContainerSpec>,
    exit_codes: HashMap<String, i64>,
    stdout: HashMap<String, Vec<u8>>,
    services: HashMap<String, u64>,
    next_id: u64,
    fail_builds: bool,
}

/// In-memory [`Engine`] that records every call.
///
/// - Built and pulled images are created at [`base_time`], so any file
///   written to a `MockFileSystem` is newer than them.
/// - Containers exit with 0 unless [`FakeEngine::set_exit_code`] says
///   otherwise; capture runs return [`FakeEngine::set_stdout`] bytes.
/// - [`FakeEngine::on_run`] lets a test simulate what the container does,
///   e.g. write an artifact into the mock filesystem.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
    on_run: Arc<Mutex<Option<RunHook>>>,
}

impl std::fmt::Debug for FakeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeEngine")
            .field("calls", &self.lock().calls.len())
            .finish()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn builds(&self) -> usize {
        self.count(|c| matches!(c, Call::Build { .. }))
    }

    pub fn pulls(&self) -> usize {
        self.count(|c| matches!(c, Call::Pull { .. }))
    }

    /// Every container ever created, in order.
    pub fn created(&self) -> Vec<ContainerSpec> {
        self.lock().created.clone()
    }

    /// Containers created and not yet removed.
    pub fn live_containers(&self) -> Vec<String> {
        self.lock().containers.values().map(|s| s.name.clone()).collect()
    }

    pub fn add_image(&self, name: &str, created: SystemTime) {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("sha256:{:04}", state.next_id);
        state.images.insert(name.to_string(), ImageInfo { id, created });
    }

    pub fn has_image(&self, name: &str) -> bool {
        self.lock().images.contains_key(name)
    }

    pub fn image_id(&self, name: &str) -> Option<String> {
        self.lock().images.get(name).map(|i| i.id.clone())
    }

    pub fn set_exit_code(&self, container: &str, code: i64) {
        self.lock().exit_codes.insert(container.to_string(), code);
    }

    pub fn set_stdout(&self, container: &str, output: impl Into<Vec<u8>>) {
        self.lock().stdout.insert(container.to_string(), output.into());
    }

    pub fn add_service(&self, name: &str, replicas: u64) {
        self.lock().services.insert(name.to_string(), replicas);
    }

    pub fn service_replicas(&self, name: &str) -> Option<u64> {
        self.lock().services.get(name).copied()
    }

    pub fn fail_builds(&self) {
        self.lock().fail_builds = true;
    }

    /// Called with the container's spec when it starts.
    pub fn on_run(&self, hook: impl Fn(&ContainerSpec) + Send + Sync + 'static) {
        *self.on_run.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(hook));
    }

    fn container(&self, id: &str) -> Result<ContainerSpec> {
        self.lock()
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| DobiError::engine("find", id, "No such container"))
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn build_image(&self, opts: &BuildOptions) -> Result<()> {
        self.record(Call::Build {
            name: opts.name.clone(),
        });
        if self.lock().fail_builds {
            return Err(DobiError::engine("build", &opts.name, "build failed"));
        }
        self.add_image(&opts.name, base_time());
        Ok(())
    }

    async fn inspect_image(&self, name: &str) -> Result<Option<ImageInfo>> {
        Ok(self.lock().images.get(name).cloned())
    }

    async fn pull_image(
        &self,
        repo: &str,
        tag: &str,
        auth: Option<&AuthConfig>,
        _quiet: bool,
    ) -> Result<()> {
        self.record(Call::Pull {
            repo: repo.to_string(),
            tag: tag.to_string(),
            authenticated: auth.is_some(),
        });
        self.add_image(&format!("{repo}:{tag}"), base_time());
        Ok(())
    }

    async fn push_image(&self, name: &str, _auth: Option<&AuthConfig>, _quiet: bool) -> Result<()> {
        self.record(Call::Push {
            name: name.to_string(),
        });
        if !self.has_image(name) {
            return Err(DobiError::engine("push", name, "No such image"));
        }
        Ok(())
    }

    async fn tag_image(&self, source: &str, repo: &str, tag: &str) -> Result<()> {
        self.record(Call::Tag {
            source: source.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
        });
        let mut state = self.lock();
        let info = state
            .images
            .get(source)
            .cloned()
            .ok_or_else(|| DobiError::engine("tag", source, "No such image"))?;
        state.images.insert(format!("{repo}:{tag}"), info);
        Ok(())
    }

    async fn remove_image(&self, name: &str) -> Result<()> {
        self.record(Call::RemoveImage {
            name: name.to_string(),
        });
        match self.lock().images.remove(name) {
            Some(_) => Ok(()),
            None => Err(DobiError::engine("remove image", name, "No such image")),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record(Call::Create {
            name: spec.name.clone(),
        });
        let mut state = self.lock();
        if !state.images.contains_key(&spec.image) {
            return Err(DobiError::engine("create container", &spec.name, "No such image"));
        }
        if state.containers.values().any(|c| c.name == spec.name) {
            return Err(DobiError::engine("create container", &spec.name, "name already in use"));
        }
        state.next_id += 1;
        let id = format!("c{:04}", state.next_id);
        state.containers.insert(id.clone(), spec.clone());
        state.created.push(spec.clone());
        Ok(id)
    }

    async fn attach_container(&self, id: &str, opts: AttachOptions) -> Result<Attachment> {
        self.record(Call::Attach { id: id.to_string() });
        let spec = self.container(id)?;
        let output = match opts.output {
            OutputMode::Capture => self.lock().stdout.get(&spec.name).cloned().unwrap_or_default(),
            OutputMode::Inherit => Vec::new(),
        };
        Ok(Attachment::ready(output))
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record(Call::Start { id: id.to_string() });
        let spec = self.container(id)?;
        if let Some(hook) = self.on_run.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            hook(&spec);
        }
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        self.record(Call::Wait { id: id.to_string() });
        let spec = self.container(id)?;
        Ok(self.lock().exit_codes.get(&spec.name).copied().unwrap_or(0))
    }

    async fn kill_container(&self, id: &str, signal: &str) -> Result<()> {
        self.record(Call::Kill {
            id: id.to_string(),
            signal: signal.to_string(),
        });
        Ok(())
    }

    async fn remove_container(&self, id: &str, _force: bool, _remove_volumes: bool) -> Result<()> {
        self.record(Call::RemoveContainer { id: id.to_string() });
        let mut state = self.lock();
        let key = state
            .containers
            .iter()
            .find(|(cid, spec)| cid.as_str() == id || spec.name == id)
            .map(|(cid, _)| cid.clone());
        match key {
            Some(key) => {
                state.containers.remove(&key);
                Ok(())
            }
            None => Err(DobiError::engine("remove container", id, "No such container")),
        }
    }

    async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        Ok(self
            .lock()
            .services
            .iter()
            .map(|(name, replicas)| ServiceInfo {
                name: name.clone(),
                replicas: *replicas,
            })
            .collect())
    }

    async fn create_service(&self, spec: &ServiceSpec) -> Result<()> {
        self.record(Call::CreateService {
            name: spec.name.clone(),
            replicas: spec.replicas,
        });
        self.add_service(&spec.name, spec.replicas);
        Ok(())
    }

    async fn update_service(&self, spec: &ServiceSpec) -> Result<()> {
        self.record(Call::UpdateService {
            name: spec.name.clone(),
            replicas: spec.replicas,
        });
        self.add_service(&spec.name, spec.replicas);
        Ok(())
    }

    async fn remove_service(&self, name: &str) -> Result<()> {
        self.record(Call::RemoveService {
            name: name.to_string(),
        });
        match self.lock().services.remove(name) {
            Some(_) => Ok(()),
            None => Err(DobiError::engine("remove service", name, "No such service")),
        }
    }
}
