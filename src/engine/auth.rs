// src/engine/auth.rs

//! Registry credentials from the docker client configuration.
//!
//! `~/.docker/config.json` (or `$DOCKER_CONFIG/config.json`) holds an
//! `auths` map keyed by registry URL. The docker CLI backend reads that file
//! on its own; dobi loads it to pick the entry for a registry and to warn
//! when a push or pull will go out without credentials.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Registry used when an image name carries no registry host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Key under which the docker client stores Docker Hub credentials.
const DOCKER_HUB_INDEX: &str = "https://index.docker.io/v1/";

/// One entry of the `auths` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base64 `user:password`, as written by `docker login`.
    pub auth: String,
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(rename = "identitytoken")]
    pub identity_token: String,
    /// Registry URL this entry was stored under.
    #[serde(skip)]
    pub server_address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DockerConfigFile {
    auths: BTreeMap<String, AuthConfig>,
}

/// Credentials keyed by registry URL.
#[derive(Debug, Clone, Default)]
pub struct AuthStore {
    entries: BTreeMap<String, AuthConfig>,
}

impl AuthStore {
    /// Load credentials from the default docker config location. A missing
    /// or unreadable file yields an empty store and a warning.
    pub fn load(fs: &dyn FileSystem) -> Self {
        match default_config_path() {
            Some(path) => Self::load_from(fs, &path),
            None => {
                warn!("could not locate the docker client configuration; continuing without registry credentials");
                Self::default()
            }
        }
    }

    pub fn load_from(fs: &dyn FileSystem, path: &Path) -> Self {
        if !fs.exists(path) {
            warn!(path = %path.display(), "docker client configuration not found; continuing without registry credentials");
            return Self::default();
        }
        let contents = match fs.read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read docker client configuration");
                return Self::default();
            }
        };
        match Self::parse(&contents) {
            Ok(store) => {
                debug!(path = %path.display(), registries = store.entries.len(), "loaded registry credentials");
                store
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse docker client configuration");
                Self::default()
            }
        }
    }

    /// Parse the JSON contents of a docker config file.
    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        let file: DockerConfigFile = serde_yaml::from_str(contents)?;
        let entries = file
            .auths
            .into_iter()
            .map(|(server, mut auth)| {
                auth.server_address = server.clone();
                (server, auth)
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Credentials for `registry`, matching the spellings `docker login`
    /// uses for the same host.
    pub fn lookup(&self, registry: &str) -> Option<&AuthConfig> {
        let candidates: Vec<String> = if registry == DEFAULT_REGISTRY {
            vec![
                DOCKER_HUB_INDEX.to_string(),
                DEFAULT_REGISTRY.to_string(),
                "index.docker.io".to_string(),
            ]
        } else {
            vec![
                registry.to_string(),
                format!("https://{registry}"),
                format!("https://{registry}/v1/"),
                format!("http://{registry}"),
            ]
        };
        candidates.iter().find_map(|key| self.entries.get(key))
    }

    /// Credentials for the registry an image reference points at.
    pub fn for_image(&self, image: &str) -> Option<&AuthConfig> {
        self.lookup(registry_of(image))
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCKER_CONFIG") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join("config.json"));
        }
    }
    std::env::var("HOME")
        .ok()
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".docker").join("config.json"))
}

/// Registry host of an image reference: the part before the first `/`
/// when it looks like a host (contains `.` or `:`, or is `localhost`),
/// otherwise Docker Hub.
pub fn registry_of(image: &str) -> &str {
    match image.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => {
            first
        }
        _ => DEFAULT_REGISTRY,
    }
}

/// Split `repo[:tag]` into repository and tag. A `:` inside the registry
/// host (a port) is not a tag separator.
pub fn split_repo_tag(image: &str) -> (&str, &str) {
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], &image[name_start + i + 1..]),
        None => (image, "latest"),
    }
}
