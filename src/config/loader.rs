// src/config/loader.rs

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::config::model::{Config, MetaConfig, RawConfig, Resource, ResourceKind};
use crate::errors::{DobiError, Result};

/// Load a configuration file from a given path and return the decoded
/// `RawConfig`.
///
/// This only performs deserialization; it does **not** perform semantic
/// validation (references, names, etc.). Use [`load_and_validate`] for that.
/// Files ending in `.toml` are read as TOML, everything else as YAML.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        DobiError::config(path.display().to_string(), format!("failed to read config: {e}"))
    })?;

    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let mut config = load_from_str(&contents, is_toml)?;
    config.work_dir = config_dir(path);
    debug!(path = %path.display(), resources = config.resources.len(), "loaded config");
    Ok(config)
}

/// Decode configuration text. The working directory is left empty.
pub fn load_from_str(contents: &str, is_toml: bool) -> Result<RawConfig> {
    let document: Value = if is_toml {
        toml::from_str(contents)?
    } else {
        serde_yaml::from_str(contents)?
    };

    let mapping = match document {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => return Err(DobiError::config("", "config must be a mapping of resources")),
    };

    let mut raw = RawConfig::default();
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            other => {
                return Err(DobiError::config(
                    format!("{other:?}"),
                    "resource keys must be strings",
                ));
            }
        };

        if key == "meta" {
            raw.meta = decode::<MetaConfig>(&key, value)?;
            continue;
        }

        let (kind, name) = match key.split_once('=') {
            Some((kind, name)) => {
                let kind = kind
                    .trim()
                    .parse::<ResourceKind>()
                    .map_err(|msg| DobiError::config(&key, msg))?;
                (kind, name.trim().to_string())
            }
            None => (classify_legacy(&key, &value)?, key.clone()),
        };

        let resource = decode_resource(&name, kind, value)?;
        if raw.resources.insert(name.clone(), resource).is_some() {
            return Err(DobiError::config(name, "duplicate resource name"));
        }
    }

    Ok(raw)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw = load_from_path(path)?;
    Config::try_from(raw)
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_yaml::from_value(value).map_err(|e| DobiError::config(path, e.to_string()))
}

fn decode_resource(name: &str, kind: ResourceKind, value: Value) -> Result<Resource> {
    Ok(match kind {
        ResourceKind::Image => Resource::Image(decode(name, value)?),
        ResourceKind::Mount => Resource::Mount(decode(name, value)?),
        ResourceKind::Job => Resource::Job(decode(name, value)?),
        ResourceKind::Alias => Resource::Alias(decode(name, value)?),
        ResourceKind::Compose => Resource::Compose(decode(name, value)?),
        ResourceKind::Env => Resource::Env(decode(name, value)?),
        ResourceKind::Service => Resource::Service(decode(name, value)?),
    })
}

/// Pick a resource type for an untyped `name:` entry from the fields it
/// carries.
fn classify_legacy(name: &str, value: &Value) -> Result<ResourceKind> {
    let Value::Mapping(fields) = value else {
        return Err(DobiError::config(name, "resource must be a mapping"));
    };
    let has = |field: &str| fields.contains_key(field);

    let kind = if has("replicas") {
        ResourceKind::Service
    } else if has("use") {
        ResourceKind::Job
    } else if has("bind") {
        ResourceKind::Mount
    } else if has("tasks") {
        ResourceKind::Alias
    } else if has("variables") || has("captures") {
        ResourceKind::Env
    } else if has("files") {
        ResourceKind::Compose
    } else if has("image") {
        ResourceKind::Image
    } else {
        return Err(DobiError::config(
            name,
            "unable to determine resource type; use a \"type=name\" key",
        ));
    };
    Ok(kind)
}

/// Directory containing the config file, made absolute.
fn config_dir(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let absolute = if parent.is_absolute() {
        parent
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&parent))
            .unwrap_or(parent)
    };
    crate::fs::paths::clean(&absolute)
}
