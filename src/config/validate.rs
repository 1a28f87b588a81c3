// src/config/validate.rs

use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

use crate::config::compose::ComposeConfig;
use crate::config::env::EnvConfig;
use crate::config::image::ImageConfig;
use crate::config::job::JobConfig;
use crate::config::model::{Config, RawConfig, Resource, ResourceKind};
use crate::config::mount::MountConfig;
use crate::config::types::split_env;
use crate::dag::TaskName;
use crate::errors::{DobiError, Result};
use crate::tasks;

/// Names that collide with subcommands.
pub const RESERVED_NAMES: &[&str] = &["autoclean", "list", "init", "meta"];

const NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_-]*$";

impl TryFrom<RawConfig> for Config {
    type Error = DobiError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let project = project_name(&raw);
        Ok(Config::new_unchecked(raw, project))
    }
}

fn validate_raw_config(cfg: &RawConfig) -> Result<()> {
    validate_names(&cfg.resources)?;
    for (name, resource) in &cfg.resources {
        validate_resource(name, resource, &cfg.resources)?;
    }
    validate_meta(cfg)?;
    Ok(())
}

fn project_name(cfg: &RawConfig) -> String {
    if let Some(project) = cfg.meta.project.as_deref().filter(|p| !p.is_empty()) {
        return project.to_string();
    }
    let name = cfg
        .work_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dobi".to_string());
    warn!(
        project = %name,
        "meta.project is not set; using the directory name as the project name"
    );
    name
}

fn validate_names(resources: &BTreeMap<String, Resource>) -> Result<()> {
    let pattern = match Regex::new(NAME_PATTERN) {
        Ok(re) => re,
        Err(e) => return Err(DobiError::Other(anyhow::anyhow!("invalid name pattern: {e}"))),
    };
    for name in resources.keys() {
        if !pattern.is_match(name) {
            return Err(DobiError::config(
                name,
                format!("invalid resource name; names must match {NAME_PATTERN}"),
            ));
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(DobiError::config(name, "resource name is reserved"));
        }
    }
    Ok(())
}

fn validate_meta(cfg: &RawConfig) -> Result<()> {
    if let Some(default) = cfg.meta.default.as_deref() {
        let task = TaskName::parse(default).map_err(|msg| DobiError::config("meta.default", msg))?;
        if !cfg.resources.contains_key(task.resource()) {
            return Err(DobiError::config(
                "meta.default",
                format!("Undefined default resource: {default}"),
            ));
        }
    }
    Ok(())
}

fn validate_resource(
    name: &str,
    resource: &Resource,
    all: &BTreeMap<String, Resource>,
) -> Result<()> {
    match resource {
        Resource::Image(c) => {
            ensure_depends(name, &c.depends, all)?;
            validate_image(name, c)
        }
        Resource::Mount(c) => validate_mount(name, c),
        Resource::Job(c) => validate_job(name, c, all),
        Resource::Alias(c) => validate_alias(name, &c.tasks, all),
        Resource::Compose(c) => {
            ensure_depends(name, &c.depends, all)?;
            validate_compose(name, c)
        }
        Resource::Env(c) => validate_env(name, c, all),
        Resource::Service(c) => {
            validate_job(name, &c.job, all)?;
            if c.replicas == 0 {
                return Err(DobiError::config(
                    format!("{name}.replicas"),
                    "replicas must be at least 1",
                ));
            }
            Ok(())
        }
    }
}

/// Every name in `depends` must be a declared resource.
fn ensure_depends(name: &str, depends: &[String], all: &BTreeMap<String, Resource>) -> Result<()> {
    let mut missing = Vec::new();
    for dep in depends {
        let resource = match TaskName::parse(dep) {
            Ok(task) => task.resource().to_string(),
            Err(msg) => return Err(DobiError::config(format!("{name}.depends"), msg)),
        };
        if !all.contains_key(&resource) {
            missing.push(resource);
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DobiError::config(
            format!("{name}.depends"),
            format!("missing dependencies: {}", missing.join(", ")),
        ))
    }
}

fn ensure_kind(
    path: String,
    target: &str,
    kind: ResourceKind,
    all: &BTreeMap<String, Resource>,
) -> Result<()> {
    match all.get(target) {
        None => Err(DobiError::config(
            path,
            format!("missing dependencies: {target}"),
        )),
        Some(resource) if resource.kind() != kind => Err(DobiError::config(
            path,
            format!("{target} is not {} {kind} resource", article(kind)),
        )),
        Some(_) => Ok(()),
    }
}

fn article(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Image | ResourceKind::Alias | ResourceKind::Env => "an",
        _ => "a",
    }
}

fn validate_image(name: &str, c: &ImageConfig) -> Result<()> {
    if c.image.is_empty() {
        return Err(DobiError::config(format!("{name}.image"), "image is required"));
    }
    let repo_tail = c.image.rsplit('/').next().unwrap_or(&c.image);
    if repo_tail.contains(':') {
        return Err(DobiError::config(
            format!("{name}.image"),
            "tag must be specified in the `tags` field, not in the image name",
        ));
    }
    if !c.is_buildable() && c.pull.is_none() {
        return Err(DobiError::config(
            name,
            "one of dockerfile, context, steps, or pull is required",
        ));
    }
    if c.dockerfile.is_some() && !c.steps.is_empty() {
        return Err(DobiError::config(
            format!("{name}.steps"),
            "dockerfile and steps can not be used together",
        ));
    }
    if c.is_buildable() && c.pull.is_some() {
        return Err(DobiError::config(
            format!("{name}.pull"),
            "pull can not be used with dockerfile, context, or steps",
        ));
    }
    if let Some(first) = c.tags.first() {
        if first.contains('/') || first.contains(':') {
            return Err(DobiError::config(
                format!("{name}.tags[0]"),
                "the first tag must not include an image name",
            ));
        }
    }
    Ok(())
}

fn validate_mount(name: &str, c: &MountConfig) -> Result<()> {
    if c.bind.is_empty() {
        return Err(DobiError::config(format!("{name}.bind"), "bind is required"));
    }
    if c.path.is_empty() {
        return Err(DobiError::config(format!("{name}.path"), "path is required"));
    }
    Ok(())
}

fn validate_job(name: &str, c: &JobConfig, all: &BTreeMap<String, Resource>) -> Result<()> {
    ensure_kind(format!("{name}.use"), &c.use_image, ResourceKind::Image, all)?;
    for (i, mount) in c.mounts.iter().enumerate() {
        ensure_kind(format!("{name}.mounts[{i}]"), mount, ResourceKind::Mount, all)?;
    }
    ensure_depends(name, &c.depends, all)?;
    c.artifact
        .validate()
        .map_err(|msg| DobiError::config(format!("{name}.artifact"), msg))?;
    c.sources
        .validate()
        .map_err(|msg| DobiError::config(format!("{name}.sources"), msg))?;
    for (i, entry) in c.env.iter().enumerate() {
        if split_env(entry).is_none() {
            return Err(DobiError::config(
                format!("{name}.env[{i}]"),
                format!("invalid variable format {entry:?}, expected KEY=VALUE"),
            ));
        }
    }
    for (i, port) in c.ports.iter().enumerate() {
        if !is_port_mapping(port) {
            return Err(DobiError::config(
                format!("{name}.ports[{i}]"),
                format!("invalid port {port:?}, expected host:container[/protocol]"),
            ));
        }
    }
    for (i, device) in c.devices.iter().enumerate() {
        if device.host.is_empty() {
            return Err(DobiError::config(
                format!("{name}.devices[{i}].host"),
                "host is required",
            ));
        }
    }
    Ok(())
}

/// `host:container[/proto]`. Either side may carry variables, so only the
/// shape is checked.
fn is_port_mapping(port: &str) -> bool {
    let mapping = match port.split_once('/') {
        Some((mapping, proto)) => {
            if proto.is_empty() {
                return false;
            }
            mapping
        }
        None => port,
    };
    match mapping.rsplit_once(':') {
        Some((host, container)) => !host.is_empty() && !container.is_empty(),
        None => false,
    }
}

fn validate_alias(name: &str, task_names: &[String], all: &BTreeMap<String, Resource>) -> Result<()> {
    let mut missing = Vec::new();
    for (i, raw) in task_names.iter().enumerate() {
        let path = format!("{name}.tasks[{i}]");
        let task = TaskName::parse(raw).map_err(|msg| DobiError::config(path.clone(), msg))?;
        match all.get(task.resource()) {
            None => missing.push(task.resource().to_string()),
            Some(resource) => {
                tasks::resolve_action(&task, resource).map_err(|e| match e {
                    DobiError::Config { message, .. } => DobiError::config(path.clone(), message),
                    other => other,
                })?;
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DobiError::config(
            format!("{name}.tasks"),
            format!("missing dependencies: {}", missing.join(", ")),
        ))
    }
}

fn validate_compose(name: &str, c: &ComposeConfig) -> Result<()> {
    if c.files.is_empty() {
        return Err(DobiError::config(
            format!("{name}.files"),
            "at least one compose file is required",
        ));
    }
    if c.project.is_empty() {
        return Err(DobiError::config(format!("{name}.project"), "project is required"));
    }
    Ok(())
}

fn validate_env(name: &str, c: &EnvConfig, all: &BTreeMap<String, Resource>) -> Result<()> {
    for (i, entry) in c.variables.iter().enumerate() {
        if split_env(entry).is_none() {
            return Err(DobiError::config(
                format!("{name}.variables[{i}]"),
                format!("invalid variable format {entry:?}, expected KEY=VALUE"),
            ));
        }
    }
    for (i, capture) in c.captures.iter().enumerate() {
        ensure_kind(
            format!("{name}.captures[{i}].job"),
            &capture.job,
            ResourceKind::Job,
            all,
        )?;
        if capture.variable.is_empty() {
            return Err(DobiError::config(
                format!("{name}.captures[{i}].variable"),
                "variable is required",
            ));
        }
    }
    Ok(())
}
