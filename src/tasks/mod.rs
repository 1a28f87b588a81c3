// src/tasks/mod.rs

//! Per-resource action drivers and the `(variant, action)` dispatch table.
//!
//! For every resource variant this module knows:
//! - the default action ([`default_action`]),
//! - which actions are valid ([`resolve_action`]),
//! - the dependencies of each action ([`dependencies`]),
//! - which driver runs it ([`build_task`]).

use crate::config::{Resource, ResourceKind};
use crate::dag::{Action, TaskName};
use crate::errors::{DobiError, Result};
use crate::exec::Task;

pub mod alias;
pub mod compose;
pub mod env;
pub mod image;
pub mod job;
pub mod mount;
pub mod service;
pub mod signals;

/// Action used when a task name omits one.
pub fn default_action(resource: &Resource) -> Action {
    match resource {
        Resource::Image(image) if image.pull.is_some() && !image.is_buildable() => Action::Pull,
        Resource::Image(_) => Action::Build,
        Resource::Mount(_) => Action::Create,
        Resource::Job(_) | Resource::Alias(_) | Resource::Service(_) => Action::Run,
        Resource::Compose(_) => Action::Up,
        Resource::Env(_) => Action::Set,
    }
}

/// Fill in the default action and check the action is valid for the
/// resource's variant. `compose:rm` is normalised to `compose:down`.
pub fn resolve_action(name: &TaskName, resource: &Resource) -> Result<TaskName> {
    let resolved = name.with_default(default_action(resource));
    let Some(action) = resolved.action() else {
        return Ok(resolved);
    };

    let kind = resource.kind();
    let valid = match kind {
        ResourceKind::Image => matches!(
            action,
            Action::Build | Action::Pull | Action::Push | Action::Tag | Action::Remove
        ),
        ResourceKind::Mount => matches!(action, Action::Create | Action::Remove),
        ResourceKind::Job => matches!(action, Action::Run | Action::Remove | Action::Capture(_)),
        ResourceKind::Alias | ResourceKind::Service => matches!(action, Action::Run | Action::Remove),
        ResourceKind::Compose => {
            matches!(action, Action::Up | Action::Down | Action::Attach | Action::Remove)
        }
        ResourceKind::Env => matches!(action, Action::Set | Action::Remove),
    };
    if !valid {
        return Err(DobiError::config(
            name.to_string(),
            format!(
                "invalid {kind} action {:?} for task {:?}",
                action.to_string(),
                name.resource()
            ),
        ));
    }

    if kind == ResourceKind::Compose && *action == Action::Remove {
        return Ok(TaskName::new(name.resource(), Action::Down));
    }
    Ok(resolved)
}

/// Direct dependencies of an already-resolved task.
pub fn dependencies(name: &TaskName, resource: &Resource) -> Result<Vec<TaskName>> {
    let Some(action) = name.action() else {
        return Ok(Vec::new());
    };
    let own = name.resource();

    let deps = match (resource, action) {
        (Resource::Image(image), Action::Build | Action::Pull) => parse_all(own, &image.depends)?,
        (Resource::Image(image), Action::Push) => {
            let mut deps = vec![TaskName::new(own, Action::Tag)];
            deps.extend(parse_all(own, &image.depends)?);
            deps
        }
        (Resource::Image(image), Action::Tag) => {
            let mut deps = vec![TaskName::new(own, default_action(resource))];
            deps.extend(parse_all(own, &image.depends)?);
            deps
        }
        (Resource::Job(job), Action::Run | Action::Capture(_)) => job_deps(own, job)?,
        (Resource::Service(service), Action::Run) => job_deps(own, &service.job)?,
        (Resource::Alias(alias), Action::Run) => parse_all(own, &alias.tasks)?,
        (Resource::Alias(alias), Action::Remove) => {
            let mut deps = Vec::with_capacity(alias.tasks.len());
            for raw in alias.tasks.iter().rev() {
                let task = parse(own, raw)?;
                deps.push(TaskName::new(task.resource(), Action::Remove));
            }
            deps
        }
        (Resource::Compose(compose), Action::Up | Action::Attach) => {
            parse_all(own, &compose.depends)?
        }
        (Resource::Env(env), Action::Set) => env
            .captures
            .iter()
            .map(|c| TaskName::new(&c.job, Action::Capture(c.variable.clone())))
            .collect(),
        _ => Vec::new(),
    };
    Ok(deps)
}

fn job_deps(own: &str, job: &crate::config::JobConfig) -> Result<Vec<TaskName>> {
    let mut deps = vec![parse(own, &job.use_image)?];
    deps.extend(parse_all(own, &job.mounts)?);
    deps.extend(parse_all(own, &job.depends)?);
    Ok(deps)
}

fn parse(own: &str, raw: &str) -> Result<TaskName> {
    TaskName::parse(raw).map_err(|msg| DobiError::config(own, msg))
}

fn parse_all(own: &str, raw: &[String]) -> Result<Vec<TaskName>> {
    raw.iter().map(|r| parse(own, r)).collect()
}

/// Construct the driver for a resolved task.
pub fn build_task(name: TaskName, resource: Resource) -> Result<Box<dyn Task>> {
    let action = name
        .action()
        .cloned()
        .unwrap_or_else(|| default_action(&resource));

    let task: Box<dyn Task> = match (resource, action) {
        (Resource::Image(config), Action::Build) => Box::new(image::BuildTask::new(name, config)),
        (Resource::Image(config), Action::Pull) => Box::new(image::PullTask::new(name, config)),
        (Resource::Image(config), Action::Push) => Box::new(image::PushTask::new(name, config)),
        (Resource::Image(config), Action::Tag) => Box::new(image::TagTask::new(name, config)),
        (Resource::Image(config), Action::Remove) => Box::new(image::RemoveTask::new(name, config)),
        (Resource::Mount(config), Action::Create) => Box::new(mount::CreateTask::new(name, config)),
        (Resource::Mount(config), Action::Remove) => Box::new(mount::RemoveTask::new(name, config)),
        (Resource::Job(config), Action::Run) => Box::new(job::RunTask::new(name, config)),
        (Resource::Job(config), Action::Capture(variable)) => {
            Box::new(job::CaptureTask::new(name, config, variable))
        }
        (Resource::Job(config), Action::Remove) => Box::new(job::RemoveTask::new(name, config)),
        (Resource::Alias(_), Action::Run | Action::Remove) => Box::new(alias::AliasTask::new(name)),
        (Resource::Compose(config), action @ (Action::Up | Action::Down | Action::Attach | Action::Remove)) => {
            Box::new(compose::ComposeTask::new(name, config, action))
        }
        (Resource::Env(config), Action::Set) => Box::new(env::SetTask::new(name, config)),
        (Resource::Env(_), Action::Remove) => Box::new(env::RemoveTask::new(name)),
        (Resource::Service(config), Action::Run) => Box::new(service::RunTask::new(name, config)),
        (Resource::Service(config), Action::Remove) => {
            Box::new(service::RemoveTask::new(name, config))
        }
        (resource, action) => {
            return Err(DobiError::config(
                name.to_string(),
                format!("invalid {} action {:?}", resource.kind(), action.to_string()),
            ));
        }
    };
    Ok(task)
}
