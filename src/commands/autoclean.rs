// src/commands/autoclean.rs

//! `dobi autoclean`: run `rm` for every resource except aliases.

use crate::config::{Config, Resource};
use crate::errors::Result;
use crate::exec::{ExecuteContext, TaskReport};

pub fn remove_tasks(config: &Config) -> Vec<String> {
    config
        .resources
        .iter()
        .filter(|(_, resource)| !matches!(resource, Resource::Alias(_)))
        .map(|(name, _)| format!("{name}:rm"))
        .collect()
}

pub async fn run(ctx: &mut ExecuteContext) -> Result<Vec<TaskReport>> {
    let tasks = remove_tasks(&ctx.config);
    super::run::run(ctx, &tasks).await
}
