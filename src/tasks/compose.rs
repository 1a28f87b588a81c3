// src/tasks/compose.rs

//! `compose:up`, `compose:down` and `compose:attach`, run through the
//! `docker-compose` binary.

use async_trait::async_trait;
use tracing::info;

use crate::config::ComposeConfig;
use crate::dag::{Action, TaskName};
use crate::engine::command;
use crate::errors::{DobiError, Result};
use crate::exec::task::format_name;
use crate::exec::{ExecuteContext, Task};
use crate::tasks::signals::ForwardingGuard;

const COMPOSE: &str = "docker-compose";

/// Arguments for `action`, after the `-f … -p …` prefix.
pub fn action_args(config: &ComposeConfig, action: &Action) -> Vec<String> {
    let mut args = config.base_args();
    match action {
        Action::Up => args.extend(["up".to_string(), "-d".to_string()]),
        Action::Attach => args.extend([
            "up".to_string(),
            "-t".to_string(),
            config.stop_grace.to_string(),
        ]),
        _ => args.push("down".to_string()),
    }
    args
}

pub fn stop_args(config: &ComposeConfig) -> Vec<String> {
    let mut args = config.base_args();
    args.extend([
        "stop".to_string(),
        "-t".to_string(),
        config.stop_grace.to_string(),
    ]);
    args
}

async fn compose(repr: &str, args: &[String]) -> Result<()> {
    let code = command::status(COMPOSE, args, "run", COMPOSE).await?;
    if code != 0 {
        return Err(DobiError::engine(
            "run",
            repr,
            format!("{COMPOSE} exited with status {code}"),
        ));
    }
    Ok(())
}

pub struct ComposeTask {
    name: TaskName,
    config: ComposeConfig,
    action: Action,
}

impl ComposeTask {
    pub fn new(name: TaskName, config: ComposeConfig, action: Action) -> Self {
        Self {
            name,
            config,
            action,
        }
    }
}

#[async_trait]
impl Task for ComposeTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        format!("{} {}", format_name("compose", &self.name), self.config.files.join(", "))
    }

    async fn run(&self, _ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let args = action_args(&self.config, &self.action);

        // In the foreground the child gets terminal interrupts directly.
        let _guard = (self.action == Action::Attach).then(ForwardingGuard::acquire);
        compose(&repr, &args).await?;

        info!(task = %repr, "Done");
        Ok(true)
    }

    async fn stop(&self, _ctx: &mut ExecuteContext) -> Result<()> {
        if self.action != Action::Up {
            return Ok(());
        }
        let repr = self.repr();
        info!(task = %repr, "Stopping");
        compose(&repr, &stop_args(&self.config)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ComposeConfig {
        ComposeConfig {
            files: vec!["docker-compose.yml".to_string()],
            project: "proj-alice".to_string(),
            stop_grace: 7,
            ..Default::default()
        }
    }

    #[test]
    fn up_is_detached() {
        assert_eq!(
            action_args(&config(), &Action::Up),
            ["-f", "docker-compose.yml", "-p", "proj-alice", "up", "-d"]
        );
    }

    #[test]
    fn attach_runs_in_foreground_with_grace() {
        assert_eq!(
            action_args(&config(), &Action::Attach),
            ["-f", "docker-compose.yml", "-p", "proj-alice", "up", "-t", "7"]
        );
    }

    #[test]
    fn down_and_stop() {
        assert_eq!(
            action_args(&config(), &Action::Down),
            ["-f", "docker-compose.yml", "-p", "proj-alice", "down"]
        );
        assert_eq!(
            stop_args(&config()),
            ["-f", "docker-compose.yml", "-p", "proj-alice", "stop", "-t", "7"]
        );
    }
}
