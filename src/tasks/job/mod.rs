// src/tasks/job/mod.rs

//! Drivers for `job` resources.
//!
//! - `job:run` runs the command in a fresh container when the artifact is
//!   stale,
//! - `job:capture(VAR)` runs it and exports its stdout as `VAR`,
//! - `job:rm` removes a leftover container and the artifact files.

use crate::config::JobConfig;
use crate::dag::TaskName;
use crate::exec::task::format_name;

mod container;
mod freshness;
mod lifecycle;
mod remove;
mod run;
mod terminal;

pub use container::container_spec;
pub use remove::RemoveTask;
pub use run::{CaptureTask, RunTask};

/// `[job:action name] use-image command`
fn repr(name: &TaskName, config: &JobConfig) -> String {
    let base = format!("{} {}", format_name("job", name), config.use_image);
    if config.command.is_empty() {
        base
    } else {
        format!("{base} {}", config.command)
    }
}
