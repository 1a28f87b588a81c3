// src/tasks/image/mod.rs

//! Drivers for `image` resources: build, pull, push, tag and rm.

use crate::config::ImageConfig;
use crate::dag::TaskName;
use crate::exec::task::format_name;

mod build;
mod pull;
mod push;
pub mod record;
mod remove;
pub mod steps;

pub use build::BuildTask;
pub use pull::PullTask;
pub use push::{PushTask, TagTask};
pub use remove::RemoveTask;

/// `[image:action name] repository`
fn repr(name: &TaskName, config: &ImageConfig) -> String {
    format!("{} {}", format_name("image", name), config.image)
}
