// src/tasks/image/push.rs

//! `image:tag` and `image:push`.

use async_trait::async_trait;
use tracing::{debug, info};

use super::repr;
use crate::config::ImageConfig;
use crate::dag::TaskName;
use crate::engine::auth::split_repo_tag;
use crate::errors::Result;
use crate::exec::{ExecuteContext, Task};

/// Applies every configured tag to the canonical image.
pub struct TagTask {
    name: TaskName,
    config: ImageConfig,
}

impl TagTask {
    pub fn new(name: TaskName, config: ImageConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for TagTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let canonical = self.config.canonical_name(&ctx.env);
        let mut tagged = false;

        for image in self.config.all_names(&ctx.env) {
            if image == canonical {
                continue;
            }
            let (repo, tag) = split_repo_tag(&image);
            debug!(task = %repr, source = %canonical, target = %image, "tagging");
            ctx.engine.tag_image(&canonical, repo, tag).await?;
            tagged = true;
        }

        info!(task = %repr, "Tagged");
        Ok(tagged)
    }
}

pub struct PushTask {
    name: TaskName,
    config: ImageConfig,
}

impl PushTask {
    pub fn new(name: TaskName, config: ImageConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for PushTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        for image in self.config.all_names(&ctx.env) {
            let auth = ctx.auth().for_image(&image);
            debug!(task = %repr, image = %image, authenticated = auth.is_some(), "pushing");
            ctx.engine.push_image(&image, auth, ctx.settings.quiet).await?;
        }
        info!(task = %repr, "Pushed");
        Ok(true)
    }
}
