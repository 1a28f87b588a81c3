// src/tasks/image/remove.rs

//! `image:rm`: remove every tag and forget the image record.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{record, repr};
use crate::config::ImageConfig;
use crate::dag::TaskName;
use crate::errors::Result;
use crate::exec::{ExecuteContext, Task};

pub struct RemoveTask {
    name: TaskName,
    config: ImageConfig,
}

impl RemoveTask {
    pub fn new(name: TaskName, config: ImageConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for RemoveTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        for image in self.config.all_names(&ctx.env) {
            if let Err(err) = ctx.engine.remove_image(&image).await {
                warn!(task = %repr, image = %image, error = %err, "failed to remove image");
            }
        }

        let path = record::record_path(ctx.work_dir(), &self.config.canonical_name(&ctx.env));
        if let Err(err) = record::remove(ctx.fs.as_ref(), &path) {
            warn!(task = %repr, error = %err, "failed to remove image record");
        }

        info!(task = %repr, "Removed");
        Ok(true)
    }
}
