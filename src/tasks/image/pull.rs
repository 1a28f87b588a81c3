// src/tasks/image/pull.rs

//! `image:pull`, gated by the resource's pull policy.

use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{record, repr};
use crate::config::types::PullPolicy;
use crate::config::ImageConfig;
use crate::dag::TaskName;
use crate::engine::auth::split_repo_tag;
use crate::errors::Result;
use crate::exec::{ExecuteContext, Task};

pub struct PullTask {
    name: TaskName,
    config: ImageConfig,
}

impl PullTask {
    pub fn new(name: TaskName, config: ImageConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Task for PullTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, _deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let canonical = self.config.canonical_name(&ctx.env);
        let path = record::record_path(ctx.work_dir(), &canonical);

        let previous = match record::read(ctx.fs.as_ref(), &path) {
            Ok(record) => record,
            Err(err) => {
                warn!(task = %repr, error = %err, "ignoring unreadable image record");
                None
            }
        };
        let now = SystemTime::now();
        let since_last_pull = previous
            .as_ref()
            .and_then(|r| r.last_pull)
            .map(|t| now.duration_since(t).unwrap_or_default());

        let policy = self.config.pull.unwrap_or(PullPolicy::Always);
        if !policy.is_due(since_last_pull) {
            info!(task = %repr, "is fresh");
            return Ok(false);
        }

        for image in self.config.all_names(&ctx.env) {
            let (repo, tag) = split_repo_tag(&image);
            let auth = ctx.auth().for_image(&image);
            debug!(task = %repr, repo, tag, authenticated = auth.is_some(), "pulling");
            ctx.engine
                .pull_image(repo, tag, auth, ctx.settings.quiet)
                .await?;
        }

        let image_id = match ctx.engine.inspect_image(&canonical).await {
            Ok(Some(info)) => info.id,
            _ => previous.map(|r| r.image_id).unwrap_or_default(),
        };
        let new_record = record::ImageRecord {
            image_id,
            last_pull: Some(now),
            modified: None,
        };
        if let Err(err) = record::write(ctx.fs.as_ref(), &path, &new_record) {
            warn!(task = %repr, error = %err, "failed to write image record");
        }

        info!(task = %repr, "Pulled");
        Ok(true)
    }
}
