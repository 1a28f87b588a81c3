// src/tasks/image/build.rs

//! `image:build`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{record, repr, steps};
use crate::config::ImageConfig;
use crate::dag::TaskName;
use crate::engine::BuildOptions;
use crate::errors::{DobiError, Result};
use crate::exec::{ExecuteContext, Task};
use crate::fs::dockerignore::{self, Excludes};
use crate::fs::paths::abs_path;
use crate::fs::{last_modified, FileSystem};

pub struct BuildTask {
    name: TaskName,
    config: ImageConfig,
}

impl BuildTask {
    pub fn new(name: TaskName, config: ImageConfig) -> Self {
        Self { name, config }
    }

    fn context_dir(&self, work_dir: &Path) -> Result<PathBuf> {
        abs_path(work_dir, self.config.build_context())
            .map_err(|e| DobiError::Resolve(format!("{e:#}")))
    }

    /// Absolute path of the Dockerfile the engine should use, writing the
    /// synthesised one first when the image is defined by `steps`.
    fn prepare_dockerfile(&self, ctx: &ExecuteContext, context: &Path) -> Result<PathBuf> {
        if self.config.steps.is_empty() {
            return Ok(context.join(self.config.dockerfile_name()));
        }
        let path = steps::dockerfile_path(&ctx.state_dir(), self.name.resource());
        steps::write_if_changed(ctx.fs.as_ref(), &path, &self.config.steps)?;
        Ok(path)
    }

    async fn is_stale(&self, ctx: &ExecuteContext, context: &Path, dockerfile: &Path) -> bool {
        let repr = self.repr();
        let image_name = self.config.canonical_name(&ctx.env);

        let info = match ctx.engine.inspect_image(&image_name).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                debug!(task = %repr, image = %image_name, "image does not exist");
                return true;
            }
            Err(err) => {
                warn!(task = %repr, error = %DobiError::StaleCheck(err.to_string()), "treating image as stale");
                return true;
            }
        };

        let context_mtime = match context_last_modified(ctx.fs.as_ref(), context, dockerfile) {
            Ok(mtime) => mtime,
            Err(err) => {
                warn!(task = %repr, error = %DobiError::StaleCheck(format!("{err:#}")), "treating image as stale");
                return true;
            }
        };

        let path = record::record_path(ctx.work_dir(), &image_name);
        let record = match record::read(ctx.fs.as_ref(), &path) {
            Ok(record) => record,
            Err(err) => {
                warn!(task = %repr, error = %err, "ignoring unreadable image record");
                None
            }
        };

        match record {
            None => {
                warn!(task = %repr, "no image record found, comparing against image creation time");
                info.created < context_mtime
            }
            Some(record) if record.image_id != info.id => {
                debug!(task = %repr, recorded = %record.image_id, actual = %info.id, "image id changed");
                true
            }
            Some(record) => record
                .modified
                .map_or(true, |recorded| recorded < context_mtime),
        }
    }
}

/// Newest mtime across the build context and the Dockerfile. Patterns from
/// the context's `.dockerignore` and the `.dobi` state directory are
/// excluded from the walk.
fn context_last_modified(fs: &dyn FileSystem, context: &Path, dockerfile: &Path) -> anyhow::Result<SystemTime> {
    let mut patterns = dockerignore::read_all(fs, &context.join(".dockerignore"))?;
    patterns.push(".dobi".to_string());
    let excludes = Excludes::new(&patterns)?;

    let mut paths = vec![context.to_path_buf()];
    if fs.exists(dockerfile) {
        paths.push(dockerfile.to_path_buf());
    }
    last_modified(fs, context, &excludes, &paths)
}

#[async_trait]
impl Task for BuildTask {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn repr(&self) -> String {
        repr(&self.name, &self.config)
    }

    async fn run(&self, ctx: &mut ExecuteContext, deps_modified: bool) -> Result<bool> {
        let repr = self.repr();
        let context = self.context_dir(ctx.work_dir())?;
        let dockerfile = self.prepare_dockerfile(ctx, &context)?;

        if !deps_modified && !self.is_stale(ctx, &context, &dockerfile).await {
            info!(task = %repr, "is fresh");
            return Ok(false);
        }

        let image_name = self.config.canonical_name(&ctx.env);
        info!(task = %repr, "Building");
        ctx.engine
            .build_image(&BuildOptions {
                name: image_name.clone(),
                dockerfile,
                context,
                args: self.config.args.clone(),
                pull: self.config.pull_base_image_on_build,
                rm: true,
                quiet: ctx.settings.quiet,
            })
            .await?;

        let path = record::record_path(ctx.work_dir(), &image_name);
        match ctx.engine.inspect_image(&image_name).await? {
            Some(info) => {
                let last_pull = record::read(ctx.fs.as_ref(), &path)
                    .ok()
                    .flatten()
                    .and_then(|r| r.last_pull);
                let new_record = record::ImageRecord {
                    image_id: info.id,
                    last_pull,
                    modified: None,
                };
                if let Err(err) = record::write(ctx.fs.as_ref(), &path, &new_record) {
                    warn!(task = %repr, error = %err, "failed to write image record");
                }
            }
            None => warn!(task = %repr, image = %image_name, "built image not found"),
        }

        info!(task = %repr, "Created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn context_walk_skips_ignored_and_state_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/Dockerfile", "FROM alpine");
        fs.add_file("/work/main.go", "package main");
        let source_mtime = fs.modified(Path::new("/work/main.go")).unwrap();
        fs.add_file("/work/.dockerignore", "dist\n");
        fs.set_modified("/work/.dockerignore", source_mtime);
        fs.add_file("/work/dist/out", "binary");
        fs.add_file("/work/.dobi/images/app:v1", "image-id: x");

        let mtime =
            context_last_modified(&fs, Path::new("/work"), Path::new("/work/Dockerfile")).unwrap();
        assert_eq!(mtime, source_mtime);
    }

    #[test]
    fn synthesised_dockerfile_counts_even_under_state_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/main.go", "package main");
        fs.add_file("/work/.dobi/Dockerfile.app", "FROM alpine");
        let dockerfile_mtime = fs.modified(Path::new("/work/.dobi/Dockerfile.app")).unwrap();

        let mtime = context_last_modified(
            &fs,
            Path::new("/work"),
            Path::new("/work/.dobi/Dockerfile.app"),
        )
        .unwrap();
        assert_eq!(mtime, dockerfile_mtime);
    }
}
