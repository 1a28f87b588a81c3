// src/tasks/job/freshness.rs

//! Whether a job's artifact is out of date.

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::config::{ImageConfig, JobConfig, MountConfig};
use crate::errors::{DobiError, Result};
use crate::exec::ExecuteContext;
use crate::fs::dockerignore::Excludes;
use crate::fs::last_modified;

/// A job is stale when any of these hold:
/// - a dependency was modified earlier in this run,
/// - it has no artifact,
/// - the artifact is missing or older than its inputs (`sources` when set,
///   otherwise the host side of its mounts),
/// - `sources` is set but matches no files,
/// - the artifact is older than the image the job runs in.
///
/// Failures while checking are logged and count as stale.
pub(super) async fn is_stale(
    ctx: &ExecuteContext,
    repr: &str,
    config: &JobConfig,
    image: &ImageConfig,
    mounts: &[MountConfig],
    deps_modified: bool,
) -> bool {
    if deps_modified {
        debug!(task = %repr, "dependencies modified");
        return true;
    }
    if config.artifact.is_empty() {
        debug!(task = %repr, "no artifact");
        return true;
    }

    let artifact_mtime = match artifact_last_modified(ctx, config) {
        Ok(Some(mtime)) => mtime,
        Ok(None) => {
            debug!(task = %repr, "artifact does not exist");
            return true;
        }
        Err(err) => {
            warn!(task = %repr, error = %err, "failed to read artifact mtime");
            return true;
        }
    };

    match inputs_last_modified(ctx, config, mounts) {
        Ok(Inputs::Newest(inputs)) if artifact_mtime < inputs => {
            debug!(task = %repr, "artifact is older than its sources");
            return true;
        }
        Ok(Inputs::NoSourcesMatched) => {
            warn!(task = %repr, sources = ?config.sources, "No sources found matching");
            return true;
        }
        Ok(_) => {}
        Err(err) => {
            warn!(task = %repr, error = %err, "failed to read source mtime");
            return true;
        }
    }

    let image_name = image.canonical_name(&ctx.env);
    match ctx.engine.inspect_image(&image_name).await {
        Ok(Some(info)) if artifact_mtime < info.created => {
            debug!(task = %repr, image = %image_name, "image is newer than artifact");
            true
        }
        Ok(Some(_)) => false,
        Ok(None) => {
            debug!(task = %repr, image = %image_name, "image does not exist");
            true
        }
        Err(err) => {
            warn!(task = %repr, error = %DobiError::StaleCheck(err.to_string()), "failed to inspect image");
            true
        }
    }
}

/// Newest mtime across every artifact path, or `None` when nothing matches.
fn artifact_last_modified(ctx: &ExecuteContext, config: &JobConfig) -> Result<Option<SystemTime>> {
    let paths = config
        .artifact
        .paths(ctx.fs.as_ref(), ctx.work_dir())
        .map_err(|e| DobiError::StaleCheck(format!("{e:#}")))?;
    newest(ctx, &paths)
}

enum Inputs {
    Newest(SystemTime),
    Empty,
    NoSourcesMatched,
}

fn inputs_last_modified(
    ctx: &ExecuteContext,
    config: &JobConfig,
    mounts: &[MountConfig],
) -> Result<Inputs> {
    let paths = if config.sources.is_empty() {
        mounts
            .iter()
            .map(|m| m.host_path(ctx.work_dir()))
            .collect::<Result<Vec<_>>>()?
    } else {
        let paths = config
            .sources
            .paths(ctx.fs.as_ref(), ctx.work_dir())
            .map_err(|e| DobiError::StaleCheck(format!("{e:#}")))?;
        if paths.is_empty() {
            return Ok(Inputs::NoSourcesMatched);
        }
        paths
    };
    Ok(match newest(ctx, &paths)? {
        Some(mtime) => Inputs::Newest(mtime),
        None => Inputs::Empty,
    })
}

fn newest(ctx: &ExecuteContext, paths: &[PathBuf]) -> Result<Option<SystemTime>> {
    if paths.is_empty() {
        return Ok(None);
    }
    last_modified(ctx.fs.as_ref(), ctx.work_dir(), &Excludes::default(), paths)
        .map(Some)
        .map_err(|e| DobiError::StaleCheck(format!("{e:#}")))
}
