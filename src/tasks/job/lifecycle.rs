// src/tasks/job/lifecycle.rs

//! One container run: create, attach, start, wait, remove.
//!
//! The container is always removed once it has been created, whether the
//! run succeeds, fails or is abandoned mid-way.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::terminal::RawModeGuard;
use crate::engine::{AttachOptions, ContainerSpec, Engine, OutputMode};
use crate::errors::{DobiError, Result};
use crate::tasks::signals::SignalForwarder;

/// Run `spec` to completion and return what the attachment collected
/// (stdout when `output` is [`OutputMode::Capture`], otherwise empty).
pub(super) async fn run_container(
    engine: &Arc<dyn Engine>,
    repr: &str,
    spec: &ContainerSpec,
    output: OutputMode,
) -> Result<Vec<u8>> {
    let id = engine.create_container(spec).await?;
    debug!(task = %repr, container = %spec.name, id = %id, "container created");

    let cleanup = RemoveOnDrop {
        engine: engine.clone(),
        id: Some(id.clone()),
    };
    let result = attach_and_wait(engine, repr, spec, &id, output).await;
    cleanup.remove(repr).await;

    let (code, collected) = result?;
    if code != 0 {
        return Err(DobiError::JobExitedNonZero {
            container: spec.name.clone(),
            code,
        });
    }
    Ok(collected)
}

async fn attach_and_wait(
    engine: &Arc<dyn Engine>,
    repr: &str,
    spec: &ContainerSpec,
    id: &str,
    output: OutputMode,
) -> Result<(i64, Vec<u8>)> {
    let _forwarder = SignalForwarder::spawn(engine.clone(), id.to_string());
    let _raw_mode = spec.tty.then(RawModeGuard::enable);

    let attachment = engine
        .attach_container(
            id,
            AttachOptions {
                stdin: spec.open_stdin,
                tty: spec.tty,
                output,
            },
        )
        .await?;
    engine.start_container(id).await?;
    debug!(task = %repr, id = %id, "container started");

    let code = engine.wait_container(id).await?;
    let collected = attachment.wait().await?;
    debug!(task = %repr, id = %id, code, "container exited");
    Ok((code, collected))
}

/// Removes the container on drop unless [`RemoveOnDrop::remove`] already
/// did. The drop path only runs when the task is cancelled or panics, and
/// hands the removal to the runtime.
struct RemoveOnDrop {
    engine: Arc<dyn Engine>,
    id: Option<String>,
}

impl RemoveOnDrop {
    async fn remove(mut self, repr: &str) {
        if let Some(id) = self.id.take() {
            match self.engine.remove_container(&id, true, true).await {
                Ok(()) => debug!(task = %repr, id = %id, "container removed"),
                Err(err) => warn!(task = %repr, id = %id, error = %err, "failed to remove container"),
            }
        }
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(id = %id, "no runtime to remove container");
            return;
        };
        let engine = self.engine.clone();
        handle.spawn(async move {
            if let Err(err) = engine.remove_container(&id, true, true).await {
                warn!(id = %id, error = %err, "failed to remove container");
            }
        });
    }
}
