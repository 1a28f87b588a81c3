// src/engine/command.rs

//! Subprocess helpers for the command-line engine backend and for compose.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::errors::{DobiError, Result};

/// Run `program args…` and return its trimmed stdout. A non-zero exit
/// becomes [`DobiError::Engine`] carrying the trimmed stderr.
pub async fn capture(program: &str, args: &[String], op: &str, subject: &str) -> Result<String> {
    debug!(program, args = ?args, "running command");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DobiError::engine(op, subject, format!("failed to run {program}: {e}")))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        exit_message(output.status.code())
    } else {
        stderr
    };
    Err(DobiError::engine(op, subject, message))
}

/// Run `program args…` with stdout going to ours (or discarded when
/// `quiet`). stderr is inherited unless quiet, in which case it is read
/// line by line into the debug log.
pub async fn stream(
    program: &str,
    args: &[String],
    quiet: bool,
    op: &str,
    subject: &str,
) -> Result<()> {
    debug!(program, args = ?args, quiet, "running command");
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
    if quiet {
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| DobiError::engine(op, subject, format!("failed to run {program}: {e}")))?;

    // Keep the last stderr line for the error message.
    let stderr_task = child.stderr.take().map(|stderr| {
        let subject = subject.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut last = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(subject = %subject, "stderr: {}", line);
                if !line.trim().is_empty() {
                    last = line;
                }
            }
            last
        })
    });

    let status = child
        .wait()
        .await
        .map_err(|e| DobiError::engine(op, subject, format!("waiting for {program}: {e}")))?;
    let last_stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    if status.success() {
        Ok(())
    } else if last_stderr.is_empty() {
        Err(DobiError::engine(op, subject, exit_message(status.code())))
    } else {
        Err(DobiError::engine(op, subject, last_stderr))
    }
}

/// Run `program args…` with all stdio inherited and return its exit code.
pub async fn status(program: &str, args: &[String], op: &str, subject: &str) -> Result<i32> {
    debug!(program, args = ?args, "running command");
    let status = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| DobiError::engine(op, subject, format!("failed to run {program}: {e}")))?;
    Ok(status.code().unwrap_or(-1))
}

fn exit_message(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}
