// src/tasks/image/steps.rs

//! Dockerfiles synthesised from inline `steps`.
//!
//! Each step is one instruction line. A few shorthand directives expand to
//! `RUN` lines:
//!
//! - `GO-GET pkg` → `RUN go get -u pkg`
//! - `GO-BIN pkg` → `RUN go get -u pkg && cp /go/bin/<name> /usr/bin/ && rm -rf /go/src/* /go/pkg/* /go/bin/*`

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::image::Step;
use crate::errors::Result;
use crate::fs::FileSystem;

/// `<state_dir>/Dockerfile.<resource>`.
pub fn dockerfile_path(state_dir: &Path, resource: &str) -> PathBuf {
    state_dir.join(format!("Dockerfile.{resource}"))
}

pub fn render(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&expand(step.0.trim()));
        out.push('\n');
    }
    out
}

fn expand(line: &str) -> String {
    let (directive, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args = args.trim();
    match directive.to_uppercase().as_str() {
        "GO-GET" => format!("RUN go get -u {args}"),
        "GO-BIN" => {
            let bin = args.rsplit('/').next().unwrap_or(args);
            format!(
                "RUN go get -u {args} && cp /go/bin/{bin} /usr/bin/ && rm -rf /go/src/* /go/pkg/* /go/bin/*"
            )
        }
        _ => line.to_string(),
    }
}

/// Write the rendered Dockerfile unless the file already holds the same
/// contents, so its mtime only moves when the steps change.
pub fn write_if_changed(fs: &dyn FileSystem, path: &Path, steps: &[Step]) -> Result<bool> {
    let contents = render(steps);
    if fs.is_file(path) {
        if let Ok(existing) = fs.read_to_string(path) {
            if existing == contents {
                return Ok(false);
            }
        }
    }
    if let Some(dir) = path.parent() {
        fs.create_dir_all(dir, 0o755)?;
    }
    fs.write(path, contents.as_bytes())?;
    debug!(path = %path.display(), "wrote Dockerfile from steps");
    Ok(true)
}
