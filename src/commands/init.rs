// src/commands/init.rs

//! `dobi init golang`: starter files for a Go project.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{DobiError, Result};
use crate::fs::FileSystem;

/// Name and import path of the Go project being initialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoProject {
    pub name: String,
    pub import_path: String,
}

impl GoProject {
    /// Derive the project from its directory, which must sit under
    /// `$GOPATH/src`.
    pub fn detect(gopath: &str, dir: &Path) -> Result<Self> {
        if gopath.is_empty() {
            return Err(DobiError::config("GOPATH", "GOPATH is not set"));
        }
        let src = Path::new(gopath).join("src");
        let rel = dir.strip_prefix(&src).map_err(|_| {
            DobiError::config(
                "GOPATH",
                format!("{} is not inside {}", dir.display(), src.display()),
            )
        })?;
        let import_path = rel.to_string_lossy().replace('\\', "/");
        if import_path.is_empty() {
            return Err(DobiError::config("GOPATH", "run init from a package directory"));
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| import_path.clone());
        Ok(Self { name, import_path })
    }
}

pub fn dobi_yaml(project: &GoProject) -> String {
    format!(
        r#"meta:
  project: {name}
  default: binary

mount=source:
  bind: .
  path: /go/src/{path}

image=builder:
  image: {name}-builder
  context: .

job=binary:
  use: builder
  mounts: [source]
  artifact: dist/{name}
  command: go build -o dist/{name} .
  annotations:
    description: Build the {name} binary

job=test:
  use: builder
  mounts: [source]
  command: go test ./...
  annotations:
    description: Run the tests

alias=all:
  tasks: [test, binary]
  annotations:
    description: Test and build
"#,
        name = project.name,
        path = project.import_path,
    )
}

pub fn dockerfile(project: &GoProject) -> String {
    format!(
        "FROM golang:1.22-alpine\n\
         RUN apk add --no-cache git\n\
         WORKDIR /go/src/{}\n",
        project.import_path
    )
}

/// Write `dobi.yaml` and `Dockerfile` into `dir`. Refuses to replace an
/// existing `dobi.yaml`; an existing `Dockerfile` is left alone.
pub fn golang(fs: &dyn FileSystem, dir: &Path, gopath: &str) -> Result<Vec<PathBuf>> {
    let project = GoProject::detect(gopath, dir)?;
    let config_path = dir.join("dobi.yaml");
    if fs.exists(&config_path) {
        return Err(DobiError::config(
            "init",
            format!("{} already exists", config_path.display()),
        ));
    }

    let mut written = Vec::new();
    fs.write(&config_path, dobi_yaml(&project).as_bytes())?;
    written.push(config_path);

    let dockerfile_path = dir.join("Dockerfile");
    if fs.exists(&dockerfile_path) {
        info!(path = %dockerfile_path.display(), "keeping existing Dockerfile");
    } else {
        fs.write(&dockerfile_path, dockerfile(&project).as_bytes())?;
        written.push(dockerfile_path);
    }

    info!(project = %project.name, import_path = %project.import_path, "initialised Go project");
    Ok(written)
}
