// src/errors.rs

//! Crate-wide error type and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DobiError {
    /// Load, parse or validation failure. `path` is the dotted path to the
    /// offending key (e.g. `compile.use`).
    #[error("Error at {path}: {message}")]
    Config { path: String, message: String },

    #[error("{0}")]
    Resolve(String),

    #[error("Invalid dependency cycle: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("resource {0:?} does not exist")]
    MissingResource(String),

    #[error("failed to {op} {subject}: {message}")]
    Engine {
        op: String,
        subject: String,
        message: String,
    },

    #[error("container {container} exited with non-zero status code {code}")]
    JobExitedNonZero { container: String, code: i64 },

    #[error("failed to check freshness: {0}")]
    StaleCheck(String),

    #[error("image record {path:?}: {message}")]
    Record { path: PathBuf, message: String },

    #[error("failed to execute task {task:?}: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<DobiError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DobiError {
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        DobiError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn engine(
        op: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DobiError::Engine {
            op: op.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error: `1` for user/config mistakes, `2`
    /// for failures while running tasks.
    pub fn exit_code(&self) -> i32 {
        match self {
            DobiError::Config { .. }
            | DobiError::Resolve(_)
            | DobiError::CyclicDependency(_)
            | DobiError::MissingResource(_)
            | DobiError::Yaml(_)
            | DobiError::Toml(_) => 1,
            DobiError::TaskFailed { source, .. } => source.exit_code(),
            _ => 2,
        }
    }

    /// Innermost error, skipping `TaskFailed` wrappers.
    pub fn root(&self) -> &DobiError {
        match self {
            DobiError::TaskFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DobiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_renders_path() {
        let err = DobiError::config("compile.use", "builder is not an image resource");
        assert_eq!(
            err.to_string(),
            "Error at compile.use: builder is not an image resource"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn task_failure_keeps_inner_exit_code() {
        let inner = DobiError::JobExitedNonZero {
            container: "proj-bob-compile".to_string(),
            code: 7,
        };
        let err = DobiError::TaskFailed {
            task: "compile:run".to_string(),
            source: Box::new(inner),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(matches!(
            err.root(),
            DobiError::JobExitedNonZero { code: 7, .. }
        ));
        assert_eq!(
            err.to_string(),
            "failed to execute task \"compile:run\": container proj-bob-compile exited with non-zero status code 7"
        );
    }

    #[test]
    fn cycle_lists_stack() {
        let err = DobiError::CyclicDependency(vec![
            "a:run".to_string(),
            "b:run".to_string(),
            "c:run".to_string(),
        ]);
        assert_eq!(err.to_string(), "Invalid dependency cycle: a:run, b:run, c:run");
    }
}
