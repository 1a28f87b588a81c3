// src/config/job.rs

//! `job` resources: a command run in a container built from an image
//! resource.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::config::types::{Annotations, Device, ShellCommand};
use crate::errors::Result;
use crate::execenv::ExecEnv;
use crate::fs::PathGlobs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JobConfig {
    /// Name of the image resource to run.
    #[serde(rename = "use")]
    pub use_image: String,
    /// Files produced by the job; when they are newer than every input the
    /// job is skipped.
    #[serde(default)]
    pub artifact: PathGlobs,
    #[serde(default)]
    pub command: ShellCommand,
    #[serde(default)]
    pub entrypoint: ShellCommand,
    /// Inputs compared against `artifact`. When unset, the bind mounts are
    /// used instead.
    #[serde(default)]
    pub sources: PathGlobs,
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub env: Vec<String>,
    /// Give the container access to the host's engine.
    #[serde(default)]
    pub provide_docker: bool,
    #[serde(default)]
    pub net_mode: String,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl JobConfig {
    pub fn resolve(&self, env: &ExecEnv) -> Result<Self> {
        let mut labels = BTreeMap::new();
        for (k, v) in &self.labels {
            labels.insert(k.clone(), env.resolve(v)?);
        }
        Ok(Self {
            artifact: self.artifact.try_map(|g| env.resolve(g))?,
            sources: self.sources.try_map(|g| env.resolve(g))?,
            command: self.command.try_map(|a| env.resolve(a))?,
            entrypoint: self.entrypoint.try_map(|a| env.resolve(a))?,
            env: env.resolve_all(&self.env)?,
            net_mode: env.resolve(&self.net_mode)?,
            working_dir: env.resolve(&self.working_dir)?,
            user: env.resolve(&self.user)?,
            ports: env.resolve_all(&self.ports)?,
            labels,
            ..self.clone()
        })
    }
}

impl fmt::Display for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotations.description.is_empty() {
            return f.write_str(&self.annotations.description);
        }
        write!(f, "Run job using the '{}' image", self.use_image)?;
        if !self.command.is_empty() {
            write!(f, " with '{}'", self.command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_kebab_case_fields() {
        let job: JobConfig = serde_yaml::from_str(
            r#"
use: builder
command: "go build -o dist/out ./..."
artifact: dist/out
mounts: [src]
provide-docker: true
working-dir: /src
"#,
        )
        .unwrap();
        assert_eq!(job.use_image, "builder");
        assert_eq!(job.command.argv(), ["go", "build", "-o", "dist/out", "./..."]);
        assert_eq!(job.artifact.globs(), ["dist/out"]);
        assert!(job.provide_docker);
        assert_eq!(job.working_dir, "/src");
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: std::result::Result<JobConfig, _> =
            serde_yaml::from_str("use: builder\ncomand: make\n");
        assert!(result.is_err());
    }

    #[test]
    fn resolves_env_and_command() {
        let env = ExecEnv::with_exec_id("proj", "alice", Path::new("/work"));
        let job = JobConfig {
            use_image: "builder".to_string(),
            command: ShellCommand::parse("echo {unique}").unwrap(),
            env: vec!["ID={exec-id}".to_string()],
            ..Default::default()
        };
        let resolved = job.resolve(&env).unwrap();
        assert_eq!(resolved.command.argv(), ["echo", "proj-alice"]);
        assert_eq!(resolved.env, vec!["ID=alice"]);
    }
}
