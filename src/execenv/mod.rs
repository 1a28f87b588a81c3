// src/execenv/mod.rs

//! Variable resolution for resource fields.
//!
//! Templates contain `{token}` placeholders. A token is
//! `NAMESPACE.KEY[:DEFAULT]` or `BAREKEY[:DEFAULT]`:
//!
//! - `env.KEY`: process environment
//! - `git.branch`, `git.sha`, `git.short-sha`
//! - `time.PATTERN`: start time of this run, e.g. `time.YYYY-MM-DD`
//! - `fs.cwd`, `fs.projectdir`
//! - `user.name`, `user.uid`, `user.gid`, `user.group`, `user.home`
//! - bare `unique`, `project`, `exec-id`
//!
//! Whole templates are memoised for the lifetime of the [`ExecEnv`]. Token
//! values are memoised too, except `env.*`: a template seen for the first
//! time reads the environment as it is then, so a value exported earlier in
//! the run by a capture or an env resource is picked up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::errors::{DobiError, Result};

pub mod git;
pub mod timefmt;
pub mod user;

/// Environment variable that overrides the exec-id.
pub const EXEC_ID_ENV: &str = "DOBI_EXEC_ID";

/// Resolver for `{…}` templates.
#[derive(Debug)]
pub struct ExecEnv {
    project: String,
    exec_id: Option<String>,
    work_dir: PathBuf,
    start_time: DateTime<Local>,
    templates: Mutex<HashMap<String, String>>,
    tokens: Mutex<HashMap<String, String>>,
}

impl ExecEnv {
    /// Build a resolver, deriving the exec-id from `DOBI_EXEC_ID`, then the
    /// `meta.exec-id` template, then the login name.
    pub fn new(project: &str, work_dir: &Path, exec_id_template: Option<&str>) -> Result<Self> {
        let mut env = Self::without_exec_id(project, work_dir);
        let exec_id = derive_exec_id(&env, exec_id_template)?;
        debug!(project, exec_id = %exec_id, "execution environment ready");
        env.exec_id = Some(exec_id);
        Ok(env)
    }

    /// Build a resolver with a fixed exec-id.
    pub fn with_exec_id(project: &str, exec_id: &str, work_dir: &Path) -> Self {
        let mut env = Self::without_exec_id(project, work_dir);
        env.exec_id = Some(exec_id.to_string());
        env
    }

    fn without_exec_id(project: &str, work_dir: &Path) -> Self {
        Self {
            project: project.to_string(),
            exec_id: None,
            work_dir: work_dir.to_path_buf(),
            start_time: Local::now(),
            templates: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn exec_id(&self) -> &str {
        self.exec_id.as_deref().unwrap_or_default()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `{project}-{exec_id}`, used to scope container names and default tags.
    pub fn unique(&self) -> String {
        format!("{}-{}", self.project, self.exec_id())
    }

    /// Expand every `{token}` in `template`.
    pub fn resolve(&self, template: &str) -> Result<String> {
        if !template.contains('{') {
            return Ok(template.to_string());
        }
        if let Some(hit) = lock(&self.templates).get(template) {
            return Ok(hit.clone());
        }

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                DobiError::Resolve(format!("missing closing '}}' in template {template:?}"))
            })?;
            let token = &after[..close];
            out.push_str(&self.resolve_token(token)?);
            rest = &after[close + 1..];
        }
        out.push_str(rest);

        lock(&self.templates).insert(template.to_string(), out.clone());
        Ok(out)
    }

    pub fn resolve_all(&self, templates: &[String]) -> Result<Vec<String>> {
        templates.iter().map(|t| self.resolve(t)).collect()
    }

    /// Resolve an optional template, leaving `None` untouched.
    pub fn resolve_opt(&self, template: &Option<String>) -> Result<Option<String>> {
        template.as_deref().map(|t| self.resolve(t)).transpose()
    }

    fn resolve_token(&self, token: &str) -> Result<String> {
        if let Some(hit) = lock(&self.tokens).get(token) {
            return Ok(hit.clone());
        }

        let (key, default) = split_default(token);
        let value = match split_prefix(key) {
            Some((namespace, name)) => self.lookup_namespaced(key, namespace, name, default)?,
            None => self.lookup_bare(key)?,
        };
        let value = match (value.is_empty(), default) {
            (false, _) => value,
            (true, Some(default)) => default.to_string(),
            (true, None) => {
                return Err(DobiError::Resolve(format!(
                    "a value is required for variable {key:?}"
                )));
            }
        };

        if !key.starts_with("env.") {
            lock(&self.tokens).insert(token.to_string(), value.clone());
        }
        Ok(value)
    }

    fn lookup_bare(&self, key: &str) -> Result<String> {
        let exec_id = || {
            self.exec_id.clone().ok_or_else(|| {
                DobiError::Resolve(format!("variable {key:?} cannot be used to build the exec-id"))
            })
        };
        match key {
            "unique" => Ok(format!("{}-{}", self.project, exec_id()?)),
            "project" => Ok(self.project.clone()),
            "exec-id" => exec_id(),
            _ => Err(unknown(key)),
        }
    }

    fn lookup_namespaced(
        &self,
        key: &str,
        namespace: &str,
        name: &str,
        default: Option<&str>,
    ) -> Result<String> {
        match namespace {
            "env" => Ok(std::env::var(name).unwrap_or_default()),
            "git" => {
                if !git::is_known_key(name) {
                    return Err(unknown(key));
                }
                match git::lookup(&self.work_dir, name) {
                    Ok(value) => Ok(value),
                    Err(err) if default.is_some() => {
                        warn!(variable = key, error = %err, "failed to read git value, using default");
                        Ok(String::new())
                    }
                    Err(err) => Err(DobiError::Resolve(format!(
                        "failed to resolve {key:?}: {err:#}"
                    ))),
                }
            }
            "time" => Ok(timefmt::format(&self.start_time, name)),
            "fs" => match name {
                "cwd" => std::env::current_dir()
                    .map(|p| p.to_string_lossy().into_owned())
                    .map_err(|e| DobiError::Resolve(format!("failed to resolve {key:?}: {e}"))),
                "projectdir" => Ok(self.work_dir.to_string_lossy().into_owned()),
                _ => Err(unknown(key)),
            },
            "user" => {
                let user = user::current_user().map_err(|e| {
                    DobiError::Resolve(format!("failed to resolve {key:?}: {e:#}"))
                })?;
                match name {
                    "name" => Ok(user.name),
                    "uid" => Ok(user.uid.to_string()),
                    "gid" => Ok(user.gid.to_string()),
                    "group" => Ok(user.group),
                    "home" => Ok(user.home),
                    _ => Err(unknown(key)),
                }
            }
            _ => Err(unknown(key)),
        }
    }
}

fn unknown(key: &str) -> DobiError {
    DobiError::Resolve(format!("unknown variable {key:?}"))
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Split `KEY:DEFAULT` on the last `:`.
fn split_default(token: &str) -> (&str, Option<&str>) {
    match token.rfind(':') {
        Some(idx) => (&token[..idx], Some(&token[idx + 1..])),
        None => (token, None),
    }
}

/// Split `NAMESPACE.KEY` on the first `.` that is neither the first nor the
/// last character.
fn split_prefix(key: &str) -> Option<(&str, &str)> {
    match key.find('.') {
        Some(idx) if idx > 0 && idx < key.len() - 1 => Some((&key[..idx], &key[idx + 1..])),
        _ => None,
    }
}

fn derive_exec_id(env: &ExecEnv, template: Option<&str>) -> Result<String> {
    if let Ok(value) = std::env::var(EXEC_ID_ENV) {
        return validate_exec_id(&value);
    }
    if let Some(template) = template.filter(|t| !t.is_empty()) {
        let value = env.resolve(template)?;
        return validate_exec_id(&value);
    }
    Ok(user::login_name().unwrap_or_else(|| "root".to_string()))
}

fn validate_exec_id(value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DobiError::Resolve("exec-id was empty".to_string()));
    }
    if value.lines().count() > 1 {
        return Err(DobiError::Resolve(format!(
            "exec-id must be a single line, not {value:?}"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> ExecEnv {
        ExecEnv::with_exec_id("proj", "alice", Path::new("/work"))
    }

    #[test]
    fn bare_variables() {
        let env = env();
        assert_eq!(env.resolve("{unique}").unwrap(), "proj-alice");
        assert_eq!(env.resolve("{project}:{exec-id}").unwrap(), "proj:alice");
        assert_eq!(env.resolve("no templates here").unwrap(), "no templates here");
    }

    #[test]
    fn env_with_defaults() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("DOBI_TEST_EXECENV_FOO", "bar") };
        let env = env();
        let out = env
            .resolve("{env.DOBI_TEST_EXECENV_FOO}-{env.DOBI_TEST_EXECENV_MISSING:def}-{unique}")
            .unwrap();
        assert_eq!(out, "bar-def-proj-alice");

        match env.resolve("{env.DOBI_TEST_EXECENV_MISSING}") {
            Err(DobiError::Resolve(msg)) => assert!(msg.contains("a value is required")),
            other => panic!("expected resolve error, got {other:?}"),
        }
    }

    #[test]
    fn templates_are_memoised_but_env_tokens_are_reread() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("DOBI_TEST_EXECENV_MEMO", "first") };
        let env = env();
        assert_eq!(env.resolve("{env.DOBI_TEST_EXECENV_MEMO:dev}").unwrap(), "first");
        unsafe { std::env::set_var("DOBI_TEST_EXECENV_MEMO", "second") };
        assert_eq!(env.resolve("{env.DOBI_TEST_EXECENV_MEMO:dev}").unwrap(), "first");
        assert_eq!(
            env.resolve("x-{env.DOBI_TEST_EXECENV_MEMO:dev}").unwrap(),
            "x-second"
        );
    }

    #[test]
    fn time_is_stable() {
        let env = env();
        let a = env.resolve("{time.YYYYMMDDHHmmss}").unwrap();
        let b = env.resolve("{time.YYYYMMDDHHmmss}").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 14);
    }

    #[test]
    fn unknown_and_malformed() {
        let env = env();
        assert!(matches!(env.resolve("{nope}"), Err(DobiError::Resolve(_))));
        assert!(matches!(env.resolve("{bogus.key}"), Err(DobiError::Resolve(_))));
        assert!(matches!(env.resolve("{user.shoe}"), Err(DobiError::Resolve(_))));
        match env.resolve("{unique") {
            Err(DobiError::Resolve(msg)) => assert!(msg.contains("closing")),
            other => panic!("expected resolve error, got {other:?}"),
        }
    }

    #[test]
    fn key_splitting() {
        assert_eq!(split_default("env.A:b:c"), ("env.A:b", Some("c")));
        assert_eq!(split_default("unique"), ("unique", None));
        assert_eq!(split_prefix("env.A.B"), Some(("env", "A.B")));
        assert_eq!(split_prefix(".env"), None);
        assert_eq!(split_prefix("env."), None);
    }

    #[test]
    fn fs_namespace() {
        let env = env();
        assert_eq!(env.resolve("{fs.projectdir}").unwrap(), "/work");
    }

    #[test]
    fn git_falls_back_to_default_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let env = ExecEnv::with_exec_id("proj", "alice", dir.path());
        assert_eq!(env.resolve("{git.branch:none}").unwrap(), "none");
        assert!(env.resolve("{git.sha}").is_err());
    }

    #[test]
    fn exec_id_validation() {
        assert_eq!(validate_exec_id("  ci-42\n").unwrap(), "ci-42");
        assert!(validate_exec_id("   ").is_err());
        assert!(validate_exec_id("a\nb").is_err());
    }

    #[test]
    fn exec_id_template_cannot_reference_itself() {
        let env = ExecEnv::without_exec_id("proj", Path::new("/work"));
        assert!(env.resolve("{unique}").is_err());
        assert_eq!(env.resolve("{project}").unwrap(), "proj");
    }
}
