// src/config/types.rs

//! Field types shared by several resources, with their own parsing rules.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// A command parsed into argv with POSIX shell word splitting.
///
/// Written in config as a string (`"go build -o 'dist/my app' ./..."`) or as
/// an explicit list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    argv: Vec<String>,
    original: String,
}

impl ShellCommand {
    pub fn parse(s: &str) -> Result<Self, String> {
        let argv = shell_words::split(s).map_err(|e| format!("invalid command {s:?}: {e}"))?;
        Ok(Self {
            argv,
            original: s.to_string(),
        })
    }

    pub fn from_argv(argv: Vec<String>) -> Self {
        let original = shell_words::join(&argv);
        Self { argv, original }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    pub fn try_map<E>(
        &self,
        mut f: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<Self, E> {
        let argv = self
            .argv
            .iter()
            .map(|a| f(a))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self::from_argv(argv))
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for ShellCommand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Line(String),
            Argv(Vec<String>),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Line(s) => ShellCommand::parse(&s).map_err(serde::de::Error::custom),
            Raw::Argv(v) => Ok(ShellCommand::from_argv(v)),
        }
    }
}

/// When to pull an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullPolicy {
    /// Pull on every run.
    #[default]
    Always,
    /// Pull only if there is no record of a previous pull.
    Once,
    /// Pull when the last pull is older than this duration.
    Every(Duration),
}

impl PullPolicy {
    /// Whether a pull is due given the age of the last recorded pull.
    pub fn is_due(&self, since_last_pull: Option<Duration>) -> bool {
        match (self, since_last_pull) {
            (PullPolicy::Always, _) => true,
            (_, None) => true,
            (PullPolicy::Once, Some(_)) => false,
            (PullPolicy::Every(ttl), Some(age)) => age > *ttl,
        }
    }
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "always" => Ok(PullPolicy::Always),
            "once" => Ok(PullPolicy::Once),
            other => humantime::parse_duration(other)
                .map(PullPolicy::Every)
                .map_err(|e| {
                    format!(
                        "invalid pull policy {other:?} (expected \"always\", \"once\" or a duration like \"24h\"): {e}"
                    )
                }),
        }
    }
}

impl<'de> Deserialize<'de> for PullPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Free-form documentation attached to a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Annotations {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A host device exposed to a job container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Device {
    pub host: String,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub permissions: String,
}

impl Device {
    /// `host:container:permissions`, defaulting the container path to the
    /// host path and permissions to `rwm`.
    pub fn mapping(&self) -> String {
        let container = if self.container.is_empty() {
            &self.host
        } else {
            &self.container
        };
        let permissions = if self.permissions.is_empty() {
            "rwm"
        } else {
            &self.permissions
        };
        format!("{}:{}:{}", self.host, container, permissions)
    }
}

/// Export a job's stdout into an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Capture {
    pub job: String,
    pub variable: String,
}

/// Unix permission bits written as octal digits (`0755`, `"0644"` or `755`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0o");
        u32::from_str_radix(digits, 8)
            .map(FileMode)
            .map_err(|_| format!("invalid file mode {s:?}"))
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }
        let s = match Raw::deserialize(deserializer)? {
            Raw::Int(n) => n.to_string(),
            Raw::Str(s) => s,
        };
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Split `K=V`, rejecting entries without `=` or with an empty key.
pub fn split_env(entry: &str) -> Option<(&str, &str)> {
    let (key, value) = entry.split_once('=')?;
    if key.trim().is_empty() {
        return None;
    }
    Some((key, value))
}
