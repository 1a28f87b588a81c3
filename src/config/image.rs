// src/config/image.rs

//! `image` resources: build or pull a container image.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::config::types::{Annotations, PullPolicy};
use crate::errors::Result;
use crate::execenv::ExecEnv;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ImageConfig {
    /// Repository name, without a tag.
    pub image: String,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(default)]
    pub pull: Option<PullPolicy>,
    /// Pull a newer base image on every build.
    #[serde(default)]
    pub pull_base_image_on_build: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    /// Inline Dockerfile instructions, used instead of `dockerfile`.
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub annotations: Annotations,
}

/// One Dockerfile instruction: either a full line (`"RUN make"`) or a
/// single-entry map keyed by directive (`{RUN: make}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step(pub String);

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Line(String),
            Keyed(BTreeMap<String, String>),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Line(line) => Ok(Step(line)),
            Raw::Keyed(map) if map.len() == 1 => {
                let (directive, args) = map.into_iter().next().unwrap_or_default();
                Ok(Step(format!("{} {}", directive.to_uppercase(), args)))
            }
            Raw::Keyed(_) => Err(serde::de::Error::custom(
                "a step map must have exactly one directive",
            )),
        }
    }
}

impl ImageConfig {
    /// Whether this image is produced by a build rather than a pull.
    pub fn is_buildable(&self) -> bool {
        self.dockerfile.is_some() || self.context.is_some() || !self.steps.is_empty()
    }

    /// Build context directory, defaulting to the working directory.
    pub fn build_context(&self) -> &str {
        self.context.as_deref().unwrap_or(".")
    }

    /// Dockerfile path relative to the build context.
    pub fn dockerfile_name(&self) -> &str {
        self.dockerfile.as_deref().unwrap_or("Dockerfile")
    }

    /// The tag used to refer to this image from jobs: the first tag, or
    /// the run's `{unique}` value.
    pub fn canonical_tag(&self, env: &ExecEnv) -> String {
        match self.tags.first() {
            Some(tag) => tag.clone(),
            None => env.unique(),
        }
    }

    /// `image:tag` for an arbitrary tag. A tag that already names a
    /// repository (`registry/repo:tag`) is returned as is.
    pub fn image_tag(&self, tag: &str) -> String {
        if is_full_reference(tag) {
            tag.to_string()
        } else {
            format!("{}:{}", self.image, tag)
        }
    }

    /// `image:canonical-tag`.
    pub fn canonical_name(&self, env: &ExecEnv) -> String {
        self.image_tag(&self.canonical_tag(env))
    }

    /// Every `image:tag` this resource names; the canonical one first.
    pub fn all_names(&self, env: &ExecEnv) -> Vec<String> {
        if self.tags.is_empty() {
            return vec![self.canonical_name(env)];
        }
        self.tags.iter().map(|t| self.image_tag(t)).collect()
    }

    pub fn resolve(&self, env: &ExecEnv) -> Result<Self> {
        let mut args = BTreeMap::new();
        for (k, v) in &self.args {
            args.insert(k.clone(), env.resolve(v)?);
        }
        Ok(Self {
            image: env.resolve(&self.image)?,
            dockerfile: env.resolve_opt(&self.dockerfile)?,
            context: env.resolve_opt(&self.context)?,
            args,
            pull: self.pull,
            pull_base_image_on_build: self.pull_base_image_on_build,
            tags: env.resolve_all(&self.tags)?,
            depends: self.depends.clone(),
            steps: self
                .steps
                .iter()
                .map(|s| env.resolve(&s.0).map(Step))
                .collect::<Result<_>>()?,
            annotations: self.annotations.clone(),
        })
    }
}

/// A tag containing `/` or `:` is a full image reference, not a bare tag.
fn is_full_reference(tag: &str) -> bool {
    tag.contains('/') || tag.contains(':')
}

impl fmt::Display for ImageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.annotations.description.is_empty() {
            return f.write_str(&self.annotations.description);
        }
        if self.is_buildable() {
            write!(f, "Build image '{}' from '{}'", self.image, self.build_context())
        } else {
            write!(f, "Pull image '{}'", self.image)
        }
    }
}
