// src/config/service.rs

//! `service` resources: a swarm service built from job-style settings.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::config::job::JobConfig;
use crate::errors::Result;
use crate::execenv::ExecEnv;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub job: JobConfig,
    pub replicas: u64,
}

impl<'de> Deserialize<'de> for ServiceConfig {
    /// Accepts every job field plus `replicas`, rejecting anything else.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;

        let mut map = serde_yaml::Mapping::deserialize(deserializer)?;
        let replicas = match map.remove("replicas") {
            Some(value) => serde_yaml::from_value(value).map_err(D::Error::custom)?,
            None => 1,
        };
        let job = serde_yaml::from_value(serde_yaml::Value::Mapping(map))
            .map_err(D::Error::custom)?;
        Ok(ServiceConfig { job, replicas })
    }
}

impl ServiceConfig {
    pub fn resolve(&self, env: &ExecEnv) -> Result<Self> {
        Ok(Self {
            job: self.job.resolve(env)?,
            replicas: self.replicas,
        })
    }
}

impl fmt::Display for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.job.annotations.description.is_empty() {
            return f.write_str(&self.job.annotations.description);
        }
        write!(
            f,
            "Run service using the '{}' image with {} replicas",
            self.job.use_image, self.replicas
        )
    }
}
