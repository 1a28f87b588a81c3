// src/config/mod.rs

//! Configuration loading and validation for dobi.
//!
//! Responsibilities:
//! - Define the resource model (`model.rs` plus one module per resource type).
//! - Load a config file from disk (`loader.rs`).
//! - Validate names and cross-resource references (`validate.rs`).

pub mod alias;
pub mod compose;
pub mod env;
pub mod image;
pub mod job;
pub mod loader;
pub mod model;
pub mod mount;
pub mod service;
pub mod types;
pub mod validate;

pub use alias::AliasConfig;
pub use compose::ComposeConfig;
pub use env::EnvConfig;
pub use image::ImageConfig;
pub use job::JobConfig;
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{Config, MetaConfig, RawConfig, Resource, ResourceKind};
pub use mount::MountConfig;
pub use service::ServiceConfig;
