// src/commands/mod.rs

//! Top-level subcommands.

pub mod autoclean;
pub mod init;
pub mod list;
pub mod run;
