// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `dobi`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dobi",
    version,
    about = "A build automation tool for Docker applications.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the configuration file (YAML, or TOML when it ends in `.toml`).
    #[arg(
        short = 'f',
        long,
        value_name = "PATH",
        default_value = "dobi.yaml",
        global = true
    )]
    pub filename: PathBuf,

    /// Verbose output (debug logging).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show warnings and errors; suppress engine progress.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Overrides `-v`/`-q`. If omitted, `DOBI_LOG` or a default level is used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run tasks (`RESOURCE[:ACTION]`). Runs `meta.default` when none given.
    Run {
        #[arg(value_name = "TASK")]
        tasks: Vec<String>,
    },

    /// List resources from the configuration.
    List {
        /// List every resource, including those without a description.
        #[arg(short, long)]
        all: bool,

        /// Only list resources carrying one of these tags.
        #[arg(short, long, value_delimiter = ',', value_name = "TAG")]
        tags: Vec<String>,

        /// Group resources by their annotation group.
        #[arg(short, long)]
        group: bool,
    },

    /// Run the remove action for every resource.
    Autoclean,

    /// Write a starter configuration for a project type.
    Init {
        #[command(subcommand)]
        template: InitTemplate,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum InitTemplate {
    /// A Go project built inside a golang image.
    Golang,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Effective log level from `--log-level`, then `-v`/`-q`.
    pub fn requested_log_level(&self) -> Option<LogLevel> {
        if let Some(level) = self.log_level {
            return Some(level);
        }
        if self.verbose {
            Some(LogLevel::Debug)
        } else if self.quiet {
            Some(LogLevel::Warn)
        } else {
            None
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
