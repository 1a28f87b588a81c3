// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod execenv;
pub mod fs;
pub mod logging;
pub mod tasks;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, InitTemplate};
use crate::commands::list::ListOptions;
use crate::config::{load_and_validate, Config};
use crate::engine::DockerCli;
use crate::errors::Result;
use crate::exec::{ExecuteContext, Settings, TaskReport};
use crate::fs::RealFileSystem;
use crate::tasks::signals;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the execution context (variable resolver, docker CLI engine, real fs)
/// - the selected subcommand
/// - Ctrl-C handling outside of running jobs
pub async fn run(args: CliArgs) -> Result<()> {
    if let Command::Init {
        template: InitTemplate::Golang,
    } = &args.command
    {
        let dir = std::env::current_dir()?;
        let gopath = std::env::var("GOPATH").unwrap_or_default();
        for path in commands::init::golang(&RealFileSystem, &dir, &gopath)? {
            info!("wrote {}", path.display());
        }
        return Ok(());
    }

    let config = Arc::new(load_and_validate(&args.filename)?);
    debug!(
        project = %config.project,
        resources = config.resources.len(),
        work_dir = %config.work_dir.display(),
        "configuration loaded"
    );

    match &args.command {
        Command::List { all, tags, group } => {
            let opts = ListOptions {
                all: *all,
                tags: tags.clone(),
                group: *group,
            };
            print!("{}", commands::list::render(&config, &opts));
            Ok(())
        }
        Command::Run { tasks } => {
            let mut ctx = context(config, &args)?;
            until_interrupted(commands::run::run(&mut ctx, tasks)).await
        }
        Command::Autoclean => {
            let mut ctx = context(config, &args)?;
            until_interrupted(commands::autoclean::run(&mut ctx)).await
        }
        Command::Init { .. } => Ok(()),
    }
}

fn context(config: Arc<Config>, args: &CliArgs) -> Result<ExecuteContext> {
    let env = Arc::new(config.exec_env()?);
    let settings = Settings {
        quiet: args.quiet,
        ..Settings::default()
    };
    Ok(ExecuteContext::new(
        config,
        env,
        Arc::new(DockerCli::default()),
        Arc::new(RealFileSystem),
        settings,
    ))
}

/// Drive `work` until it finishes or Ctrl-C arrives while no child owns
/// interrupts. An interrupt abandons the run; the caller exits with 130.
async fn until_interrupted(
    work: impl std::future::Future<Output = Result<Vec<TaskReport>>>,
) -> Result<()> {
    tokio::select! {
        result = work => {
            let reports = result?;
            let modified = reports.iter().filter(|r| r.modified).count();
            debug!(tasks = reports.len(), modified, "run complete");
            Ok(())
        }
        () = unowned_interrupt() => {
            warn!("interrupted");
            Ok(())
        }
    }
}

async fn unowned_interrupt() {
    loop {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        if !signals::is_forwarding() {
            signals::set_interrupted();
            return;
        }
    }
}
