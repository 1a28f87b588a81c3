// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`context`] holds the state shared by every task of a run: the config,
//!   the variable resolver, the engine, the filesystem and the set of
//!   resources modified so far.
//! - [`task`] defines the [`Task`] trait the per-resource drivers implement.
//! - [`runner`] walks an ordered task list and stops completed tasks when
//!   one fails.

pub mod context;
pub mod runner;
pub mod task;

pub use context::{set_env_var, ExecuteContext, Settings};
pub use runner::{run_tasks, run_tasks_with, TaskReport};
pub use task::Task;
