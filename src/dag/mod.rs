// src/dag/mod.rs

//! Task naming and ordering.
//!
//! - [`name`]: `resource:action` parsing and equality rules.
//! - [`stack`]: LIFO stack used for cycle detection.
//! - [`graph`]: depth-first walk producing a dependencies-first task list.

pub mod graph;
pub mod name;
pub mod stack;

pub use graph::{collect, PlannedTask};
pub use name::{Action, TaskName};
pub use stack::Stack;
