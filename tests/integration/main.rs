// tests/integration/main.rs

#[path = "../common/mod.rs"]
mod common;

mod drivers;
mod error_handling;
mod fs_abstraction;
mod runner;
mod signals;
