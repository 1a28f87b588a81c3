// tests/property/main.rs

#[path = "../common/mod.rs"]
mod common;

mod ordering;
