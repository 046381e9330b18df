//! CLI subcommand implementations.

pub mod employees;
pub mod machines;
pub mod sessions;
pub mod stats;
