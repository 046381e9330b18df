//! Parlor CLI library.
//!
//! This crate provides the CLI interface for the parlor session tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, EmployeeAction, GroupByArg, MachineAction, SessionAction, StatusArg};
pub use config::Config;
