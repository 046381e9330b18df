//! Core domain logic for the parlor session tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Session records and their lifecycle states
//! - The error taxonomy shared by the ledger and facade
//! - Daily statistics aggregation over closed sessions
//!
//! It performs no I/O; storage and transport live in the `parlor-db` and
//! `parlor-cli` crates.

pub mod config;
pub mod error;
pub mod stats;
pub mod types;

pub use config::CoreConfig;
pub use error::{DomainError, EntityKind};
pub use stats::{DailyStat, DateRange, GroupBy, compute_daily_stats, utc_window};
pub use types::{
    Employee, EmployeeId, Machine, MachineId, MachineStatus, Session, SessionFilter, SessionId,
    SessionPatch, SessionStatus, ValidationError,
};
