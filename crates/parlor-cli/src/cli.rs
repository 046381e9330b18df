//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use parlor_core::{GroupBy, SessionStatus};

/// Parlor floor session tracker.
///
/// Tracks which employee is on which machine, enforces one open session per
/// machine and per employee, and reports daily usage statistics.
#[derive(Debug, Parser)]
#[command(name = "parlor", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage employees.
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },

    /// Manage machines.
    Machine {
        #[command(subcommand)]
        action: MachineAction,
    },

    /// Manage usage sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Daily usage statistics over closed sessions.
    Stats {
        /// First date of the range (YYYY-MM-DD, reference time zone).
        #[arg(long)]
        from: NaiveDate,

        /// Last date of the range, inclusive.
        #[arg(long)]
        to: NaiveDate,

        /// Grouping dimension.
        #[arg(long, value_enum, default_value = "employee")]
        by: GroupByArg,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Employee administration.
#[derive(Debug, Subcommand)]
pub enum EmployeeAction {
    /// Register a new employee.
    Add {
        /// Display name.
        name: String,
    },

    /// Change an employee's display name.
    Rename {
        /// Employee ID.
        id: String,
        /// New display name.
        name: String,
    },

    /// List employees.
    List {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Machine administration.
#[derive(Debug, Subcommand)]
pub enum MachineAction {
    /// Register a new machine.
    Add {
        /// Display name.
        name: String,
    },

    /// Retire a machine; it keeps its history but accepts no new sessions.
    Retire {
        /// Machine ID.
        id: String,
    },

    /// Return a retired machine to the floor.
    Restore {
        /// Machine ID.
        id: String,
    },

    /// List machines.
    List {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Session lifecycle operations.
#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Open a session for an employee on a machine.
    Open {
        /// Employee ID.
        #[arg(long)]
        employee: String,

        /// Machine ID.
        #[arg(long)]
        machine: String,

        /// Start time (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Close an open session.
    Close {
        /// Session ID.
        id: String,

        /// End time (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Correct a session's timestamps.
    Amend {
        /// Session ID.
        id: String,

        /// Corrected start time (RFC 3339).
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Corrected end time (RFC 3339); closed sessions only.
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },

    /// Show a single session.
    Show {
        /// Session ID.
        id: String,
    },

    /// List sessions.
    List {
        /// Only sessions starting at or after this time (RFC 3339).
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Only sessions starting before this time (RFC 3339).
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Filter by employee ID.
        #[arg(long)]
        employee: Option<String>,

        /// Filter by machine ID.
        #[arg(long)]
        machine: Option<String>,

        /// Filter by lifecycle status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Delete a session opened in error. Closed sessions cannot be deleted.
    Delete {
        /// Session ID.
        id: String,
    },
}

/// Grouping dimension argument for `parlor stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupByArg {
    Date,
    Employee,
    Machine,
    Both,
}

impl From<GroupByArg> for GroupBy {
    fn from(arg: GroupByArg) -> Self {
        match arg {
            GroupByArg::Date => Self::Date,
            GroupByArg::Employee => Self::Employee,
            GroupByArg::Machine => Self::Machine,
            GroupByArg::Both => Self::Both,
        }
    }
}

/// Session status argument for `parlor session list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Open,
    Closed,
}

impl From<StatusArg> for SessionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => Self::Open,
            StatusArg::Closed => Self::Closed,
        }
    }
}
