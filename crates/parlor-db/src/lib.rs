//! Storage layer for the parlor session tracker.
//!
//! Provides the entity store (employees, machines), the session ledger, and
//! the query facade, all backed by `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. A `Database` can be moved between threads but not shared without
//! external synchronization. Concurrent writers from separate connections are
//! safe: SQLite serializes writers, every check-then-write in the ledger runs
//! inside an IMMEDIATE transaction, and the partial unique indexes on open
//! sessions enforce the overlap invariant even against out-of-band writers.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision, always UTC (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic
//! ordering matches chronological ordering.
//!
//! Sessions reference employees and machines by ID only (weak references
//! enforced by foreign keys). The open-session invariants live in two partial
//! unique indexes: at most one row per machine and per employee may have
//! `ended_at IS NULL`.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parlor_core::{
    DomainError, Employee, EmployeeId, EntityKind, Machine, MachineId, MachineStatus, Session,
};
use rusqlite::{Connection, ErrorCode, params};
use uuid::Uuid;

mod facade;
mod ledger;

pub use facade::{ApiError, ApiErrorKind, Facade};
pub use ledger::Ledger;

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open and the busy timeout is
    /// applied to every subsequent statement.
    pub fn open(path: &Path, busy_timeout: std::time::Duration) -> Result<Self, DomainError> {
        let conn = Connection::open(path).map_store_err()?;
        Self::from_connection(conn, busy_timeout)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory(busy_timeout: std::time::Duration) -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_store_err()?;
        Self::from_connection(conn, busy_timeout)
    }

    fn from_connection(
        conn: Connection,
        busy_timeout: std::time::Duration,
    ) -> Result<Self, DomainError> {
        conn.busy_timeout(busy_timeout).map_store_err()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DomainError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_store_err()?;
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS employees (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS machines (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'active',
                    created_at TEXT NOT NULL
                );

                -- Sessions table: one row per usage period.
                -- started_at/ended_at: RFC 3339 UTC text; ended_at NULL means open.
                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL,
                    machine_id TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    ended_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (employee_id) REFERENCES employees(id),
                    FOREIGN KEY (machine_id) REFERENCES machines(id)
                );

                -- The overlap invariant: at most one open session per machine
                -- and per employee at any instant.
                CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_open_machine
                    ON sessions(machine_id) WHERE ended_at IS NULL;
                CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_open_employee
                    ON sessions(employee_id) WHERE ended_at IS NULL;

                CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
                CREATE INDEX IF NOT EXISTS idx_sessions_employee ON sessions(employee_id);
                CREATE INDEX IF NOT EXISTS idx_sessions_machine ON sessions(machine_id);
                ",
            )
            .map_store_err()?;
        Ok(())
    }

    /// Creates an employee with a fresh ID.
    pub fn add_employee(&mut self, name: &str) -> Result<Employee, DomainError> {
        let id = new_id::<EmployeeId>()?;
        let created_at = format_timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO employees (id, name, created_at) VALUES (?, ?, ?)",
                params![id.as_str(), name, created_at],
            )
            .map_store_err()?;
        tracing::debug!(employee_id = %id, name, "employee created");
        Ok(Employee {
            id,
            name: name.to_string(),
        })
    }

    /// Updates an employee's display name.
    pub fn rename_employee(
        &mut self,
        id: &EmployeeId,
        name: &str,
    ) -> Result<Employee, DomainError> {
        let updated = self
            .conn
            .execute(
                "UPDATE employees SET name = ? WHERE id = ?",
                params![name, id.as_str()],
            )
            .map_store_err()?;
        if updated == 0 {
            return Err(DomainError::not_found(EntityKind::Employee, id.as_str()));
        }
        Ok(Employee {
            id: id.clone(),
            name: name.to_string(),
        })
    }

    /// Lists employees ordered by name then ID.
    pub fn list_employees(&self) -> Result<Vec<Employee>, DomainError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM employees ORDER BY name ASC, id ASC")
            .map_store_err()?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_store_err()?;
        let mut employees = Vec::new();
        for row in rows {
            let (id, name) = row.map_store_err()?;
            employees.push(Employee {
                id: stored_id(id)?,
                name,
            });
        }
        Ok(employees)
    }

    /// Creates a machine with a fresh ID in active status.
    pub fn add_machine(&mut self, name: &str) -> Result<Machine, DomainError> {
        let id = new_id::<MachineId>()?;
        let created_at = format_timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO machines (id, name, status, created_at) VALUES (?, ?, ?, ?)",
                params![
                    id.as_str(),
                    name,
                    MachineStatus::Active.as_str(),
                    created_at
                ],
            )
            .map_store_err()?;
        tracing::debug!(machine_id = %id, name, "machine created");
        Ok(Machine {
            id,
            name: name.to_string(),
            status: MachineStatus::Active,
        })
    }

    /// Sets a machine's status (retire / restore).
    pub fn set_machine_status(
        &mut self,
        id: &MachineId,
        status: MachineStatus,
    ) -> Result<Machine, DomainError> {
        let updated = self
            .conn
            .execute(
                "UPDATE machines SET status = ? WHERE id = ?",
                params![status.as_str(), id.as_str()],
            )
            .map_store_err()?;
        if updated == 0 {
            return Err(DomainError::not_found(EntityKind::Machine, id.as_str()));
        }
        let name: String = self
            .conn
            .query_row(
                "SELECT name FROM machines WHERE id = ?",
                [id.as_str()],
                |row| row.get(0),
            )
            .map_store_err()?;
        Ok(Machine {
            id: id.clone(),
            name,
            status,
        })
    }

    /// Lists machines ordered by name then ID.
    pub fn list_machines(&self) -> Result<Vec<Machine>, DomainError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, status FROM machines ORDER BY name ASC, id ASC")
            .map_store_err()?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_store_err()?;
        let mut machines = Vec::new();
        for row in rows {
            let (id, name, status) = row.map_store_err()?;
            machines.push(Machine {
                id: stored_id(id)?,
                name,
                status: status.parse().map_err(|_| DomainError::Storage {
                    message: format!("invalid machine status in store: {status}"),
                })?,
            });
        }
        Ok(machines)
    }
}

/// A session row as stored, before timestamp parsing.
#[derive(Debug)]
pub(crate) struct SessionRow {
    pub id: String,
    pub employee_id: String,
    pub machine_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
}

impl SessionRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            employee_id: row.get(1)?,
            machine_id: row.get(2)?,
            started_at: row.get(3)?,
            ended_at: row.get(4)?,
        })
    }

    pub(crate) fn into_session(self) -> Result<Session, DomainError> {
        let started_at = parse_timestamp(&self.started_at, &self.id)?;
        let ended_at = self
            .ended_at
            .as_deref()
            .map(|t| parse_timestamp(t, &self.id))
            .transpose()?;
        Ok(Session {
            id: stored_id(self.id)?,
            employee_id: stored_id(self.employee_id)?,
            machine_id: stored_id(self.machine_id)?,
            started_at,
            ended_at,
        })
    }
}

/// Generates a fresh UUID-backed ID of the given newtype.
fn new_id<T: TryFrom<String, Error = parlor_core::ValidationError>>() -> Result<T, DomainError> {
    stored_id(Uuid::new_v4().to_string())
}

/// Wraps a stored ID string in its validated newtype.
fn stored_id<T: TryFrom<String, Error = parlor_core::ValidationError>>(
    id: String,
) -> Result<T, DomainError> {
    T::try_from(id).map_err(|err| DomainError::Storage {
        message: format!("invalid id in store: {err}"),
    })
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(timestamp: &str, session_id: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| DomainError::Storage {
            message: format!("invalid timestamp for session {session_id}: {timestamp} ({err})"),
        })
}

/// Maps `rusqlite` failures onto the domain taxonomy: busy/locked/interrupted
/// become `Unavailable` (retriable), everything else `Storage`.
pub(crate) trait SqlResultExt<T> {
    fn map_store_err(self) -> Result<T, DomainError>;
}

impl<T> SqlResultExt<T> for Result<T, rusqlite::Error> {
    fn map_store_err(self) -> Result<T, DomainError> {
        self.map_err(|err| match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::OperationInterrupted
                ) =>
            {
                DomainError::Unavailable {
                    message: err.to_string(),
                }
            }
            _ => DomainError::Storage {
                message: err.to_string(),
            },
        })
    }
}
