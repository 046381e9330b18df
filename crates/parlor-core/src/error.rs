//! Domain error taxonomy shared by the ledger, aggregator, and facade.
//!
//! Every variant corresponds to one externally observable outcome. Errors are
//! values; the ledger returns them from its operations and the facade maps
//! them onto transport result kinds.

use std::fmt;

use thiserror::Error;

/// The kind of entity referenced by a [`DomainError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Employee,
    Machine,
    Session,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Employee => "employee",
            Self::Machine => "machine",
            Self::Session => "session",
        };
        write!(f, "{name}")
    }
}

/// Errors produced by ledger and aggregator operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity or session does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    /// The machine already has an open session.
    #[error("machine {machine_id} already has an open session")]
    MachineBusy { machine_id: String },

    /// The employee already has an open session.
    #[error("employee {employee_id} already has an open session")]
    EmployeeBusy { employee_id: String },

    /// A close was attempted on a session that is already closed.
    #[error("session {session_id} is already closed")]
    AlreadyClosed { session_id: String },

    /// Malformed timestamp ordering or an out-of-tolerance start time.
    #[error("invalid time: {message}")]
    InvalidTime { message: String },

    /// The operation would violate an invariant (overlap, state change,
    /// retired machine, closed-session deletion).
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Transient store failure (busy, locked, timed out). Callers may retry
    /// with backoff.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Unexpected storage fault. Not retriable; surfaced as an internal
    /// error.
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    /// Shorthand for a not-found error on the given entity kind.
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for an invalid-time error.
    pub fn invalid_time(message: impl Into<String>) -> Self {
        Self::InvalidTime {
            message: message.into(),
        }
    }

    /// Shorthand for a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}
