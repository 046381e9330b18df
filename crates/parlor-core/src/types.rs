//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid session status value.
    #[error("invalid session status: {value}")]
    InvalidSessionStatus { value: String },

    /// Invalid machine status value.
    #[error("invalid machine status: {value}")]
    InvalidMachineStatus { value: String },
}

/// Lifecycle state of a session, derived from the presence of an end time.
///
/// `Closed` is terminal: there is no transition back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The session is in progress; no end time has been recorded.
    Open,
    /// The session has ended and its timestamps are fixed.
    Closed,
}

impl SessionStatus {
    /// String representation for database storage and CLI filters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ValidationError::InvalidSessionStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Whether a machine is accepting new sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    /// The machine is on the floor and may be played.
    Active,
    /// The machine keeps its history but accepts no new sessions.
    Retired,
}

impl MachineStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MachineStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "retired" => Ok(Self::Retired),
            _ => Err(ValidationError::InvalidMachineStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated employee identifier.
    ///
    /// Employee IDs must be non-empty strings. The ledger assigns UUIDs when
    /// creating employees; uniqueness is enforced at the database level.
    EmployeeId, "employee ID"
);

define_string_id!(
    /// A validated machine identifier.
    MachineId, "machine ID"
);

define_string_id!(
    /// A validated session identifier, assigned by the ledger at open time.
    SessionId, "session ID"
);

/// An employee who operates machines on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
}

/// A machine on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    pub status: MachineStatus,
}

/// A time-bounded record of an employee operating a machine.
///
/// Sessions reference their employee and machine by ID only; the entities are
/// owned by the entity store. An absent `ended_at` means the session is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub employee_id: EmployeeId,
    pub machine_id: MachineId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Lifecycle status, derived from the presence of an end time.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        match self.ended_at {
            Some(_) => SessionStatus::Closed,
            None => SessionStatus::Open,
        }
    }

    /// Duration in milliseconds, if the session is closed.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|ended_at| ended_at.signed_duration_since(self.started_at).num_milliseconds())
    }
}

/// Timestamp corrections to apply to an existing session.
///
/// Both fields are optional; an empty patch is a no-op. A patch may only
/// adjust timestamps within the session's current state, never the state
/// itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionPatch {
    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.started_at.is_none() && self.ended_at.is_none()
    }
}

/// Query filter for listing sessions.
///
/// All fields are conjunctive; `None` means no constraint. The start-time
/// bounds form a half-open interval `[started_after, started_before)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub employee_id: Option<EmployeeId>,
    pub machine_id: Option<MachineId>,
    pub status: Option<SessionStatus>,
}
