//! Query facade: the single entry point transport handlers invoke.
//!
//! Translates externally-facing requests (already parsed into typed
//! parameters) into ledger and aggregator calls, and maps domain outcomes
//! onto the small fixed set of result kinds a transport layer understands.
//! Only input shape is validated here; domain rules live in the ledger and
//! aggregator.

use chrono::{DateTime, NaiveDate, Utc};
use parlor_core::{
    DailyStat, DateRange, DomainError, Employee, EmployeeId, GroupBy, Machine, MachineId,
    MachineStatus, Session, SessionFilter, SessionId, SessionPatch, ValidationError,
};
use thiserror::Error;

use crate::Ledger;

/// The fixed result kinds exposed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Referenced entity or session absent.
    NotFound,
    /// The operation would violate an invariant or arrived stale.
    Conflict,
    /// Malformed input: empty IDs, bad ordering, inverted ranges.
    BadRequest,
    /// Transient store failure; eligible for bounded retry with backoff.
    Unavailable,
    /// Unexpected backend fault.
    Internal,
}

/// A domain outcome mapped onto a stable external code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest,
            message: message.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let kind = match &err {
            DomainError::NotFound { .. } => ApiErrorKind::NotFound,
            DomainError::MachineBusy { .. }
            | DomainError::EmployeeBusy { .. }
            | DomainError::AlreadyClosed { .. }
            | DomainError::Conflict { .. } => ApiErrorKind::Conflict,
            DomainError::InvalidTime { .. } => ApiErrorKind::BadRequest,
            DomainError::Unavailable { .. } => ApiErrorKind::Unavailable,
            DomainError::Storage { .. } => ApiErrorKind::Internal,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Facade over the ledger and entity store.
pub struct Facade {
    ledger: Ledger,
}

impl Facade {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    // ---- Session lifecycle ----

    pub fn open_session(
        &mut self,
        employee_id: &str,
        machine_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Session, ApiError> {
        let employee_id = EmployeeId::new(employee_id)?;
        let machine_id = MachineId::new(machine_id)?;
        Ok(self
            .ledger
            .open_session(&employee_id, &machine_id, started_at)?)
    }

    pub fn close_session(
        &mut self,
        session_id: &str,
        ended_at: DateTime<Utc>,
    ) -> Result<Session, ApiError> {
        let session_id = SessionId::new(session_id)?;
        Ok(self.ledger.close_session(&session_id, ended_at)?)
    }

    pub fn amend_session(
        &mut self,
        session_id: &str,
        patch: SessionPatch,
    ) -> Result<Session, ApiError> {
        let session_id = SessionId::new(session_id)?;
        if patch.is_empty() {
            return Err(ApiError::bad_request("nothing to amend"));
        }
        Ok(self.ledger.update_session(&session_id, patch)?)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Session, ApiError> {
        let session_id = SessionId::new(session_id)?;
        Ok(self.ledger.get_session(&session_id)?)
    }

    pub fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, ApiError> {
        Ok(self.ledger.list_sessions(filter)?)
    }

    pub fn delete_session(&mut self, session_id: &str) -> Result<(), ApiError> {
        let session_id = SessionId::new(session_id)?;
        Ok(self.ledger.delete_session(&session_id)?)
    }

    // ---- Daily stats ----

    pub fn daily_stats(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        group_by: GroupBy,
    ) -> Result<Vec<DailyStat>, ApiError> {
        if from > to {
            return Err(ApiError::bad_request(format!(
                "range start {from} is after range end {to}"
            )));
        }
        Ok(self.ledger.daily_stats(DateRange { from, to }, group_by)?)
    }

    // ---- Entity store administration ----

    pub fn add_employee(&mut self, name: &str) -> Result<Employee, ApiError> {
        let name = non_empty_name(name)?;
        Ok(self.ledger.db.add_employee(name)?)
    }

    pub fn rename_employee(&mut self, id: &str, name: &str) -> Result<Employee, ApiError> {
        let id = EmployeeId::new(id)?;
        let name = non_empty_name(name)?;
        Ok(self.ledger.db.rename_employee(&id, name)?)
    }

    pub fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
        Ok(self.ledger.db.list_employees()?)
    }

    pub fn add_machine(&mut self, name: &str) -> Result<Machine, ApiError> {
        let name = non_empty_name(name)?;
        Ok(self.ledger.db.add_machine(name)?)
    }

    pub fn retire_machine(&mut self, id: &str) -> Result<Machine, ApiError> {
        let id = MachineId::new(id)?;
        Ok(self
            .ledger
            .db
            .set_machine_status(&id, MachineStatus::Retired)?)
    }

    pub fn restore_machine(&mut self, id: &str) -> Result<Machine, ApiError> {
        let id = MachineId::new(id)?;
        Ok(self
            .ledger
            .db
            .set_machine_status(&id, MachineStatus::Active)?)
    }

    pub fn list_machines(&self) -> Result<Vec<Machine>, ApiError> {
        Ok(self.ledger.db.list_machines()?)
    }
}

fn non_empty_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("name cannot be empty"));
    }
    Ok(trimmed)
}
