//! The session ledger: lifecycle mutations and queries over sessions.
//!
//! Every mutation runs its check-then-write sequence inside one IMMEDIATE
//! transaction, so two concurrent opens cannot both observe a free slot. The
//! partial unique indexes on open sessions are the authoritative backstop:
//! even a writer that skipped the checks would fail the insert, and that
//! failure is mapped back onto `MachineBusy` / `EmployeeBusy`.

use std::path::Path;

use chrono::{DateTime, Utc};
use parlor_core::{
    CoreConfig, DailyStat, DateRange, DomainError, EmployeeId, EntityKind, GroupBy, MachineId,
    MachineStatus, Session, SessionFilter, SessionId, SessionPatch, SessionStatus,
    compute_daily_stats, utc_window,
};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, TransactionBehavior, params, params_from_iter,
};

use crate::{Database, SessionRow, SqlResultExt, format_timestamp, new_id};

const SESSION_COLUMNS: &str = "id, employee_id, machine_id, started_at, ended_at";

/// Owns the database and the explicit core configuration.
///
/// Holds no session data in memory between calls; the store is the single
/// source of truth.
pub struct Ledger {
    pub(crate) db: Database,
    config: CoreConfig,
}

impl Ledger {
    /// Opens a ledger over a file-backed database.
    pub fn open(path: &Path, config: CoreConfig) -> Result<Self, DomainError> {
        let db = Database::open(path, config.store_timeout)?;
        Ok(Self { db, config })
    }

    /// Opens a ledger over an in-memory database, for tests.
    pub fn open_in_memory(config: CoreConfig) -> Result<Self, DomainError> {
        let db = Database::open_in_memory(config.store_timeout)?;
        Ok(Self { db, config })
    }

    /// Wraps an already-open database.
    pub fn new(db: Database, config: CoreConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Opens a new session for an employee on a machine.
    ///
    /// Fails with `NotFound` if either entity is absent, `Conflict` if the
    /// machine is retired, `MachineBusy` / `EmployeeBusy` if an open session
    /// already holds the slot, and `InvalidTime` if `started_at` lies beyond
    /// the configured future skew tolerance.
    pub fn open_session(
        &mut self,
        employee_id: &EmployeeId,
        machine_id: &MachineId,
        started_at: DateTime<Utc>,
    ) -> Result<Session, DomainError> {
        self.open_session_at(employee_id, machine_id, started_at, Utc::now())
    }

    fn open_session_at(
        &mut self,
        employee_id: &EmployeeId,
        machine_id: &MachineId,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Session, DomainError> {
        if started_at > now + self.config.future_skew {
            return Err(DomainError::invalid_time(format!(
                "start time {started_at} is too far in the future"
            )));
        }

        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_store_err()?;

        if !employee_exists(&tx, employee_id)? {
            return Err(DomainError::not_found(
                EntityKind::Employee,
                employee_id.as_str(),
            ));
        }
        match machine_status(&tx, machine_id)? {
            None => {
                return Err(DomainError::not_found(
                    EntityKind::Machine,
                    machine_id.as_str(),
                ));
            }
            Some(MachineStatus::Retired) => {
                return Err(DomainError::conflict(format!(
                    "machine {machine_id} is retired"
                )));
            }
            Some(MachineStatus::Active) => {}
        }
        if has_open_session(&tx, "machine_id", machine_id.as_str())? {
            return Err(DomainError::MachineBusy {
                machine_id: machine_id.to_string(),
            });
        }
        if has_open_session(&tx, "employee_id", employee_id.as_str())? {
            return Err(DomainError::EmployeeBusy {
                employee_id: employee_id.to_string(),
            });
        }

        let id = new_id::<SessionId>()?;
        let recorded_at = format_timestamp(now);
        tx.execute(
            "
            INSERT INTO sessions (id, employee_id, machine_id, started_at, ended_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            ",
            params![
                id.as_str(),
                employee_id.as_str(),
                machine_id.as_str(),
                format_timestamp(started_at),
                recorded_at,
                recorded_at,
            ],
        )
        .map_err(|err| open_slot_violation(&err, employee_id, machine_id))?;
        tx.commit().map_store_err()?;

        tracing::debug!(session_id = %id, employee_id = %employee_id, machine_id = %machine_id, "session opened");
        Ok(Session {
            id,
            employee_id: employee_id.clone(),
            machine_id: machine_id.clone(),
            started_at,
            ended_at: None,
        })
    }

    /// Closes an open session. One-way: a second close fails with
    /// `AlreadyClosed`. Callers needing idempotence must check status first.
    pub fn close_session(
        &mut self,
        session_id: &SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<Session, DomainError> {
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_store_err()?;

        let mut session = fetch_session(&tx, session_id)?;
        if session.ended_at.is_some() {
            return Err(DomainError::AlreadyClosed {
                session_id: session_id.to_string(),
            });
        }
        if ended_at <= session.started_at {
            return Err(DomainError::invalid_time(
                "end time must be strictly after start time",
            ));
        }

        tx.execute(
            "UPDATE sessions SET ended_at = ?, updated_at = ? WHERE id = ?",
            params![
                format_timestamp(ended_at),
                format_timestamp(Utc::now()),
                session_id.as_str(),
            ],
        )
        .map_store_err()?;
        tx.commit().map_store_err()?;

        tracing::debug!(session_id = %session_id, "session closed");
        session.ended_at = Some(ended_at);
        Ok(session)
    }

    /// Corrects a session's timestamps.
    ///
    /// Re-validates ordering and overlap as if the session were being
    /// recreated with the new values, excluding itself from the overlap
    /// check. Never changes the session's state: patching an end time onto an
    /// open session is a `Conflict`.
    pub fn update_session(
        &mut self,
        session_id: &SessionId,
        patch: SessionPatch,
    ) -> Result<Session, DomainError> {
        self.update_session_at(session_id, patch, Utc::now())
    }

    fn update_session_at(
        &mut self,
        session_id: &SessionId,
        patch: SessionPatch,
        now: DateTime<Utc>,
    ) -> Result<Session, DomainError> {
        if patch.is_empty() {
            return self.get_session(session_id);
        }

        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_store_err()?;

        let current = fetch_session(&tx, session_id)?;
        let ended_at = match current.ended_at {
            None if patch.ended_at.is_some() => {
                return Err(DomainError::conflict(
                    "cannot set an end time on an open session; close it instead",
                ));
            }
            None => None,
            Some(current_end) => Some(patch.ended_at.unwrap_or(current_end)),
        };
        let started_at = patch.started_at.unwrap_or(current.started_at);

        if started_at > now + self.config.future_skew {
            return Err(DomainError::invalid_time(format!(
                "start time {started_at} is too far in the future"
            )));
        }
        if let Some(end) = ended_at {
            if end <= started_at {
                return Err(DomainError::invalid_time(
                    "end time must be strictly after start time",
                ));
            }
        }
        if overlaps_another(&tx, &current, started_at, ended_at)? {
            return Err(DomainError::conflict(
                "amended times would overlap another session for the same machine or employee",
            ));
        }

        tx.execute(
            "UPDATE sessions SET started_at = ?, ended_at = ?, updated_at = ? WHERE id = ?",
            params![
                format_timestamp(started_at),
                ended_at.map(format_timestamp),
                format_timestamp(now),
                session_id.as_str(),
            ],
        )
        .map_store_err()?;
        tx.commit().map_store_err()?;

        tracing::debug!(session_id = %session_id, "session amended");
        Ok(Session {
            started_at,
            ended_at,
            ..current
        })
    }

    /// Fetches a single session by ID.
    pub fn get_session(&self, session_id: &SessionId) -> Result<Session, DomainError> {
        fetch_session(&self.db.conn, session_id)
    }

    /// Lists sessions matching the filter, ordered by start time ascending
    /// with ties broken by session ID for deterministic pagination.
    pub fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, DomainError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(after) = filter.started_after {
            clauses.push("started_at >= ?");
            values.push(format_timestamp(after));
        }
        if let Some(before) = filter.started_before {
            clauses.push("started_at < ?");
            values.push(format_timestamp(before));
        }
        if let Some(employee_id) = &filter.employee_id {
            clauses.push("employee_id = ?");
            values.push(employee_id.to_string());
        }
        if let Some(machine_id) = &filter.machine_id {
            clauses.push("machine_id = ?");
            values.push(machine_id.to_string());
        }
        match filter.status {
            Some(SessionStatus::Open) => clauses.push("ended_at IS NULL"),
            Some(SessionStatus::Closed) => clauses.push("ended_at IS NOT NULL"),
            None => {}
        }

        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY started_at ASC, id ASC");

        let mut stmt = self.db.conn.prepare(&sql).map_store_err()?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), SessionRow::from_row)
            .map_store_err()?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_store_err()?.into_session()?);
        }
        Ok(sessions)
    }

    /// Administrative removal of a session opened in error.
    ///
    /// Only open sessions may be deleted; closed sessions are part of the
    /// historical record that daily stats are derived from.
    pub fn delete_session(&mut self, session_id: &SessionId) -> Result<(), DomainError> {
        let tx = self
            .db
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_store_err()?;

        let session = fetch_session(&tx, session_id)?;
        if session.ended_at.is_some() {
            return Err(DomainError::conflict(
                "closed sessions cannot be deleted; they feed historical stats",
            ));
        }
        tx.execute(
            "DELETE FROM sessions WHERE id = ?",
            [session_id.as_str()],
        )
        .map_store_err()?;
        tx.commit().map_store_err()?;

        tracing::debug!(session_id = %session_id, "session deleted");
        Ok(())
    }

    /// Computes daily stats for closed sessions whose start date falls in the
    /// range, grouped as requested.
    ///
    /// The scan is a single statement, so each run sees one consistent
    /// snapshot; a scan failure propagates as an error rather than a partial
    /// result.
    pub fn daily_stats(
        &self,
        range: DateRange,
        group_by: GroupBy,
    ) -> Result<Vec<DailyStat>, DomainError> {
        let (start, end) = utc_window(range, self.config.reference_tz);
        let mut stmt = self
            .db
            .conn
            .prepare(&format!(
                "
                SELECT {SESSION_COLUMNS} FROM sessions
                WHERE ended_at IS NOT NULL AND started_at >= ? AND started_at < ?
                ORDER BY started_at ASC, id ASC
                "
            ))
            .map_store_err()?;
        let rows = stmt
            .query_map(
                [format_timestamp(start), format_timestamp(end)],
                SessionRow::from_row,
            )
            .map_store_err()?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_store_err()?.into_session()?);
        }
        Ok(compute_daily_stats(
            &sessions,
            group_by,
            self.config.reference_tz,
        ))
    }
}

fn employee_exists(conn: &Connection, id: &EmployeeId) -> Result<bool, DomainError> {
    conn.query_row(
        "SELECT 1 FROM employees WHERE id = ?",
        [id.as_str()],
        |_| Ok(()),
    )
    .optional()
    .map_store_err()
    .map(|row| row.is_some())
}

fn machine_status(
    conn: &Connection,
    id: &MachineId,
) -> Result<Option<MachineStatus>, DomainError> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM machines WHERE id = ?",
            [id.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_store_err()?;
    status
        .map(|s| {
            s.parse().map_err(|_| DomainError::Storage {
                message: format!("invalid machine status in store: {s}"),
            })
        })
        .transpose()
}

fn has_open_session(conn: &Connection, column: &str, id: &str) -> Result<bool, DomainError> {
    conn.query_row(
        &format!("SELECT 1 FROM sessions WHERE {column} = ? AND ended_at IS NULL"),
        [id],
        |_| Ok(()),
    )
    .optional()
    .map_store_err()
    .map(|row| row.is_some())
}

fn fetch_session(conn: &Connection, session_id: &SessionId) -> Result<Session, DomainError> {
    let row = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"),
            [session_id.as_str()],
            SessionRow::from_row,
        )
        .optional()
        .map_store_err()?;
    row.ok_or_else(|| DomainError::not_found(EntityKind::Session, session_id.as_str()))?
        .into_session()
}

/// Interval-overlap check against every other session of the same machine or
/// employee. Intervals are half-open; touching endpoints do not overlap. An
/// open session extends indefinitely from its start.
fn overlaps_another(
    conn: &Connection,
    current: &Session,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
) -> Result<bool, DomainError> {
    let start = format_timestamp(started_at);
    let count: i64 = match ended_at {
        Some(end) => conn
            .query_row(
                "
                SELECT COUNT(*) FROM sessions
                WHERE id != ?1 AND (machine_id = ?2 OR employee_id = ?3)
                  AND started_at < ?4 AND (ended_at IS NULL OR ended_at > ?5)
                ",
                params![
                    current.id.as_str(),
                    current.machine_id.as_str(),
                    current.employee_id.as_str(),
                    format_timestamp(end),
                    start,
                ],
                |row| row.get(0),
            )
            .map_store_err()?,
        None => conn
            .query_row(
                "
                SELECT COUNT(*) FROM sessions
                WHERE id != ?1 AND (machine_id = ?2 OR employee_id = ?3)
                  AND (ended_at IS NULL OR ended_at > ?4)
                ",
                params![
                    current.id.as_str(),
                    current.machine_id.as_str(),
                    current.employee_id.as_str(),
                    start,
                ],
                |row| row.get(0),
            )
            .map_store_err()?,
    };
    Ok(count > 0)
}

/// Maps a unique-index violation on the open-session indexes onto the busy
/// errors; anything else goes through the standard store mapping.
fn open_slot_violation(
    err: &rusqlite::Error,
    employee_id: &EmployeeId,
    machine_id: &MachineId,
) -> DomainError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("idx_sessions_open_machine") {
                return DomainError::MachineBusy {
                    machine_id: machine_id.to_string(),
                };
            }
            if message.contains("idx_sessions_open_employee") {
                return DomainError::EmployeeBusy {
                    employee_id: employee_id.to_string(),
                };
            }
        }
    }
    DomainError::Storage {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::open_in_memory(CoreConfig::default()).expect("open in-memory ledger")
    }

    /// Creates one employee and one machine, returning their IDs.
    fn seed(ledger: &mut Ledger) -> (EmployeeId, MachineId) {
        let employee = ledger.db.add_employee("Aiko").unwrap();
        let machine = ledger.db.add_machine("Sea Story 7").unwrap();
        (employee.id, machine.id)
    }

    #[test]
    fn open_then_close_roundtrip() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let started_at = utc(2024, 1, 5, 9, 0);
        let ended_at = utc(2024, 1, 5, 9, 30);

        let session = ledger.open_session(&employee, &machine, started_at).unwrap();
        assert_eq!(session.status(), SessionStatus::Open);

        let closed = ledger.close_session(&session.id, ended_at).unwrap();
        assert_eq!(closed.status(), SessionStatus::Closed);

        let fetched = ledger.get_session(&session.id).unwrap();
        assert_eq!(fetched.status(), SessionStatus::Closed);
        assert_eq!(fetched.started_at, started_at);
        assert_eq!(fetched.ended_at, Some(ended_at));
    }

    #[test]
    fn open_rejects_unknown_entities() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);

        let ghost_employee = EmployeeId::new("ghost").unwrap();
        let err = ledger
            .open_session(&ghost_employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found(EntityKind::Employee, "ghost"));

        let ghost_machine = MachineId::new("ghost").unwrap();
        let err = ledger
            .open_session(&employee, &ghost_machine, utc(2024, 1, 5, 9, 0))
            .unwrap_err();
        assert_eq!(err, DomainError::not_found(EntityKind::Machine, "ghost"));
    }

    #[test]
    fn machine_slot_is_exclusive_while_open() {
        let mut ledger = ledger();
        let (employee_a, machine) = seed(&mut ledger);
        let employee_b = ledger.db.add_employee("Botan").unwrap().id;

        ledger
            .open_session(&employee_a, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();
        let err = ledger
            .open_session(&employee_b, &machine, utc(2024, 1, 5, 9, 5))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::MachineBusy {
                machine_id: machine.to_string(),
            }
        );
    }

    #[test]
    fn employee_slot_frees_after_close() {
        let mut ledger = ledger();
        let (employee, machine_a) = seed(&mut ledger);
        let machine_b = ledger.db.add_machine("Hanabi").unwrap().id;

        let first = ledger
            .open_session(&employee, &machine_a, utc(2024, 1, 5, 9, 0))
            .unwrap();

        let err = ledger
            .open_session(&employee, &machine_b, utc(2024, 1, 5, 9, 5))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::EmployeeBusy {
                employee_id: employee.to_string(),
            }
        );

        ledger.close_session(&first.id, utc(2024, 1, 5, 9, 30)).unwrap();
        let second = ledger
            .open_session(&employee, &machine_b, utc(2024, 1, 5, 9, 35))
            .unwrap();
        assert_eq!(second.status(), SessionStatus::Open);
    }

    #[test]
    fn open_rejects_far_future_start() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let now = utc(2024, 1, 5, 9, 0);

        // Within the 5 minute skew tolerance.
        let ok = ledger.open_session_at(&employee, &machine, utc(2024, 1, 5, 9, 4), now);
        assert!(ok.is_ok());

        let session = ok.unwrap();
        ledger.close_session(&session.id, utc(2024, 1, 5, 9, 30)).unwrap();

        let err = ledger
            .open_session_at(&employee, &machine, utc(2024, 1, 5, 9, 6), now)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTime { .. }));
    }

    #[test]
    fn open_rejects_retired_machine() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        ledger
            .db
            .set_machine_status(&machine, MachineStatus::Retired)
            .unwrap();

        let err = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn close_is_one_way() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let session = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();

        ledger.close_session(&session.id, utc(2024, 1, 5, 9, 30)).unwrap();
        let err = ledger
            .close_session(&session.id, utc(2024, 1, 5, 10, 0))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::AlreadyClosed {
                session_id: session.id.to_string(),
            }
        );
    }

    #[test]
    fn close_rejects_end_not_after_start() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let started_at = utc(2024, 1, 5, 9, 0);
        let session = ledger.open_session(&employee, &machine, started_at).unwrap();

        // end == start is rejected, not just end < start.
        let err = ledger.close_session(&session.id, started_at).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTime { .. }));

        let err = ledger
            .close_session(&session.id, utc(2024, 1, 5, 8, 0))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTime { .. }));
    }

    #[test]
    fn close_missing_session_is_not_found() {
        let mut ledger = ledger();
        let id = SessionId::new("no-such").unwrap();
        let err = ledger.close_session(&id, utc(2024, 1, 5, 9, 0)).unwrap_err();
        assert_eq!(err, DomainError::not_found(EntityKind::Session, "no-such"));
    }

    #[test]
    fn amend_moves_timestamps_within_state() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let session = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();
        ledger.close_session(&session.id, utc(2024, 1, 5, 9, 30)).unwrap();

        let amended = ledger
            .update_session(
                &session.id,
                SessionPatch {
                    started_at: Some(utc(2024, 1, 5, 8, 45)),
                    ended_at: Some(utc(2024, 1, 5, 9, 45)),
                },
            )
            .unwrap();
        assert_eq!(amended.started_at, utc(2024, 1, 5, 8, 45));
        assert_eq!(amended.ended_at, Some(utc(2024, 1, 5, 9, 45)));
        assert_eq!(amended.status(), SessionStatus::Closed);

        let fetched = ledger.get_session(&session.id).unwrap();
        assert_eq!(fetched, amended);
    }

    #[test]
    fn amend_cannot_close_an_open_session() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let session = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();

        let err = ledger
            .update_session(
                &session.id,
                SessionPatch {
                    started_at: None,
                    ended_at: Some(utc(2024, 1, 5, 9, 30)),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn amend_rejects_end_equal_to_start() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let session = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();
        ledger.close_session(&session.id, utc(2024, 1, 5, 9, 30)).unwrap();

        let err = ledger
            .update_session(
                &session.id,
                SessionPatch {
                    started_at: Some(utc(2024, 1, 5, 9, 30)),
                    ended_at: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTime { .. }));
    }

    #[test]
    fn amend_detects_overlap_with_neighbor() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);

        let first = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();
        ledger.close_session(&first.id, utc(2024, 1, 5, 10, 0)).unwrap();

        let second = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 10, 0))
            .unwrap();
        ledger.close_session(&second.id, utc(2024, 1, 5, 11, 0)).unwrap();

        // Pulling the second session's start before the first one's end
        // overlaps on both the machine and the employee.
        let err = ledger
            .update_session(
                &second.id,
                SessionPatch {
                    started_at: Some(utc(2024, 1, 5, 9, 30)),
                    ended_at: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));

        // Touching endpoints are fine: intervals are half-open.
        let amended = ledger
            .update_session(
                &second.id,
                SessionPatch {
                    started_at: None,
                    ended_at: Some(utc(2024, 1, 5, 11, 30)),
                },
            )
            .unwrap();
        assert_eq!(amended.ended_at, Some(utc(2024, 1, 5, 11, 30)));
    }

    #[test]
    fn empty_amend_is_a_noop() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        let session = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();

        let unchanged = ledger
            .update_session(&session.id, SessionPatch::default())
            .unwrap();
        assert_eq!(unchanged, session);
    }

    #[test]
    fn delete_only_open_sessions() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);

        let open = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();
        ledger.delete_session(&open.id).unwrap();
        let err = ledger.get_session(&open.id).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let closed = ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 10, 0))
            .unwrap();
        ledger.close_session(&closed.id, utc(2024, 1, 5, 11, 0)).unwrap();
        let err = ledger.delete_session(&closed.id).unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn list_sessions_filters_and_orders() {
        let mut ledger = ledger();
        let (employee_a, machine_a) = seed(&mut ledger);
        let employee_b = ledger.db.add_employee("Botan").unwrap().id;
        let machine_b = ledger.db.add_machine("Hanabi").unwrap().id;

        let s1 = ledger
            .open_session(&employee_a, &machine_a, utc(2024, 1, 5, 9, 0))
            .unwrap();
        ledger.close_session(&s1.id, utc(2024, 1, 5, 10, 0)).unwrap();
        let s2 = ledger
            .open_session(&employee_b, &machine_b, utc(2024, 1, 5, 9, 30))
            .unwrap();
        ledger.close_session(&s2.id, utc(2024, 1, 5, 10, 30)).unwrap();
        let s3 = ledger
            .open_session(&employee_a, &machine_a, utc(2024, 1, 6, 9, 0))
            .unwrap();

        let all = ledger.list_sessions(&SessionFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![s1.id.clone(), s2.id.clone(), s3.id.clone()]);

        let by_employee = ledger
            .list_sessions(&SessionFilter {
                employee_id: Some(employee_a.clone()),
                ..SessionFilter::default()
            })
            .unwrap();
        assert_eq!(by_employee.len(), 2);

        let open_only = ledger
            .list_sessions(&SessionFilter {
                status: Some(SessionStatus::Open),
                ..SessionFilter::default()
            })
            .unwrap();
        assert_eq!(open_only.len(), 1);
        assert_eq!(open_only[0].id, s3.id);

        let jan_5 = ledger
            .list_sessions(&SessionFilter {
                started_after: Some(utc(2024, 1, 5, 0, 0)),
                started_before: Some(utc(2024, 1, 6, 0, 0)),
                ..SessionFilter::default()
            })
            .unwrap();
        assert_eq!(jan_5.len(), 2);
    }

    #[test]
    fn daily_stats_through_the_ledger() {
        let mut ledger = ledger();
        let (employee, machine_a) = seed(&mut ledger);
        let machine_b = ledger.db.add_machine("Hanabi").unwrap().id;

        let s1 = ledger
            .open_session(&employee, &machine_a, utc(2024, 1, 5, 9, 0))
            .unwrap();
        ledger.close_session(&s1.id, utc(2024, 1, 5, 9, 30)).unwrap();
        let s2 = ledger
            .open_session(&employee, &machine_b, utc(2024, 1, 5, 10, 0))
            .unwrap();
        ledger.close_session(&s2.id, utc(2024, 1, 5, 11, 30)).unwrap();
        // Still open on the stats date: excluded from aggregates.
        ledger
            .open_session(&employee, &machine_a, utc(2024, 1, 5, 12, 0))
            .unwrap();

        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        let stats = ledger.daily_stats(range, GroupBy::Employee).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].session_count, 2);
        assert_eq!(stats[0].total_ms, 120 * 60 * 1000);
        assert_eq!(stats[0].avg_ms, 60 * 60 * 1000);

        let rerun = ledger.daily_stats(range, GroupBy::Employee).unwrap();
        assert_eq!(stats, rerun);
    }

    #[test]
    fn unique_index_backstops_the_open_check() {
        let mut ledger = ledger();
        let (employee, machine) = seed(&mut ledger);
        ledger
            .open_session(&employee, &machine, utc(2024, 1, 5, 9, 0))
            .unwrap();

        // Bypass the ledger checks and hit the partial index directly.
        let err = ledger
            .db
            .conn
            .execute(
                "
                INSERT INTO sessions (id, employee_id, machine_id, started_at, ended_at, created_at, updated_at)
                VALUES ('rogue', ?, ?, '2024-01-05T09:10:00.000Z', NULL, '2024-01-05T09:10:00.000Z', '2024-01-05T09:10:00.000Z')
                ",
                params![employee.as_str(), machine.as_str()],
            )
            .unwrap_err();
        let mapped = open_slot_violation(&err, &employee, &machine);
        assert!(matches!(
            mapped,
            DomainError::MachineBusy { .. } | DomainError::EmployeeBusy { .. }
        ));
    }
}
