//! Session lifecycle commands.

use std::fmt::Write;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use parlor_core::{Session, SessionFilter, SessionPatch, SessionStatus};
use parlor_db::Facade;

use super::stats::format_duration;

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Open a session and print its ID.
pub fn open(
    facade: &mut Facade,
    employee: &str,
    machine: &str,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let started_at = at.unwrap_or_else(Utc::now);
    let session = facade.open_session(employee, machine, started_at)?;
    println!("{}", session.id.as_str());
    Ok(())
}

/// Close an open session and print its final duration.
pub fn close(facade: &mut Facade, id: &str, at: Option<DateTime<Utc>>) -> Result<()> {
    let ended_at = at.unwrap_or_else(Utc::now);
    let session = facade.close_session(id, ended_at)?;
    let duration = session.duration_ms().unwrap_or(0);
    println!(
        "{} closed after {}",
        session.id.as_str(),
        format_duration(duration)
    );
    Ok(())
}

/// Correct a session's timestamps.
pub fn amend(
    facade: &mut Facade,
    id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<()> {
    let patch = SessionPatch {
        started_at: start,
        ended_at: end,
    };
    let session = facade.amend_session(id, patch)?;
    print!("{}", format_session_detail(&session));
    Ok(())
}

/// Format a single session as key/value lines.
pub fn format_session_detail(session: &Session) -> String {
    let mut output = String::new();

    writeln!(output, "id:       {}", session.id.as_str()).unwrap();
    writeln!(output, "employee: {}", session.employee_id.as_str()).unwrap();
    writeln!(output, "machine:  {}", session.machine_id.as_str()).unwrap();
    writeln!(output, "started:  {}", format_timestamp(session.started_at)).unwrap();
    match session.ended_at {
        Some(ended_at) => {
            writeln!(output, "ended:    {}", format_timestamp(ended_at)).unwrap();
            let duration = session.duration_ms().unwrap_or(0);
            writeln!(output, "duration: {}", format_duration(duration)).unwrap();
        }
        None => {
            writeln!(output, "ended:    (open)").unwrap();
        }
    }

    output
}

/// Runs the session show command.
pub fn show(facade: &Facade, id: &str) -> Result<()> {
    let session = facade.get_session(id)?;
    print!("{}", format_session_detail(&session));
    Ok(())
}

/// Format sessions for human-readable output.
pub fn format_sessions(sessions: &[Session]) -> String {
    let mut output = String::new();

    if sessions.is_empty() {
        writeln!(output, "No sessions match.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<36}  {:<20}  {:<20}  {:>8}  Status",
        "ID", "Started", "Ended", "Duration"
    )
    .unwrap();
    writeln!(
        output,
        "────────────────────────────────────  ────────────────────  ────────────────────  ────────  ──────"
    )
    .unwrap();
    for session in sessions {
        let ended = session
            .ended_at
            .map_or_else(|| "-".to_string(), format_timestamp);
        let duration = session
            .duration_ms()
            .map_or_else(|| "-".to_string(), format_duration);
        writeln!(
            output,
            "{:<36}  {:<20}  {:<20}  {:>8}  {}",
            session.id.as_str(),
            format_timestamp(session.started_at),
            ended,
            duration,
            session.status().as_str()
        )
        .unwrap();
    }

    output
}

/// Runs the session list command.
pub fn list(
    facade: &Facade,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    employee: Option<&str>,
    machine: Option<&str>,
    status: Option<SessionStatus>,
    json: bool,
) -> Result<()> {
    let filter = SessionFilter {
        started_after: from,
        started_before: to,
        employee_id: employee
            .map(parlor_core::EmployeeId::new)
            .transpose()
            .map_err(parlor_db::ApiError::from)?,
        machine_id: machine
            .map(parlor_core::MachineId::new)
            .transpose()
            .map_err(parlor_db::ApiError::from)?,
        status,
    };
    let sessions = facade.list_sessions(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
    } else {
        print!("{}", format_sessions(&sessions));
    }

    Ok(())
}

/// Delete a session opened in error.
pub fn delete(facade: &mut Facade, id: &str) -> Result<()> {
    facade.delete_session(id)?;
    println!("{id} deleted");
    Ok(())
}
