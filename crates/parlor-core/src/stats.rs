//! Daily statistics aggregation over closed sessions.
//!
//! [`compute_daily_stats`] is a pure function of a session snapshot and the
//! grouping parameters: no mutation, no clock, no store access. Running it
//! twice over the same snapshot yields identical ordered output, which is
//! what makes cached or re-computed stats safe to compare.
//!
//! Day attribution uses the start timestamp's calendar date in the configured
//! reference zone. A session crossing midnight is attributed entirely to its
//! start date.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::types::{EmployeeId, MachineId, Session};

/// Grouping dimension for daily stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One row per date.
    Date,
    /// One row per (date, employee).
    Employee,
    /// One row per (date, machine).
    Machine,
    /// One row per (date, employee, machine).
    Both,
}

/// An inclusive range of calendar dates in the reference time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// A computed aggregate for one (date, group key) cell.
///
/// Group key fields not selected by the [`GroupBy`] dimension are `None`.
/// Stats are derived entirely from closed sessions and are never updated in
/// place; each aggregation run produces fresh values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub employee_id: Option<EmployeeId>,
    pub machine_id: Option<MachineId>,
    pub session_count: i64,
    pub total_ms: i64,
    pub avg_ms: i64,
}

/// Converts an inclusive date range in the reference zone to the half-open
/// UTC window `[start of from, start of day after to)`.
#[must_use]
pub fn utc_window(range: DateRange, reference_tz: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day_start_utc(range.from, reference_tz);
    let end = day_start_utc(range.to + Duration::days(1), reference_tz);
    (start, end)
}

/// UTC instant at which the given calendar date begins in the reference zone.
fn day_start_utc(date: NaiveDate, reference_tz: FixedOffset) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match reference_tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Fixed offsets have no DST gaps; this arm is unreachable.
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

/// Computes per-day summaries from a snapshot of sessions.
///
/// Only closed sessions contribute; open sessions represent in-progress
/// activity and are excluded so aggregates stay stable and replayable.
/// Output is ordered by date ascending, then employee ID, then machine ID.
/// Groups with no sessions are omitted rather than emitted with zero counts.
#[must_use]
pub fn compute_daily_stats(
    sessions: &[Session],
    group_by: GroupBy,
    reference_tz: FixedOffset,
) -> Vec<DailyStat> {
    type GroupKey = (NaiveDate, Option<EmployeeId>, Option<MachineId>);

    let mut groups: BTreeMap<GroupKey, (i64, i64)> = BTreeMap::new();
    for session in sessions {
        let Some(duration_ms) = session.duration_ms() else {
            continue;
        };
        let date = session
            .started_at
            .with_timezone(&reference_tz)
            .date_naive();
        let key = match group_by {
            GroupBy::Date => (date, None, None),
            GroupBy::Employee => (date, Some(session.employee_id.clone()), None),
            GroupBy::Machine => (date, None, Some(session.machine_id.clone())),
            GroupBy::Both => (
                date,
                Some(session.employee_id.clone()),
                Some(session.machine_id.clone()),
            ),
        };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += duration_ms;
    }

    groups
        .into_iter()
        .map(|((date, employee_id, machine_id), (session_count, total_ms))| DailyStat {
            date,
            employee_id,
            machine_id,
            session_count,
            total_ms,
            avg_ms: total_ms / session_count,
        })
        .collect()
}
