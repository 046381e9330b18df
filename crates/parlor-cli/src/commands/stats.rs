//! Daily statistics command.

use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDate;
use parlor_core::{DailyStat, GroupBy};
use parlor_db::Facade;

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Format daily stats for human-readable output.
///
/// The grouping columns shown follow the requested dimension; rows arrive
/// already sorted by date, employee, machine.
pub fn format_stats(entries: &[DailyStat], group_by: GroupBy) -> String {
    let mut output = String::new();

    if entries.is_empty() {
        writeln!(output, "No closed sessions in range.").unwrap();
        return output;
    }

    let show_employee = matches!(group_by, GroupBy::Employee | GroupBy::Both);
    let show_machine = matches!(group_by, GroupBy::Machine | GroupBy::Both);

    write!(output, "{:<10}  ", "Date").unwrap();
    if show_employee {
        write!(output, "{:<36}  ", "Employee").unwrap();
    }
    if show_machine {
        write!(output, "{:<36}  ", "Machine").unwrap();
    }
    writeln!(output, "{:>8}  {:>8}  {:>8}", "Sessions", "Total", "Avg").unwrap();

    for entry in entries {
        write!(output, "{:<10}  ", entry.date.format("%Y-%m-%d")).unwrap();
        if show_employee {
            let id = entry.employee_id.as_ref().map_or("-", |id| id.as_str());
            write!(output, "{id:<36}  ").unwrap();
        }
        if show_machine {
            let id = entry.machine_id.as_ref().map_or("-", |id| id.as_str());
            write!(output, "{id:<36}  ").unwrap();
        }
        writeln!(
            output,
            "{:>8}  {:>8}  {:>8}",
            entry.session_count,
            format_duration(entry.total_ms),
            format_duration(entry.avg_ms)
        )
        .unwrap();
    }

    output
}

/// Runs the stats command.
pub fn run(
    facade: &Facade,
    from: NaiveDate,
    to: NaiveDate,
    group_by: GroupBy,
    json: bool,
) -> Result<()> {
    let entries = facade.daily_stats(from, to, group_by)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", format_stats(&entries, group_by));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use parlor_core::EmployeeId;

    use super::*;

    fn stat(date: (i32, u32, u32), employee: &str, count: i64, total_ms: i64) -> DailyStat {
        DailyStat {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            employee_id: Some(EmployeeId::new(employee).unwrap()),
            machine_id: None,
            session_count: count,
            total_ms,
            avg_ms: total_ms / count,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(59_000), "0m");
        assert_eq!(format_duration(1_800_000), "30m");
        assert_eq!(format_duration(5_400_000), "1h 30m");
        assert_eq!(format_duration(-1), "0m");
    }

    #[test]
    fn test_format_stats_empty() {
        let output = format_stats(&[], GroupBy::Employee);
        assert!(output.contains("No closed sessions in range."));
    }

    #[test]
    fn test_format_stats_by_employee() {
        let entries = vec![
            stat((2024, 1, 5), "emp-aiko", 2, 7_200_000),
            stat((2024, 1, 6), "emp-benji", 1, 1_800_000),
        ];
        let output = format_stats(&entries, GroupBy::Employee);
        assert!(output.contains("2024-01-05"));
        assert!(output.contains("emp-aiko"));
        assert!(output.contains("2h 0m"));
        assert!(output.contains("1h 0m"));
        assert!(output.contains("30m"));
    }

    #[test]
    fn test_format_stats_by_date_omits_entity_columns() {
        let entries = vec![DailyStat {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            employee_id: None,
            machine_id: None,
            session_count: 3,
            total_ms: 3_600_000,
            avg_ms: 1_200_000,
        }];
        let output = format_stats(&entries, GroupBy::Date);
        assert!(!output.contains("Employee"));
        assert!(!output.contains("Machine"));
        assert!(output.contains("2024-01-05"));
    }

    #[test]
    fn test_stats_json_shape() {
        let entries = vec![stat((2024, 1, 5), "emp-aiko", 2, 7_200_000)];
        let output = serde_json::to_string_pretty(&entries).unwrap();
        assert_snapshot!(output, @r#"
        [
          {
            "date": "2024-01-05",
            "employee_id": "emp-aiko",
            "machine_id": null,
            "session_count": 2,
            "total_ms": 7200000,
            "avg_ms": 3600000
          }
        ]
        "#);
    }
}
