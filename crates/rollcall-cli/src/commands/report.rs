//! Report command: run the attendance engine and print the result.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, NaiveDate, Utc};
use rollcall_core::{
    AttendanceRecord, AttendanceRequest, AttendanceResponse, EngineConfig, RosterEntry,
    SnapshotFilter, run_attendance,
};
use serde_json::Value;

/// Loads raw event payloads: a JSON array, or a single object treated as a
/// one-element batch.
pub fn load_events(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("events file {} is not valid JSON", path.display()))?;
    match value {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        _ => bail!("events file {} must hold a JSON array or object", path.display()),
    }
}

fn load_roster(path: &Path) -> Result<Vec<RosterEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("roster file {} is not a JSON roster array", path.display()))
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    events_path: &Path,
    roster_path: Option<&Path>,
    date: NaiveDate,
    period: u8,
    filter: SnapshotFilter,
    json: bool,
    engine: &EngineConfig,
) -> Result<()> {
    let raw_events = load_events(events_path)?;
    let roster = roster_path.map(load_roster).transpose()?.unwrap_or_default();
    tracing::debug!(
        events = raw_events.len(),
        roster = roster.len(),
        %date,
        period,
        "running attendance report"
    );

    let request = AttendanceRequest {
        date,
        period,
        roster,
        filter,
    };
    let response = run_attendance(&request, &raw_events, Utc::now(), engine)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!(
            "{}",
            format_report(&response, date, period, engine.periods.tz_offset())
        );
    }
    Ok(())
}

/// Formats one record as a table row. Temporal details are omitted for
/// students never observed in the window.
fn format_record(record: &AttendanceRecord, tz: FixedOffset) -> String {
    let mut line = format!("  {:<12}{}", record.status_code.as_str(), record.student_id);

    match (record.first_seen, record.last_seen) {
        (Some(first), Some(last)) => {
            write!(
                line,
                "  {} → {}  seen {}",
                first.with_timezone(&tz).format("%H:%M"),
                last.with_timezone(&tz).format("%H:%M"),
                record.seen_count
            )
            .expect("writing to String cannot fail");
        }
        _ => line.push_str("  —"),
    }

    if let Some(name) = &record.student_name {
        write!(line, "  {name}").expect("writing to String cannot fail");
    }
    line
}

fn format_stats(response: &AttendanceResponse) -> String {
    let stats = &response.report.stats;
    format!(
        "present {} · late {} · early-leave {} · absent {} · total {}",
        stats.present, stats.late, stats.early_leave, stats.absent, stats.total
    )
}

/// Human-readable report, times shown in the campus timezone.
pub fn format_report(
    response: &AttendanceResponse,
    date: NaiveDate,
    period: u8,
    tz: FixedOffset,
) -> String {
    let mut output = String::new();
    let window = &response.context.window;

    writeln!(
        output,
        "ATTENDANCE: {date} period {period} · {}–{} {tz}",
        window.start.with_timezone(&tz).format("%H:%M"),
        window.end.with_timezone(&tz).format("%H:%M"),
    )
    .unwrap();
    writeln!(
        output,
        "roster: {} ({}) · snapshots: {}",
        response.context.roster_source,
        response.context.roster_size,
        response.context.snapshot_count
    )
    .unwrap();
    writeln!(output).unwrap();

    if response.report.records.is_empty() {
        writeln!(output, "No roster and no observed students.").unwrap();
        return output;
    }

    for record in &response.report.records {
        writeln!(output, "{}", format_record(record, tz)).unwrap();
    }

    if !response.report.unknown_students.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "Not on the roster:").unwrap();
        for student in &response.report.unknown_students {
            match &student.name {
                Some(name) => writeln!(output, "  {}  {name}", student.id).unwrap(),
                None => writeln!(output, "  {}", student.id).unwrap(),
            }
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "{}", format_stats(response)).unwrap();
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 2).unwrap()
    }

    /// Period 1 starts 08:50 +09:00, i.e. 23:50 UTC the previous day.
    fn iso(minutes_after_start: i64) -> String {
        (chrono::Utc
            .with_ymd_and_hms(2025, 12, 1, 23, 50, 0)
            .unwrap()
            + chrono::Duration::minutes(minutes_after_start))
        .to_rfc3339()
    }

    use chrono::TimeZone;

    fn response(events: &[Value], roster_ids: &[&str]) -> AttendanceResponse {
        let request = AttendanceRequest {
            date: date(),
            period: 1,
            roster: roster_ids
                .iter()
                .map(|id| RosterEntry {
                    student_id: (*id).to_string(),
                    student_name: None,
                })
                .collect(),
            filter: SnapshotFilter::default(),
        };
        run_attendance(&request, events, Utc::now(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn record_line_for_observed_student() {
        let events: Vec<Value> = (0..=9)
            .map(|i| {
                json!({
                    "timestamp": iso(i * 10),
                    "room": "A-301",
                    "students": [{"id": "S001", "name": "Tanaka"}],
                })
            })
            .collect();
        let response = response(&events, &["S001"]);

        let line = format_record(&response.report.records[0], offset());
        insta::assert_snapshot!(line, @"  present     S001  08:50 → 10:20  seen 10  Tanaka");
    }

    #[test]
    fn record_line_for_absent_student() {
        let response = response(&[], &["S002"]);
        let line = format_record(&response.report.records[0], offset());
        insta::assert_snapshot!(line, @"  absent      S002  —");
    }

    #[test]
    fn stats_line_tallies() {
        let events = vec![json!({
            "timestamp": iso(0),
            "room": "A-301",
            "students": ["S001", "S777"],
        })];
        let response = response(&events, &["S001", "S002"]);

        insta::assert_snapshot!(
            format_stats(&response),
            @"present 0 · late 0 · early-leave 1 · absent 1 · total 2"
        );
    }

    #[test]
    fn report_lists_unknown_students() {
        let events = vec![json!({
            "timestamp": iso(0),
            "room": "A-301",
            "students": ["S001", "S777"],
        })];
        let response = response(&events, &["S001"]);
        let output = format_report(&response, date(), 1, offset());

        assert!(output.starts_with("ATTENDANCE: 2025-12-02 period 1 · 08:50–10:20 +09:00\n"));
        assert!(output.contains("roster: request (1) · snapshots: 1\n"));
        assert!(output.contains("Not on the roster:\n  S777\n"));
    }

    #[test]
    fn empty_report_prints_placeholder() {
        let response = response(&[], &[]);
        let output = format_report(&response, date(), 1, offset());
        assert!(output.contains("No roster and no observed students."));
    }

    #[test]
    fn load_events_accepts_array_or_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(file, "{}", json!([{"a": 1}, {"b": 2}])).unwrap();
        assert_eq!(load_events(file.path()).unwrap().len(), 2);

        let mut single = tempfile::NamedTempFile::new().unwrap();
        write!(single, "{}", json!({"a": 1})).unwrap();
        assert_eq!(load_events(single.path()).unwrap().len(), 1);
    }

    #[test]
    fn load_events_rejects_scalar() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(file, "42").unwrap();
        assert!(load_events(file.path()).is_err());
    }

    #[test]
    fn load_roster_parses_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(
            file,
            "{}",
            json!([{"studentId": "S001", "studentName": "Tanaka"}, {"studentId": "S002"}])
        )
        .unwrap();

        let roster = load_roster(file.path()).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].student_name.as_deref(), Some("Tanaka"));
    }
}
