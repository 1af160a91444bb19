//! End-to-end attendance inference over a closed window of raw events.
//!
//! The engine is a pure function: no I/O, no shared state, safe to invoke
//! concurrently for independent requests. Callers supply raw event
//! payloads already scoped to the fetch window; the pipeline is
//! normalize → snapshots → filter → roster → timelines → classify.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::{AttendanceReport, ClassifyConfig, build_report};
use crate::event::LevelPolicy;
use crate::normalize::normalize_event;
use crate::period::{ClassPeriodWindow, PeriodError, PeriodTable};
use crate::roster::{RosterEntry, resolve_roster};
use crate::snapshot::{SnapshotFilter, build_snapshots};
use crate::timeline::Timelines;
use crate::types::RosterSource;

/// Everything the engine needs beyond the request itself.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub level_policy: LevelPolicy,
    pub classify: ClassifyConfig,
    pub periods: PeriodTable,
}

/// One attendance evaluation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    /// Target calendar date.
    pub date: NaiveDate,
    /// Class period number (1-5 on the default timetable).
    pub period: u8,
    /// Authoritative roster; empty means infer from snapshots.
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
    /// Optional course/teacher/classroom filter. The requested period is
    /// always filtered on, whether or not it is set here.
    #[serde(default)]
    pub filter: SnapshotFilter,
}

/// Echoed request context alongside the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContext {
    pub window: ClassPeriodWindow,
    pub filter: SnapshotFilter,
    pub roster_source: RosterSource,
    pub roster_size: usize,
    pub snapshot_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_snapshot_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot_at: Option<DateTime<Utc>>,
}

/// The full engine output: report plus echoed context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    pub report: AttendanceReport,
    pub context: ReportContext,
}

/// Runs the whole pipeline for one request.
///
/// Fails fast on an unknown period, before any event is touched. Malformed
/// events never fail the batch; they degrade to empty snapshots and are
/// dropped.
pub fn run_attendance(
    request: &AttendanceRequest,
    raw_events: &[Value],
    received_at: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<AttendanceResponse, PeriodError> {
    let window = config.periods.bounds(request.date, request.period)?;

    let normalized: Vec<_> = raw_events
        .iter()
        .map(|raw| normalize_event(raw, received_at, config.level_policy))
        .collect();

    let mut filter = request.filter.clone();
    filter.period = filter.period.or(Some(request.period));

    let mut snapshots = build_snapshots(&normalized);
    let before_filter = snapshots.len();
    snapshots.retain(|snap| filter.matches(snap));
    tracing::debug!(
        events = raw_events.len(),
        snapshots = snapshots.len(),
        filtered_out = before_filter - snapshots.len(),
        "presence snapshots reconstructed"
    );

    let (roster, roster_source) = resolve_roster(&request.roster, &snapshots);
    let timelines = Timelines::collect(&snapshots, &window, config.classify.end_tolerance());
    let report = build_report(&roster, &timelines, &window, &config.classify);

    let context = ReportContext {
        window,
        filter,
        roster_source,
        roster_size: roster.len(),
        snapshot_count: snapshots.len(),
        first_snapshot_at: snapshots.iter().map(|s| s.at).min(),
        last_snapshot_at: snapshots.iter().map(|s| s.at).max(),
    };

    Ok(AttendanceResponse { report, context })
}
