//! Per-student observation timelines.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::period::ClassPeriodWindow;
use crate::snapshot::PresenceSnapshot;
use crate::types::StudentId;

/// One observed student: their best-known name and the instants at which
/// they appeared inside the evaluation window.
#[derive(Debug, Clone, Default)]
pub struct ObservedStudent {
    pub name: Option<String>,
    /// Strictly ascending, deduplicated by exact instant. Empty when the
    /// student was observed only outside the window.
    pub instants: Vec<DateTime<Utc>>,
}

/// Window-filtered timelines for every student observed in any snapshot.
///
/// Keyed by student ID in ascending order so iteration is deterministic.
/// Students observed only outside the window still get an entry (with an
/// empty timeline) — the roster/unknown partition needs to see them.
#[derive(Debug, Clone, Default)]
pub struct Timelines {
    entries: BTreeMap<StudentId, ObservedStudent>,
}

impl Timelines {
    /// Collects timelines from snapshots, restricted to the closed interval
    /// `[window.start, window.end + end_tolerance]`.
    ///
    /// Snapshots are sorted by instant internally, so callers may pass them
    /// in any order.
    pub fn collect(
        snapshots: &[PresenceSnapshot],
        window: &ClassPeriodWindow,
        end_tolerance: Duration,
    ) -> Self {
        let cutoff = window.end + end_tolerance;

        let mut sorted: Vec<&PresenceSnapshot> = snapshots.iter().collect();
        sorted.sort_by_key(|snap| snap.at);

        let mut entries: BTreeMap<StudentId, ObservedStudent> = BTreeMap::new();
        for snap in sorted {
            for student in &snap.students {
                let entry = entries.entry(student.id.clone()).or_default();
                if entry.name.is_none() {
                    entry.name.clone_from(&student.name);
                }
                if snap.at >= window.start && snap.at <= cutoff {
                    // sorted input: exact-duplicate instants are adjacent
                    if entry.instants.last() != Some(&snap.at) {
                        entry.instants.push(snap.at);
                    }
                }
            }
        }

        Self { entries }
    }

    /// The window-filtered instants for one student; empty when never
    /// observed in the window.
    pub fn instants(&self, id: &StudentId) -> &[DateTime<Utc>] {
        self.entries
            .get(id)
            .map_or(&[], |entry| entry.instants.as_slice())
    }

    /// The best observed name for one student.
    pub fn observed_name(&self, id: &StudentId) -> Option<&str> {
        self.entries.get(id).and_then(|entry| entry.name.as_deref())
    }

    /// All observed students, ascending by ID.
    pub fn iter(&self) -> impl Iterator<Item = (&StudentId, &ObservedStudent)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentIdentity;
    use chrono::TimeZone;

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 2, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn window() -> ClassPeriodWindow {
        ClassPeriodWindow {
            start: ts(0),
            end: ts(90),
        }
    }

    fn snapshot(at: DateTime<Utc>, ids: &[&str]) -> PresenceSnapshot {
        PresenceSnapshot {
            at,
            course_id: None,
            teacher_id: None,
            classroom_id: "A-301".to_string(),
            period: None,
            students: ids
                .iter()
                .filter_map(|id| StudentIdentity::from_raw(id, None))
                .collect(),
        }
    }

    fn id(s: &str) -> StudentId {
        StudentId::new(s).unwrap()
    }

    #[test]
    fn instants_are_sorted_and_window_filtered() {
        let snapshots = vec![
            snapshot(ts(20), &["S001"]),
            snapshot(ts(-10), &["S001"]), // before window, dropped
            snapshot(ts(0), &["S001"]),
            snapshot(ts(120), &["S001"]), // past end + tolerance, dropped
        ];

        let timelines = Timelines::collect(&snapshots, &window(), Duration::minutes(10));
        assert_eq!(timelines.instants(&id("S001")), &[ts(0), ts(20)]);
    }

    #[test]
    fn end_tolerance_extends_the_closed_interval() {
        let snapshots = vec![snapshot(ts(100), &["S001"])]; // end + 10

        let timelines = Timelines::collect(&snapshots, &window(), Duration::minutes(10));
        assert_eq!(timelines.instants(&id("S001")), &[ts(100)]);
    }

    #[test]
    fn duplicate_instants_collapse() {
        let snapshots = vec![
            snapshot(ts(10), &["S001"]),
            snapshot(ts(10), &["S001"]),
            snapshot(ts(20), &["S001"]),
        ];

        let timelines = Timelines::collect(&snapshots, &window(), Duration::zero());
        assert_eq!(timelines.instants(&id("S001")), &[ts(10), ts(20)]);
    }

    #[test]
    fn out_of_window_students_still_counted_as_observed() {
        let snapshots = vec![snapshot(ts(-20), &["S001"])];

        let timelines = Timelines::collect(&snapshots, &window(), Duration::minutes(10));
        assert!(timelines.instants(&id("S001")).is_empty());
        assert_eq!(timelines.iter().count(), 1);
    }

    #[test]
    fn never_observed_student_has_empty_slice() {
        let timelines = Timelines::collect(&[], &window(), Duration::minutes(10));
        assert!(timelines.instants(&id("S999")).is_empty());
        assert!(timelines.is_empty());
    }

    #[test]
    fn first_observed_name_is_kept() {
        let mut early = snapshot(ts(0), &[]);
        early.students = vec![StudentIdentity::from_raw("S001", Some("Tanaka")).unwrap()];
        let mut late = snapshot(ts(10), &[]);
        late.students = vec![StudentIdentity::from_raw("S001", Some("Other")).unwrap()];

        let timelines = Timelines::collect(&[late, early], &window(), Duration::zero());
        assert_eq!(timelines.observed_name(&id("S001")), Some("Tanaka"));
    }
}
