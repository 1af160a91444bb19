//! Roster resolution: who was expected to attend.

use serde::{Deserialize, Serialize};

use crate::snapshot::{PresenceSnapshot, dedupe_students};
use crate::types::{RosterSource, StudentIdentity};

/// One caller-supplied roster row, before identity normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

/// Resolves the authoritative roster.
///
/// A non-empty caller roster wins verbatim (normalized and deduplicated,
/// named entries preferred). Otherwise the roster is the union of every
/// student observed across the snapshots, sorted by ID ascending.
pub fn resolve_roster(
    request_roster: &[RosterEntry],
    snapshots: &[PresenceSnapshot],
) -> (Vec<StudentIdentity>, RosterSource) {
    let normalized: Vec<StudentIdentity> = request_roster
        .iter()
        .filter_map(|entry| {
            StudentIdentity::from_raw(&entry.student_id, entry.student_name.as_deref())
        })
        .collect();

    if !normalized.is_empty() {
        return (dedupe_students(normalized), RosterSource::Request);
    }

    let observed: Vec<StudentIdentity> = snapshots
        .iter()
        .flat_map(|snap| snap.students.iter().cloned())
        .collect();
    let mut roster = dedupe_students(observed);
    roster.sort();
    (roster, RosterSource::Snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot(students: &[(&str, Option<&str>)]) -> PresenceSnapshot {
        PresenceSnapshot {
            at: Utc.with_ymd_and_hms(2025, 12, 2, 9, 0, 0).unwrap(),
            course_id: None,
            teacher_id: None,
            classroom_id: "A-301".to_string(),
            period: None,
            students: students
                .iter()
                .filter_map(|(id, name)| StudentIdentity::from_raw(id, *name))
                .collect(),
        }
    }

    #[test]
    fn request_roster_wins_when_non_empty() {
        let request = vec![RosterEntry {
            student_id: "S001".to_string(),
            student_name: None,
        }];
        let snapshots = vec![snapshot(&[("S002", None)])];

        let (roster, source) = resolve_roster(&request, &snapshots);
        assert_eq!(source, RosterSource::Request);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id.as_str(), "S001");
    }

    #[test]
    fn request_roster_normalizes_and_dedupes() {
        let request = vec![
            RosterEntry {
                student_id: " S001 ".to_string(),
                student_name: None,
            },
            RosterEntry {
                student_id: "S001".to_string(),
                student_name: Some("Tanaka".to_string()),
            },
            RosterEntry {
                student_id: "   ".to_string(),
                student_name: Some("no id".to_string()),
            },
        ];

        let (roster, source) = resolve_roster(&request, &[]);
        assert_eq!(source, RosterSource::Request);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id.as_str(), "S001");
        assert_eq!(roster[0].name.as_deref(), Some("Tanaka"));
    }

    #[test]
    fn empty_request_falls_back_to_snapshot_union() {
        let snapshots = vec![
            snapshot(&[("S003", None), ("S001", Some("Tanaka"))]),
            snapshot(&[("S002", None), ("S001", None)]),
        ];

        let (roster, source) = resolve_roster(&[], &snapshots);
        assert_eq!(source, RosterSource::Snapshots);
        let ids: Vec<_> = roster.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S001", "S002", "S003"]);
        assert_eq!(roster[0].name.as_deref(), Some("Tanaka"));
    }

    #[test]
    fn whitespace_only_request_roster_counts_as_empty() {
        let request = vec![RosterEntry {
            student_id: "  ".to_string(),
            student_name: None,
        }];
        let snapshots = vec![snapshot(&[("S001", None)])];

        let (roster, source) = resolve_roster(&request, &snapshots);
        assert_eq!(source, RosterSource::Snapshots);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn no_roster_no_snapshots_is_valid_and_empty() {
        let (roster, source) = resolve_roster(&[], &[]);
        assert_eq!(source, RosterSource::Snapshots);
        assert!(roster.is_empty());
    }
}
