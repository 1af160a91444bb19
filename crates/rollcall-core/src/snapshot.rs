//! Presence snapshot reconstruction from normalized events.
//!
//! A snapshot is one observed instant's list of present students in a room.
//! Sources disagree on where the student list lives and how it is encoded,
//! so location is an ordered probe over plausible nested paths and decoding
//! is dispatched on the raw value's shape (delimited string, array of
//! scalars/objects, or keyed object). All shapes unify through the same
//! identity normalizer and are deduplicated once at the end.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::NormalizedEvent;
use crate::normalize::value_to_string;
use crate::types::{StudentId, StudentIdentity};

/// Nested locations probed, in order, for the student list. The first one
/// yielding at least one resolvable student wins.
const STUDENT_LIST_PATHS: &[&str] = &[
    "snapshot.students",
    "attendance.students",
    "payload.students",
    "payload.presentStudents",
    "presentStudents",
    "students",
    "studentIds",
    "present",
];

const STUDENT_ID_KEYS: &[&str] = &[
    "studentId",
    "student_id",
    "id",
    "sid",
    "userId",
    "user_id",
    "code",
    "number",
    "deviceId",
];
const STUDENT_NAME_KEYS: &[&str] = &[
    "studentName",
    "student_name",
    "name",
    "displayName",
    "fullName",
];

const COURSE_KEYS: &[&str] = &[
    "courseId",
    "course_id",
    "course",
    "classId",
    "class_id",
    "lectureId",
];
const TEACHER_KEYS: &[&str] = &["teacherId", "teacher_id", "instructorId", "instructor_id"];
const ROOM_KEYS: &[&str] = &["roomId", "room_id", "classroomId", "classroom_id", "room"];
const PERIOD_KEYS: &[&str] = &["period", "periodNo", "period_no"];

const COURSE_TAG_PREFIXES: &[&str] = &["course:", "courseId:"];
const TEACHER_TAG_PREFIXES: &[&str] = &["teacher:", "teacherId:"];
const ROOM_TAG_PREFIXES: &[&str] = &["room:", "classroom:"];

/// One observed instant's presence in a classroom.
///
/// The classroom is required: an event with no resolvable room carries no
/// attendance information and never becomes a snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    pub classroom_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u8>,
    /// Deduplicated by student ID, first named entry winning.
    pub students: Vec<StudentIdentity>,
}

/// Post-hoc filter over snapshot tags. A snapshot passes when each set
/// filter either matches the corresponding tag or the tag is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u8>,
}

impl SnapshotFilter {
    pub fn matches(&self, snapshot: &PresenceSnapshot) -> bool {
        let tag_ok = |want: &Option<String>, have: Option<&str>| match (want, have) {
            (Some(w), Some(h)) => w == h,
            _ => true,
        };
        tag_ok(&self.course_id, snapshot.course_id.as_deref())
            && tag_ok(&self.teacher_id, snapshot.teacher_id.as_deref())
            && tag_ok(&self.classroom_id, Some(&snapshot.classroom_id))
            && (self.period.is_none() || snapshot.period.is_none() || self.period == snapshot.period)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reconstructs snapshots from a sequence of normalized events: one pass,
/// order-preserving. Events yielding zero students or no room are dropped.
pub fn build_snapshots(events: &[NormalizedEvent]) -> Vec<PresenceSnapshot> {
    events
        .iter()
        .filter_map(|event| {
            let students = extract_students(&event.meta);
            if students.is_empty() {
                tracing::debug!(at = %event.timestamp, "event has no resolvable students, skipping");
                return None;
            }

            let classroom_id = pick_meta_string(&event.meta, ROOM_KEYS)
                .or_else(|| tag_value(&event.tags, ROOM_TAG_PREFIXES));
            let Some(classroom_id) = classroom_id else {
                tracing::debug!(at = %event.timestamp, "event has no classroom, skipping");
                return None;
            };

            let course_id = pick_meta_string(&event.meta, COURSE_KEYS)
                .or_else(|| tag_value(&event.tags, COURSE_TAG_PREFIXES));
            let teacher_id = pick_meta_string(&event.meta, TEACHER_KEYS)
                .or_else(|| tag_value(&event.tags, TEACHER_TAG_PREFIXES));
            let period = pick_meta_period(&event.meta).or_else(|| period_from_tags(&event.tags));

            Some(PresenceSnapshot {
                at: event.timestamp,
                course_id,
                teacher_id,
                classroom_id,
                period,
                students,
            })
        })
        .collect()
}

/// Probes the candidate nested paths for a student list; later candidates
/// are not consulted once one yields students.
fn extract_students(meta: &Map<String, Value>) -> Vec<StudentIdentity> {
    for path in STUDENT_LIST_PATHS {
        if let Some(value) = get_path(meta, path) {
            let students = decode_student_list(value);
            if !students.is_empty() {
                return students;
            }
        }
    }
    Vec::new()
}

/// Shape-dispatched decoding of the located student-list value.
fn decode_student_list(value: &Value) -> Vec<StudentIdentity> {
    let entries = match value {
        Value::String(s) => decode_delimited(s),
        Value::Array(items) => items.iter().filter_map(decode_student_entry).collect(),
        Value::Object(map) => decode_keyed_object(map),
        _ => Vec::new(),
    };
    dedupe_students(entries)
}

/// Whitespace/comma-delimited bare IDs: `"S001 S002, S003"`.
fn decode_delimited(s: &str) -> Vec<StudentIdentity> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|token| StudentIdentity::from_raw(token, None))
        .collect()
}

/// One array element: a bare ID string or an object probed via the ID and
/// name key candidates.
fn decode_student_entry(value: &Value) -> Option<StudentIdentity> {
    match value {
        Value::String(s) => StudentIdentity::from_raw(s, None),
        Value::Object(map) => {
            let id = STUDENT_ID_KEYS
                .iter()
                .filter_map(|k| map.get(*k))
                .find_map(value_to_string)?;
            let name = STUDENT_NAME_KEYS
                .iter()
                .filter_map(|k| map.get(*k))
                .find_map(value_to_string);
            StudentIdentity::from_raw(&id, name.as_deref())
        }
        _ => None,
    }
}

/// A keyed object: scalar values are IDs with the key as advisory name;
/// object values carry nested ID/name keys, falling back to the map key as
/// the ID.
fn decode_keyed_object(map: &Map<String, Value>) -> Vec<StudentIdentity> {
    map.iter()
        .filter_map(|(key, value)| match value {
            Value::String(_) | Value::Number(_) => {
                let id = value_to_string(value)?;
                let name = (key != &id).then(|| key.as_str());
                StudentIdentity::from_raw(&id, name)
            }
            Value::Object(inner) => {
                let id = STUDENT_ID_KEYS
                    .iter()
                    .filter_map(|k| inner.get(*k))
                    .find_map(value_to_string)
                    .unwrap_or_else(|| key.clone());
                let name = STUDENT_NAME_KEYS
                    .iter()
                    .filter_map(|k| inner.get(*k))
                    .find_map(value_to_string);
                StudentIdentity::from_raw(&id, name.as_deref())
            }
            _ => None,
        })
        .collect()
}

/// Deduplicates by student ID, keeping the first name-bearing entry.
pub(crate) fn dedupe_students(entries: Vec<StudentIdentity>) -> Vec<StudentIdentity> {
    let mut order: Vec<StudentIdentity> = Vec::with_capacity(entries.len());
    let mut seen: HashMap<StudentId, usize> = HashMap::new();
    for entry in entries {
        match seen.get(&entry.id) {
            Some(&idx) => {
                if order[idx].name.is_none() {
                    order[idx].merge_name(entry.name.as_deref());
                }
            }
            None => {
                seen.insert(entry.id.clone(), order.len());
                order.push(entry);
            }
        }
    }
    order
}

/// Dotted-path lookup into structured metadata.
fn get_path<'a>(meta: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = meta.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn pick_meta_string(meta: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| get_path(meta, k))
        .find_map(value_to_string)
}

fn pick_meta_period(meta: &Map<String, Value>) -> Option<u8> {
    PERIOD_KEYS
        .iter()
        .filter_map(|k| get_path(meta, k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

/// First tag carrying one of the given prefixes, with the prefix stripped.
fn tag_value(tags: &[String], prefixes: &[&str]) -> Option<String> {
    tags.iter().find_map(|tag| {
        prefixes
            .iter()
            .find_map(|prefix| tag.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
            .map(String::from)
    })
}

/// Matches a `period[:=]<digit>` marker anywhere in a tag, case-insensitive
/// on the word.
fn period_from_tags(tags: &[String]) -> Option<u8> {
    tags.iter().find_map(|tag| {
        let lower = tag.to_lowercase();
        lower.match_indices("period").find_map(|(idx, _)| {
            let rest = &lower[idx + "period".len()..];
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(':' | '='), Some(d)) if d.is_ascii_digit() => {
                    d.to_digit(10).and_then(|n| u8::try_from(n).ok())
                }
                _ => None,
            }
        })
    })
}
