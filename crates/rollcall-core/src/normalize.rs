//! Heuristic field extraction from arbitrarily-shaped event payloads.
//!
//! Ingest sources do not share a schema: the same logical field arrives
//! under any of several synonymous keys, timestamps come as epoch numbers
//! or calendar strings, and tags come as arrays or comma-joined strings.
//! Extraction tries an ordered candidate list per field and takes the first
//! present, non-null, non-empty value. Candidate lists are data, not
//! branching code, so new synonyms are additive.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::event::{LevelPolicy, NormalizedEvent, normalize_level};

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time", "ts", "@timestamp", "date", "datetime"];
const HOST_KEYS: &[&str] = &["host", "hostname", "source", "computer", "machine"];
const APP_KEYS: &[&str] = &["app", "programname", "proc", "process", "appname"];
const PID_KEYS: &[&str] = &["pid", "process_id"];
const LEVEL_KEYS: &[&str] = &["level", "severity", "pri"];
const MESSAGE_KEYS: &[&str] = &["message", "msg", "log", "content", "text"];
const TAG_KEYS: &[&str] = &["tags", "tag"];

/// Keys consumed by extraction; everything else lands in `meta`.
const CONSUMED_KEYS: &[&str] = &[
    "timestamp",
    "time",
    "ts",
    "@timestamp",
    "date",
    "datetime",
    "host",
    "hostname",
    "source",
    "computer",
    "machine",
    "app",
    "programname",
    "proc",
    "process",
    "appname",
    "pid",
    "process_id",
    "facility",
    "pri",
    "priority",
    "level",
    "severity",
    "message",
    "msg",
    "log",
    "content",
    "text",
    "tags",
    "tag",
];

/// Normalizes one raw payload. Never fails: fields that cannot be parsed
/// are treated as absent, and a missing timestamp defaults to `received_at`.
pub fn normalize_event(
    raw: &Value,
    received_at: DateTime<Utc>,
    policy: LevelPolicy,
) -> NormalizedEvent {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let timestamp = pick_timestamp(obj).unwrap_or(received_at);
    let host = pick_string(obj, HOST_KEYS);
    let app = pick_string(obj, APP_KEYS);
    let pid = pick_number(obj, PID_KEYS);
    let facility = pick_facility(obj);
    let level = pick_raw(obj, LEVEL_KEYS)
        .and_then(value_to_string)
        .and_then(|s| normalize_level(&s, policy));
    let message = pick_string(obj, MESSAGE_KEYS).unwrap_or_default();
    let tags = pick_tags(obj, TAG_KEYS);
    let meta = strip_consumed(obj);

    NormalizedEvent {
        received_at,
        timestamp,
        host,
        app,
        pid,
        level,
        facility,
        message,
        tags,
        meta,
    }
}

/// Normalizes a whole ingest payload: an array yields one event per
/// element, a single object yields one event, anything else yields none.
pub fn normalize_payload(
    payload: &Value,
    received_at: DateTime<Utc>,
    policy: LevelPolicy,
) -> Vec<NormalizedEvent> {
    match payload {
        Value::Array(items) => items
            .iter()
            .map(|item| normalize_event(item, received_at, policy))
            .collect(),
        Value::Object(_) => vec![normalize_event(payload, received_at, policy)],
        other => {
            tracing::debug!(kind = %value_kind(other), "ignoring non-object ingest payload");
            Vec::new()
        }
    }
}

/// First present, non-null value among `keys`.
fn pick_raw<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// First candidate that stringifies to something non-empty.
pub(crate) fn pick_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(value_to_string)
}

/// First candidate that parses as an integer.
pub(crate) fn pick_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Scalar-to-string coercion used by candidate picks. Empty strings count
/// as absent so a later candidate can still win.
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Tags come as an array (each element stringified) or a comma-separated
/// string (trimmed, empty tokens removed).
fn pick_tags(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Array(items)) => {
                return items.iter().filter_map(value_to_string).collect();
            }
            Some(Value::String(s)) if !s.is_empty() => {
                return s
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();
            }
            _ => {}
        }
    }
    Vec::new()
}

/// A combined `pri`/`priority` like `auth.info` carries the facility as its
/// prefix; otherwise an explicit `facility` field is used.
fn pick_facility(obj: &Map<String, Value>) -> Option<String> {
    let pri = pick_raw(obj, &["pri", "priority"]);
    if let Some(Value::String(s)) = pri {
        if let Some((prefix, _)) = s.split_once('.') {
            if !prefix.is_empty() {
                return Some(prefix.to_string());
            }
        }
    }
    pick_string(obj, &["facility"])
}

/// Tries each timestamp candidate in order; invalid ones are skipped.
fn pick_timestamp(obj: &Map<String, Value>) -> Option<DateTime<Utc>> {
    TIMESTAMP_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .find_map(coerce_timestamp)
}

/// Best-effort coercion of one value to an instant.
///
/// Numbers below 10^12 are epoch seconds, above are epoch milliseconds.
/// Strings are tried as RFC 3339 first, then a few common calendar shapes
/// (naive forms are taken as UTC).
pub(crate) fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if !raw.is_finite() || raw <= 0.0 {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let millis = if raw < 1e12 {
                (raw * 1000.0).round() as i64
            } else {
                raw.round() as i64
            };
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Everything not consumed by extraction, preserved for snapshot probing.
fn strip_consumed(obj: &Map<String, Value>) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !CONSUMED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Level;
    use serde_json::json;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn extracts_common_fields() {
        let raw = json!({
            "timestamp": "2025-12-02T08:50:00Z",
            "hostname": "ap-301",
            "app": "presence-agent",
            "pid": 4321,
            "severity": "Warning",
            "pri": "auth.info",
            "msg": "scan complete",
            "tags": "room:A-301, period:1",
            "extra": {"k": "v"},
        });

        let event = normalize_event(&raw, received(), LevelPolicy::Passthrough);
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 12, 2, 8, 50, 0).unwrap()
        );
        assert_eq!(event.host.as_deref(), Some("ap-301"));
        assert_eq!(event.app.as_deref(), Some("presence-agent"));
        assert_eq!(event.pid, Some(4321));
        // `severity` outranks `pri` in the level candidate order
        assert_eq!(event.level, Some(Level::Warn));
        assert_eq!(event.facility.as_deref(), Some("auth"));
        assert_eq!(event.message, "scan complete");
        assert_eq!(event.tags, vec!["room:A-301", "period:1"]);
        assert!(event.meta.contains_key("extra"));
        assert!(!event.meta.contains_key("hostname"));
    }

    #[test]
    fn normalize_never_fails_on_garbage() {
        let raw = json!({
            "timestamp": "not a date",
            "pid": "also not a number",
            "level": 42,
        });
        let event = normalize_event(&raw, received(), LevelPolicy::Passthrough);
        assert_eq!(event.timestamp, received());
        assert_eq!(event.pid, None);
        // a numeric level stringifies and falls through as passthrough
        assert_eq!(event.level, Some(Level::Other("42".to_string())));
    }

    #[test]
    fn missing_timestamp_defaults_to_received_at() {
        let event = normalize_event(&json!({"msg": "hi"}), received(), LevelPolicy::Null);
        assert_eq!(event.timestamp, received());
        assert_eq!(event.message, "hi");
    }

    #[test]
    fn invalid_timestamp_candidate_is_skipped_not_fatal() {
        let raw = json!({
            "timestamp": "garbage",
            "time": 1_764_665_400_u64, // epoch seconds
        });
        let event = normalize_event(&raw, received(), LevelPolicy::Null);
        assert_eq!(
            event.timestamp,
            Utc.timestamp_opt(1_764_665_400, 0).unwrap()
        );
    }

    #[test]
    fn epoch_millis_detected_above_threshold() {
        let raw = json!({"ts": 1_764_665_400_000_i64});
        let event = normalize_event(&raw, received(), LevelPolicy::Null);
        assert_eq!(
            event.timestamp,
            Utc.timestamp_opt(1_764_665_400, 0).unwrap()
        );
    }

    #[test]
    fn naive_datetime_strings_parse_as_utc() {
        let raw = json!({"datetime": "2025-12-02 08:50:00"});
        let event = normalize_event(&raw, received(), LevelPolicy::Null);
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 12, 2, 8, 50, 0).unwrap()
        );
    }

    #[test]
    fn empty_string_candidate_loses_to_later_key() {
        let raw = json!({"host": "", "hostname": "gw-1"});
        let event = normalize_event(&raw, received(), LevelPolicy::Null);
        assert_eq!(event.host.as_deref(), Some("gw-1"));
    }

    #[test]
    fn absent_identifier_is_none_not_empty() {
        let event = normalize_event(&json!({}), received(), LevelPolicy::Null);
        assert_eq!(event.host, None);
        assert_eq!(event.app, None);
    }

    #[test]
    fn tags_from_array_stringify_elements() {
        let raw = json!({"tags": ["a", 2, "c"]});
        let event = normalize_event(&raw, received(), LevelPolicy::Null);
        assert_eq!(event.tags, vec!["a", "2", "c"]);
    }

    #[test]
    fn facility_from_explicit_key_when_pri_not_dotted() {
        let raw = json!({"pri": "notice", "facility": "daemon"});
        let event = normalize_event(&raw, received(), LevelPolicy::Null);
        assert_eq!(event.facility.as_deref(), Some("daemon"));
    }

    #[test]
    fn payload_array_yields_one_event_each() {
        let payload = json!([{"msg": "a"}, {"msg": "b"}]);
        let events = normalize_payload(&payload, received(), LevelPolicy::Null);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "a");
        assert_eq!(events[1].message, "b");
    }

    #[test]
    fn payload_scalar_yields_nothing() {
        let events = normalize_payload(&json!("hello"), received(), LevelPolicy::Null);
        assert!(events.is_empty());
    }
}
