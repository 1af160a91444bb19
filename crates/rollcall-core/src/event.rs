//! Normalized events and severity levels.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical severity levels after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    /// Unrecognized input carried through under [`LevelPolicy::Passthrough`].
    Other(String),
}

impl Level {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Level {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "fatal" => Self::Fatal,
            _ => Self::Other(s),
        })
    }
}

/// What to do with severity strings the synonym table does not recognize.
///
/// The two behaviors both exist in the wild; this is deployment
/// configuration rather than a hardcoded choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelPolicy {
    /// Keep the lower-cased original as [`Level::Other`].
    #[default]
    Passthrough,
    /// Treat unrecognized values as absent.
    Null,
}

/// Maps a free-form severity value onto a canonical level.
///
/// Input is lower-cased; a `facility.severity` combined form keeps only the
/// part after the last dot. Unrecognized values fall back per `policy`.
pub fn normalize_level(input: &str, policy: LevelPolicy) -> Option<Level> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    let last = s.rsplit('.').next().unwrap_or(s.as_str());

    match last {
        "trace" | "debug" => Some(Level::Debug),
        "information" | "info" | "notice" => Some(Level::Info),
        "warning" | "warn" => Some(Level::Warn),
        "error" | "err" => Some(Level::Error),
        "critical" | "crit" | "alert" | "emergency" | "emerg" | "fatal" => Some(Level::Fatal),
        other => match policy {
            LevelPolicy::Passthrough => Some(Level::Other(other.to_string())),
            LevelPolicy::Null => None,
        },
    }
}

/// One ingested event after heuristic field extraction.
///
/// `meta` keeps every input field the extractor did not consume; snapshot
/// reconstruction reads nested payload data out of it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// When the event was received by the ingestion boundary.
    pub received_at: DateTime<Utc>,
    /// The event's own timestamp; defaults to `received_at` when no
    /// timestamp-like field parses.
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Unconsumed remainder of the raw payload, order preserved.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}
