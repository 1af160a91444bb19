//! Core type definitions with validation.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty (or whitespace only).
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid attendance status value.
    #[error("invalid attendance status: {value}")]
    InvalidStatus { value: String },
}

/// A validated student identifier.
///
/// Student IDs are non-empty after trimming; surrounding whitespace is
/// stripped on construction. Matching is byte-exact and never case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    /// Creates a new ID after trimming and validation.
    pub fn new(id: impl AsRef<str>) -> Result<Self, ValidationError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(ValidationError::Empty {
                field: "student ID",
            });
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StudentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StudentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A student as observed or rostered.
///
/// Identity is the `id` alone: equality, hashing, and ordering ignore the
/// name, which is advisory display metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
    #[serde(rename = "studentId")]
    pub id: StudentId,
    #[serde(rename = "studentName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StudentIdentity {
    /// Builds an identity from raw strings, trimming both fields.
    ///
    /// Returns `None` when the ID is empty after trimming; an empty or
    /// whitespace-only name becomes `None`.
    pub fn from_raw(id: &str, name: Option<&str>) -> Option<Self> {
        let id = StudentId::new(id).ok()?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);
        Some(Self { id, name })
    }

    /// Fills in a missing name from `other` without changing identity.
    pub fn merge_name(&mut self, other: Option<&str>) {
        if self.name.is_none() {
            self.name = other
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from);
        }
    }
}

impl PartialEq for StudentIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StudentIdentity {}

impl Hash for StudentIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for StudentIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StudentIdentity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

/// Classification outcome for one roster student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Late,
    EarlyLeave,
    Absent,
}

impl AttendanceStatus {
    /// Wire string for API payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::EarlyLeave => "early-leave",
            Self::Absent => "absent",
        }
    }

    /// Human-facing display label (campus convention).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Present => "出席",
            Self::Late => "遅刻",
            Self::EarlyLeave => "途中退出",
            Self::Absent => "欠席",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "late" => Ok(Self::Late),
            "early-leave" => Ok(Self::EarlyLeave),
            "absent" => Ok(Self::Absent),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where the authoritative roster came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterSource {
    /// Supplied by the caller with the request.
    Request,
    /// Inferred as the union of all observed students.
    Snapshots,
}

impl RosterSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Snapshots => "snapshots",
        }
    }
}

impl fmt::Display for RosterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
