//! Attendance inference engine.
//!
//! This crate contains the fundamental types and logic for:
//! - Normalization: heuristic field extraction from schemaless event payloads
//! - Snapshots: reconstructing per-room presence from normalized events
//! - Classification: turning per-student timelines into attendance statuses

pub mod classify;
pub mod engine;
pub mod event;
pub mod normalize;
pub mod period;
pub mod roster;
pub mod snapshot;
pub mod timeline;
mod types;

pub use classify::{
    AttendanceRecord, AttendanceReport, AttendanceStats, ClassifyConfig, build_report,
    classify_student,
};
pub use engine::{
    AttendanceRequest, AttendanceResponse, EngineConfig, ReportContext, run_attendance,
};
pub use event::{Level, LevelPolicy, NormalizedEvent};
pub use normalize::{normalize_event, normalize_payload};
pub use period::{ClassPeriodWindow, PeriodError, PeriodTable};
pub use roster::{RosterEntry, resolve_roster};
pub use snapshot::{PresenceSnapshot, SnapshotFilter, build_snapshots};
pub use timeline::Timelines;
pub use types::{AttendanceStatus, RosterSource, StudentId, StudentIdentity, ValidationError};
