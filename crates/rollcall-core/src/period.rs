//! Class period timetable and absolute window resolution.
//!
//! Periods are fixed clock-time slots in the campus timezone; combining a
//! slot with a calendar date yields the absolute UTC window the classifier
//! evaluates against.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

/// Minutes fetched before the period start to catch boundary snapshots.
pub const FETCH_MARGIN_BEFORE_MIN: i64 = 30;
/// Minutes fetched after the period end.
pub const FETCH_MARGIN_AFTER_MIN: i64 = 15;

/// Errors resolving a period window.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// The requested period number is not in the timetable.
    #[error("unknown period: {0}")]
    UnknownPeriod(u8),
}

/// Absolute start/end instants of one class period on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ClassPeriodWindow {
    /// The widened range the surrounding system fetches events for:
    /// 30 minutes before start, 15 minutes after end.
    #[must_use]
    pub fn fetch_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start - Duration::minutes(FETCH_MARGIN_BEFORE_MIN),
            self.end + Duration::minutes(FETCH_MARGIN_AFTER_MIN),
        )
    }
}

/// The campus timetable: period number to clock-time slot, plus the fixed
/// institutional UTC offset.
#[derive(Debug, Clone)]
pub struct PeriodTable {
    slots: Vec<(u8, NaiveTime, NaiveTime)>,
    tz_offset: FixedOffset,
}

impl Default for PeriodTable {
    /// Five periods spanning a single academic day at UTC+09:00.
    fn default() -> Self {
        let slot = |n, sh, sm, eh, em| {
            (
                n,
                NaiveTime::from_hms_opt(sh, sm, 0).expect("valid timetable clock time"),
                NaiveTime::from_hms_opt(eh, em, 0).expect("valid timetable clock time"),
            )
        };
        Self {
            slots: vec![
                slot(1, 8, 50, 10, 20),
                slot(2, 10, 40, 12, 10),
                slot(3, 13, 20, 14, 50),
                slot(4, 15, 10, 16, 40),
                slot(5, 17, 0, 18, 30),
            ],
            tz_offset: FixedOffset::east_opt(9 * 3600).expect("+09:00 is a valid offset"),
        }
    }
}

impl PeriodTable {
    /// Builds a table with the same five slots at a different UTC offset.
    #[must_use]
    pub fn with_offset(tz_offset: FixedOffset) -> Self {
        Self {
            tz_offset,
            ..Self::default()
        }
    }

    /// Resolves the absolute window of `period` on `date`.
    ///
    /// An unknown period number is a hard input error: it fails before any
    /// attendance computation proceeds.
    pub fn bounds(&self, date: NaiveDate, period: u8) -> Result<ClassPeriodWindow, PeriodError> {
        let (_, start, end) = self
            .slots
            .iter()
            .find(|(n, _, _)| *n == period)
            .ok_or(PeriodError::UnknownPeriod(period))?;

        let to_utc = |time: NaiveTime| {
            self.tz_offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .expect("fixed offsets have no DST gaps")
                .with_timezone(&Utc)
        };

        Ok(ClassPeriodWindow {
            start: to_utc(*start),
            end: to_utc(*end),
        })
    }

    /// The institutional UTC offset this table resolves against.
    #[must_use]
    pub const fn tz_offset(&self) -> FixedOffset {
        self.tz_offset
    }
}
