//! # Temporal Types — UTC Timestamps and the Injectable Clock
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds, and the
//! `Clock` trait through which every "now" in Stamp is obtained.
//!
//! ## Determinism Invariant
//!
//! The normalizer bumps the `updated` date and the translator stamps
//! diagnostic provenance. Both take a `Clock` instead of reading ambient
//! time, so a `FixedClock` makes whole runs reproducible and lets the
//! idempotence property `normalize(normalize(m)) == normalize(m)` be tested
//! directly.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StampError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// Renders as `YYYY-MM-DDTHH:MM:SSZ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string with a `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns `StampError::InvalidTimestamp` for malformed input or any
    /// offset other than `Z`.
    pub fn parse(s: &str) -> Result<Self, StampError> {
        if !s.ends_with('Z') {
            return Err(StampError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }

        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| StampError::InvalidTimestamp(format!("{s:?}: {e}")))?;

        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The calendar date of this instant in UTC.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Source of the current time.
///
/// Implementations must be cheap to call; the orchestrator samples the
/// clock once per batch for provenance and once per normalization.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;

    /// The current UTC calendar date, rendered into `updated` fields.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock frozen at one instant. Used by tests and reproducible runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    /// Freeze the clock at `at`.
    pub fn new(at: Timestamp) -> Self {
        Self(at)
    }

    /// Freeze the clock at midnight UTC of the given date.
    pub fn at_date(date: NaiveDate) -> Self {
        let dt = date.and_time(NaiveTime::default()).and_utc();
        Self(Timestamp::from_utc(dt))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Parse a metadata calendar date (`YYYY-MM-DD`).
///
/// A full RFC 3339 timestamp is also accepted and reduced to its UTC date,
/// since authors occasionally write one into `created`/`updated`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}
