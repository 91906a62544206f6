//! Timestamp rendering for log records
//!
//! Records carry ISO 8601 timestamps with microsecond precision. UTC output
//! uses the `Z` suffix rather than `+00:00`; local output carries the local
//! offset.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Time zone used when rendering record timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeZoneMode {
    /// `2025-01-08T10:30:45.123456Z`
    #[default]
    Utc,

    /// `2025-01-08T12:30:45.123456+02:00`
    Local,
}

impl TimeZoneMode {
    pub fn from_utc_flag(utc: bool) -> Self {
        if utc {
            TimeZoneMode::Utc
        } else {
            TimeZoneMode::Local
        }
    }

    /// Format a `DateTime<Utc>` as ISO 8601 in this zone
    ///
    /// # Examples
    ///
    /// ```
    /// use otel_logger_system::TimeZoneMode;
    /// use chrono::Utc;
    ///
    /// let timestamp = TimeZoneMode::Utc.format(&Utc::now());
    /// assert!(timestamp.ends_with('Z'));
    /// ```
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimeZoneMode::Utc => datetime.to_rfc3339_opts(SecondsFormat::Micros, true),
            TimeZoneMode::Local => datetime
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }
}
