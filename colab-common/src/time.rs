//! Timestamp utilities
//!
//! All timestamps are stored as RFC 3339 UTC strings with millisecond
//! precision so that lexical order matches chronological order.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way it is stored in the database
pub fn to_db_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in database format
pub fn now_string() -> String {
    to_db_string(now())
}

/// Database-format timestamp `hours` from now
///
/// Offsets that leave chrono's representable range are `InvalidInput`.
pub fn hours_from_now(hours: i64) -> Result<String> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| now().checked_add_signed(delta))
        .map(to_db_string)
        .ok_or_else(|| Error::InvalidInput(format!("{} hours from now is out of range", hours)))
}
