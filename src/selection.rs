// used for the relative date tokens and timestamp parsing
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::{PimError, Result};

pub const START_OF_NEXT_WEEK: &str = "START_OF_NEXT_WEEK";
pub const END_OF_NEXT_WEEK: &str = "END_OF_NEXT_WEEK";

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

lazy_static! {
    static ref ISO_TIMESTAMP: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}T.*Z$").unwrap();
}

/// Turns one backend token into the value handed to the store.
///
/// Tokens are tried, in order, as a LIKE pattern (anything containing `%`),
/// a UTC timestamp (`YYYY-MM-DDThh:mm:ssZ`, answered in epoch milliseconds)
/// and one of the relative week tokens. Anything else passes through.
pub fn resolve_selection_arg(token: &str, now: DateTime<Utc>) -> Result<String> {
    let s = token.trim();
    if s.contains('%') {
        return Ok(s.to_string());
    }
    if ISO_TIMESTAMP.is_match(s) {
        return parse_iso_timestamp(s).map(|t| t.timestamp_millis().to_string());
    }
    let resolved = match s.to_uppercase().as_str() {
        START_OF_NEXT_WEEK => start_of_next_week(now).timestamp_millis().to_string(),
        END_OF_NEXT_WEEK => end_of_next_week(now).timestamp_millis().to_string(),
        _ => s.to_string(),
    };
    if resolved != s {
        debug!(token = s, value = %resolved, "resolved relative date token");
    }
    Ok(resolved)
}

pub fn parse_iso_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ISO_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|e| PimError::MalformedTimestamp(format!("{s}: {e}")))
}

/// Monday 00:00 UTC of the week that contains `now` plus seven days.
pub fn start_of_next_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = (now + Duration::days(7)).date_naive();
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    monday.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of the week starting at [`start_of_next_week`].
pub fn end_of_next_week(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_next_week(now) + Duration::days(7) - Duration::milliseconds(1)
}
