//! Timestamp parsing and the continuous day coordinate.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Julian date of the Unix epoch (1970-01-01 00:00:00).
const UNIX_EPOCH_JULIAN: f64 = 2_440_587.5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Continuous time coordinate (fractional Julian days) used for slope arithmetic.
pub fn julian_day(ts: NaiveDateTime) -> f64 {
    UNIX_EPOCH_JULIAN + ts.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// `ts + by`, clamped to the representable range instead of overflowing.
pub fn saturating_shift(ts: NaiveDateTime, by: Duration) -> NaiveDateTime {
    match ts.checked_add_signed(by) {
        Some(shifted) => shifted,
        None if by < Duration::zero() => NaiveDateTime::MIN,
        None => NaiveDateTime::MAX,
    }
}

/// Parse a timestamp as written by loggers, spreadsheets or field forms.
///
/// Offsets in RFC 3339 input are folded into UTC; date-only values map to midnight.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FMTS: [&str; 9] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %I:%M:%S %p",
        "%m/%d/%Y %I:%M %p",
    ];
    const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

    let s = s.trim();
    for fmt in DATETIME_FMTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_utc());
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(ts) = d.and_hms_opt(0, 0, 0) {
                return Ok(ts);
            }
        }
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected e.g. YYYY-MM-DD HH:MM[:SS], MM/DD/YYYY HH:MM[:SS] or RFC 3339."
    ))
}
