//! Cell coercion for string-encoded uploads
//!
//! The upstream cleaner serializes every cell as text. Dates follow a single
//! ISO-8601 contract (year first, never day first); numbers may carry
//! currency symbols or thousands separators.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Everything that cannot be part of a plain decimal number
static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.\-]").unwrap());

/// Textual null markers emitted by the cleaner (`str(NaN)`, `str(NaT)`, ...)
const NULL_MARKERS: [&str; 6] = ["", "nan", "NaN", "NaT", "None", "null"];

/// Naive datetime layouts accepted, most specific first
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// True for cells that carry no value
pub fn is_null_marker(raw: &str) -> bool {
    NULL_MARKERS.contains(&raw.trim())
}

/// Clean a categorical cell: trimmed, `None` for null markers
pub fn coerce_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a numeric cell after stripping non-numeric characters
///
/// Returns `None` when nothing parsable is left; callers store zero in that
/// case, never drop the row.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return None;
    }

    let cleaned = NON_NUMERIC.replace_all(trimmed, "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric coercion used at ingestion: unparsable becomes zero
pub fn coerce_number(raw: &str) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

/// Parse a date cell under the ISO contract
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS[.fff]]` (space or `T`) and
/// RFC 3339 with offset (kept as wall-clock time). Anything else is `None`.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Interpret a numeric date cell as epoch milliseconds
pub fn datetime_from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .unwrap()
    }

    #[test]
    fn test_number_strips_currency_and_separators() {
        assert_eq!(parse_number("Rp 1,250,000"), Some(1_250_000.0));
        assert_eq!(parse_number("$12.50"), Some(12.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number(" 42 "), Some(42.0));
    }

    #[test]
    fn test_unparsable_number_becomes_zero() {
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(coerce_number("abc"), 0.0);
        assert_eq!(coerce_number(""), 0.0);
    }

    #[test]
    fn test_datetime_iso_variants() {
        assert_eq!(
            parse_datetime("2024-01-15 13:45:00"),
            Some(ymd_hms(2024, 1, 15, 13, 45, 0))
        );
        assert_eq!(
            parse_datetime("2024-01-15T13:45:00.250"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .and_then(|d| d.and_hms_milli_opt(13, 45, 0, 250))
        );
        assert_eq!(
            parse_datetime("2024-01-15 09:05"),
            Some(ymd_hms(2024, 1, 15, 9, 5, 0))
        );
        assert_eq!(
            parse_datetime("2024-01-15"),
            Some(ymd_hms(2024, 1, 15, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime("2024-01-15T13:45:00+07:00"),
            Some(ymd_hms(2024, 1, 15, 13, 45, 0))
        );
    }

    #[test]
    fn test_datetime_rejects_day_first_and_nulls() {
        assert_eq!(parse_datetime("15/01/2024"), None);
        assert_eq!(parse_datetime("NaT"), None);
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn test_text_null_markers() {
        assert_eq!(coerce_text("  Latte "), Some("Latte".to_string()));
        assert_eq!(coerce_text("nan"), None);
        assert_eq!(coerce_text("   "), None);
    }

    #[test]
    fn test_epoch_millis() {
        assert_eq!(
            datetime_from_epoch_millis(1_704_067_200_000),
            Some(ymd_hms(2024, 1, 1, 0, 0, 0))
        );
    }
}
