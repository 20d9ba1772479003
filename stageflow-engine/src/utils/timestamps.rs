//! Timestamp helpers.

use chrono::{DateTime, Utc};

/// Wall-clock timestamp used for history entries and snapshots.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use stageflow_engine::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&Utc::now())
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp with microsecond precision and an explicit offset.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Parses an RFC 3339 / ISO 8601 string into a UTC timestamp.
///
/// # Errors
///
/// Returns the chrono parse error when the input is not RFC 3339.
pub fn parse_iso8601(input: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(input.trim()).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_roundtrips_through_parse() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let formatted = format_iso8601(&dt);
        assert_eq!(formatted, "2024-03-01T12:30:00.000000+00:00");
        assert_eq!(parse_iso8601(&formatted).unwrap(), dt);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_iso8601("yesterday").is_err());
    }
}
