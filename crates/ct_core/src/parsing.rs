use chrono::DateTime;

/// Parses an ISO 8601 timestamp into the display format shown on article
/// cards, `13/12/2023, 14:05:00`. The offset carried by the input is kept
/// as-is. Values the backend failed to format are passed through
/// untouched rather than dropped.
pub fn parse_date_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.format("%-d/%-m/%Y, %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}
