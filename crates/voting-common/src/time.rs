use chrono::{DateTime, SecondsFormat, Utc};

/// Render a UTC instant as ISO-8601 with millisecond precision and a `Z`
/// suffix, e.g. `2024-04-15T15:04:49.679Z`.
pub fn format_iso8601(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso8601() -> String {
    format_iso8601(Utc::now())
}

/// Current time, clamped so it never sorts before `previous`.
///
/// Unparseable input is ignored and the current time is returned.
pub fn now_not_before(previous: &str) -> String {
    let now = Utc::now();
    match DateTime::parse_from_rfc3339(previous) {
        Ok(prev) if prev.with_timezone(&Utc) > now => format_iso8601(prev.with_timezone(&Utc)),
        _ => format_iso8601(now),
    }
}
