use chrono::{DateTime, SecondsFormat, Utc};

/// Round to 2 decimal places, half away from zero.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a wall-clock time the way browsers print `Date.toISOString()`,
/// e.g. `2026-02-23T21:00:00.000Z`.
pub fn to_iso8601(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
