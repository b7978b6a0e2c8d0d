//! Time helpers for ledger timestamps (milliseconds since the Unix epoch)

use chrono::{TimeZone, Utc};

/// Convert a millisecond timestamp to an RFC 3339 string
///
/// Returns "invalid" for out-of-range timestamps.
///
/// # Examples
/// ```
/// use btc_custody_sync::utils::time::millis_to_rfc3339;
/// assert_eq!(millis_to_rfc3339(0), "1970-01-01T00:00:00+00:00");
/// assert_eq!(millis_to_rfc3339(1704067200000), "2024-01-01T00:00:00+00:00");
/// ```
pub fn millis_to_rfc3339(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "invalid".to_string())
}
