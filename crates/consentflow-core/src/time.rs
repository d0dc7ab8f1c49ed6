//! Wall-clock helpers. All timestamps in Consentflow are Unix milliseconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in Unix milliseconds.
///
/// A clock set before the epoch reads as zero.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
