//! `Retry-After` header handling for transport-level re-sends.

use std::time::{Duration, SystemTime};

use tracing::{debug, instrument, warn};

/// Longest server-requested wait honored (1 hour).
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Parses a Retry-After header value.
///
/// Accepts delta-seconds (`120`) or an HTTP-date
/// (`Wed, 21 Oct 2025 07:28:00 GMT`). Dates in the past yield zero, values
/// above [`MAX_RETRY_AFTER`] are capped, anything else yields `None`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use keyscrape_core::fetch::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    let requested = if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        Duration::from_secs(seconds)
    } else {
        let Ok(at) = httpdate::parse_http_date(header_value) else {
            debug!(header_value, "unparseable Retry-After value");
            return None;
        };
        at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO)
    };

    if requested > MAX_RETRY_AFTER {
        warn!(
            requested_secs = requested.as_secs(),
            max_secs = MAX_RETRY_AFTER.as_secs(),
            "Retry-After exceeds maximum, capping"
        );
        return Some(MAX_RETRY_AFTER);
    }
    Some(requested)
}
