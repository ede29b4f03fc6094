//! Retry policies for page fetches.
//!
//! Two layers cooperate:
//!
//! - [`TransportRetry`] re-sends a request in place when the server answers
//!   with an allow-listed status (rate limiting, transient server errors),
//!   preferring the server's `Retry-After` over its own backoff.
//! - [`RetryPolicy`] wraps whole attempts. Every failed attempt (network,
//!   timeout, proxy, bad status, blocked or malformed body) is retried after
//!   an exponential delay with jitter until the attempt ceiling is reached.
//!
//! # Example
//!
//! ```
//! use keyscrape_core::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Default attempt ceiling per page.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default maximum jitter added to delays (1 second).
const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(1);

/// Status codes re-sent at the transport layer.
pub const DEFAULT_STATUS_FORCELIST: &[u16] = &[403, 429, 500, 502, 503, 504];

/// Default transport re-send count.
const DEFAULT_TRANSPORT_RETRIES: u32 = 5;

/// Default transport backoff factor (1.5 seconds).
const DEFAULT_TRANSPORT_BACKOFF_FACTOR: Duration = Duration::from_millis(1500);

/// Transport backoff cap (2 minutes).
const MAX_TRANSPORT_BACKOFF: Duration = Duration::from_secs(120);

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Give up on the page.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt-level retry with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `base_delay`: 1 second
/// - `max_delay`: 32 seconds
/// - `backoff_multiplier`: 2.0
/// - `max_jitter`: 1 second
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt-1), max_delay) + jitter
/// ```
///
/// With defaults, delays are approximately: 1s, 2s, 4s, 8s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt (typically 2.0 for doubling).
    backoff_multiplier: f32,

    /// Upper bound of the random jitter.
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (must be >= 1)
    /// * `base_delay` - Base delay for first retry
    /// * `max_delay` - Maximum delay cap
    /// * `backoff_multiplier` - Multiplier for exponential increase
    /// * `max_jitter` - Upper bound of the random jitter
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
        max_jitter: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            max_jitter,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Same ceiling, no waiting. Used by tests and fixture runs.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(
            max_attempts,
            Duration::ZERO,
            Duration::ZERO,
            DEFAULT_BACKOFF_MULTIPLIER,
            Duration::ZERO,
        )
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after attempt number `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Formula: `min(base_delay * multiplier^(attempt-1), max_delay) + jitter`
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // attempt 1 = multiplier^0 = 1x base
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

/// In-place re-sends for allow-listed status codes.
///
/// The n-th re-send waits `backoff_factor * 2^(n-1)` (capped at two minutes)
/// unless the response carried a usable `Retry-After`.
#[derive(Debug, Clone)]
pub struct TransportRetry {
    max_retries: u32,
    status_forcelist: Vec<u16>,
    backoff_factor: Duration,
}

impl Default for TransportRetry {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_TRANSPORT_RETRIES,
            status_forcelist: DEFAULT_STATUS_FORCELIST.to_vec(),
            backoff_factor: DEFAULT_TRANSPORT_BACKOFF_FACTOR,
        }
    }
}

impl TransportRetry {
    /// Creates a transport policy.
    #[must_use]
    pub fn new(max_retries: u32, status_forcelist: Vec<u16>, backoff_factor: Duration) -> Self {
        Self {
            max_retries,
            status_forcelist,
            backoff_factor,
        }
    }

    /// Disables transport re-sends; bad statuses go straight to the attempt loop.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0, Vec::new(), Duration::ZERO)
    }

    /// Maximum re-sends per attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether `status` may be re-sent after `resends` re-sends already made.
    #[must_use]
    pub fn should_resend(&self, status: u16, resends: u32) -> bool {
        resends < self.max_retries && self.status_forcelist.contains(&status)
    }

    /// Backoff before re-send number `resend` (1-indexed).
    #[must_use]
    pub fn backoff(&self, resend: u32) -> Duration {
        let factor = 2u32.saturating_pow(resend.saturating_sub(1));
        self.backoff_factor
            .saturating_mul(factor)
            .min(MAX_TRANSPORT_BACKOFF)
    }
}
