//! Error types for the fetch module.

use thiserror::Error;

/// Errors that can occur while fetching a listing page.
///
/// Every variant except [`FetchError::Exhausted`] and the client construction
/// errors describes one failed attempt; the fetcher retries all of them.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection through the configured proxy failed.
    #[error("proxy {proxy} failed fetching {url}: {source}")]
    Proxy {
        /// The URL being fetched.
        url: String,
        /// The proxy in use.
        proxy: String,
        /// The underlying connection error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status after transport-level re-sends.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// The body is a bot-challenge or access-denied page.
    #[error("blocking detected fetching {url} (matched '{indicator}')")]
    Blocked {
        /// The URL that was blocked.
        url: String,
        /// The indicator that matched.
        indicator: String,
    },

    /// The body lacks the listing table marker.
    #[error("table content missing fetching {url} (no '{marker}' marker)")]
    Malformed {
        /// The URL whose body was malformed.
        url: String,
        /// The marker that was expected.
        marker: String,
    },

    /// All attempts failed.
    #[error("page unavailable after {attempts} attempts: {url}")]
    Exhausted {
        /// The URL that could not be fetched.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: Box<FetchError>,
    },

    /// A proxy URL could not be parsed.
    #[error("invalid proxy '{proxy}': {source}")]
    InvalidProxy {
        /// The rejected proxy URL.
        proxy: String,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a proxy error.
    pub fn proxy(url: impl Into<String>, proxy: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Proxy {
            url: url.into(),
            proxy: proxy.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a blocked-page error.
    pub fn blocked(url: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self::Blocked {
            url: url.into(),
            indicator: indicator.into(),
        }
    }

    /// Creates a missing-marker error.
    pub fn malformed(url: impl Into<String>, marker: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            marker: marker.into(),
        }
    }

    /// Wraps the final attempt's error once the retry ceiling is hit.
    pub fn exhausted(url: impl Into<String>, attempts: u32, last: FetchError) -> Self {
        Self::Exhausted {
            url: url.into(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Short label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Proxy { .. } => "proxy",
            Self::HttpStatus { .. } => "http_status",
            Self::Blocked { .. } => "blocked",
            Self::Malformed { .. } => "malformed",
            Self::Exhausted { .. } => "exhausted",
            Self::InvalidProxy { .. } => "invalid_proxy",
            Self::ClientBuild { .. } => "client_build",
        }
    }
}
