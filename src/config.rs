//! Run configuration for a scrape.
//!
//! Everything the pipeline would otherwise read from module globals (identity
//! and proxy pools, delays, thresholds, the target URL) lives in
//! [`ScraperConfig`], so tests can build a pipeline against fixture values.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::fetch::{DEFAULT_BLOCK_INDICATORS, DEFAULT_USER_AGENTS, RetryPolicy, TransportRetry};

/// Listing root; page 1 is fetched from this URL as-is.
pub const DEFAULT_BASE_URL: &str = "https://privatekeyfinder.io/private-keys/bitcoin/";

/// Default dataset path.
pub const DEFAULT_OUTPUT_FILE: &str = "bitcoin_keys.csv";

/// Default per-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Politeness delay range applied before every page fetch.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(7);

/// Flush the buffer every N pages.
pub const DEFAULT_SAVE_INTERVAL: u32 = 3;

/// Consecutive pages with zero valid records before the run stops.
pub const DEFAULT_EMPTY_PAGE_LIMIT: u32 = 3;

/// Pages fetched in test mode.
pub const TEST_MODE_PAGE_CAP: u32 = 2;

/// Substring that must appear in a page body for it to count as a listing.
pub const DEFAULT_TABLE_MARKER: &str = "table table-striped";

/// Errors raised while validating a [`ScraperConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The politeness delay range is inverted.
    #[error("min delay ({min_ms}ms) exceeds max delay ({max_ms}ms)")]
    DelayRange {
        /// Lower bound in milliseconds.
        min_ms: u128,
        /// Upper bound in milliseconds.
        max_ms: u128,
    },

    /// A counter that must be positive was zero.
    #[error("`{field}` must be at least 1")]
    Zero {
        /// Name of the offending setting.
        field: &'static str,
    },

    /// The base URL cannot carry a query string.
    #[error("base URL cannot be used for paging: {url}")]
    BaseUrl {
        /// The rejected URL.
        url: String,
    },
}

/// Where outbound requests are routed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// Direct connection.
    #[default]
    Disabled,
    /// Every request goes through the same proxy.
    Fixed(String),
    /// Each attempt advances one position through the pool, wrapping around.
    Rotate(Vec<String>),
}

impl ProxyMode {
    /// Resolves a CLI-style selector against a rotation pool.
    ///
    /// `auto` rotates through the non-empty entries of `pool` (direct when the
    /// pool is empty), `none` or an empty string disables proxying, anything
    /// else is used as a fixed proxy URL.
    #[must_use]
    pub fn from_selector(selector: &str, pool: &[String]) -> Self {
        match selector.trim() {
            "" | "none" => Self::Disabled,
            "auto" => {
                let pool: Vec<String> = pool
                    .iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                if pool.is_empty() {
                    Self::Disabled
                } else {
                    Self::Rotate(pool)
                }
            }
            fixed => Self::Fixed(fixed.to_string()),
        }
    }

    /// Proxy per route; `None` is a direct route.
    #[must_use]
    pub fn routes(&self) -> Vec<Option<String>> {
        match self {
            Self::Disabled => vec![None],
            Self::Fixed(proxy) => vec![Some(proxy.clone())],
            Self::Rotate(pool) => pool.iter().cloned().map(Some).collect(),
        }
    }
}

/// Complete configuration for one scrape or search run.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Listing root URL.
    pub base_url: Url,
    /// Dataset file.
    pub output_path: PathBuf,
    /// Stop after this many pages.
    pub max_pages: Option<u32>,
    /// Stop after [`TEST_MODE_PAGE_CAP`] pages.
    pub test_mode: bool,
    /// Proxy routing.
    pub proxy: ProxyMode,
    /// Identity pool; one entry is picked at random per attempt.
    pub user_agents: Vec<String>,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
    /// Lower bound of the politeness delay.
    pub min_delay: Duration,
    /// Upper bound of the politeness delay.
    pub max_delay: Duration,
    /// Flush every N pages.
    pub save_interval: u32,
    /// Consecutive empty pages tolerated before stopping.
    pub empty_page_limit: u32,
    /// Attempt-level retry with exponential backoff.
    pub retry: RetryPolicy,
    /// Status-code retries inside a single attempt.
    pub transport_retry: TransportRetry,
    /// Case-insensitive substrings that mark a bot-challenge page.
    pub block_indicators: Vec<String>,
    /// Marker required in a valid listing body.
    pub table_marker: String,
}

impl Default for ScraperConfig {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"), // Static, safe to panic
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            max_pages: None,
            test_mode: false,
            proxy: ProxyMode::Disabled,
            user_agents: DEFAULT_USER_AGENTS.iter().map(ToString::to_string).collect(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            save_interval: DEFAULT_SAVE_INTERVAL,
            empty_page_limit: DEFAULT_EMPTY_PAGE_LIMIT,
            retry: RetryPolicy::default(),
            transport_retry: TransportRetry::default(),
            block_indicators: DEFAULT_BLOCK_INDICATORS
                .iter()
                .map(ToString::to_string)
                .collect(),
            table_marker: DEFAULT_TABLE_MARKER.to_string(),
        }
    }
}

impl ScraperConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an inverted delay range, a zero save
    /// interval or empty-page limit, or a base URL that cannot be paged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::DelayRange {
                min_ms: self.min_delay.as_millis(),
                max_ms: self.max_delay.as_millis(),
            });
        }
        if self.save_interval == 0 {
            return Err(ConfigError::Zero {
                field: "save_interval",
            });
        }
        if self.empty_page_limit == 0 {
            return Err(ConfigError::Zero {
                field: "empty_page_limit",
            });
        }
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigError::BaseUrl {
                url: self.base_url.to_string(),
            });
        }
        Ok(())
    }

    /// URL for a 1-indexed page: the bare base URL for page 1, otherwise the
    /// base URL with a `page` query parameter.
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.base_url.to_string();
        }
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScraperConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.retry.max_attempts(), 5);
        assert_eq!(config.save_interval, 3);
    }

    #[test]
    fn test_page_url_first_page_is_bare_base() {
        let config = ScraperConfig::default();
        assert_eq!(config.page_url(1), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_page_url_appends_page_parameter() {
        let config = ScraperConfig::default();
        assert_eq!(config.page_url(4), format!("{DEFAULT_BASE_URL}?page=4"));
    }

    #[test]
    fn test_validate_rejects_inverted_delay_range() {
        let config = ScraperConfig {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(1),
            ..ScraperConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_save_interval() {
        let config = ScraperConfig {
            save_interval: 0,
            ..ScraperConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "save_interval"
            })
        );
    }

    #[test]
    fn test_proxy_selector_auto_rotates_non_empty_entries() {
        let pool = vec![
            String::new(),
            "http://10.0.0.1:8080".to_string(),
            " ".to_string(),
            "http://10.0.0.2:8080".to_string(),
        ];
        assert_eq!(
            ProxyMode::from_selector("auto", &pool),
            ProxyMode::Rotate(vec![
                "http://10.0.0.1:8080".to_string(),
                "http://10.0.0.2:8080".to_string()
            ])
        );
    }

    #[test]
    fn test_proxy_selector_auto_with_empty_pool_is_direct() {
        let pool = vec![String::new(), String::new()];
        assert_eq!(ProxyMode::from_selector("auto", &pool), ProxyMode::Disabled);
    }

    #[test]
    fn test_proxy_selector_none_and_fixed() {
        assert_eq!(ProxyMode::from_selector("none", &[]), ProxyMode::Disabled);
        assert_eq!(
            ProxyMode::from_selector("http://proxy:3128", &[]),
            ProxyMode::Fixed("http://proxy:3128".to_string())
        );
    }

    #[test]
    fn test_proxy_routes() {
        assert_eq!(ProxyMode::Disabled.routes(), vec![None]);
        assert_eq!(
            ProxyMode::Rotate(vec!["a".into(), "b".into()]).routes(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }
}
