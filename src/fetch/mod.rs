//! HTTP page fetcher with identity rotation, proxy routing and retry.
//!
//! A fetch is made of up to `max_attempts` attempts. Each attempt picks a
//! random User-Agent and the next proxy route, sends one GET (re-sent in place
//! for allow-listed status codes, honoring `Retry-After`), then classifies the
//! body: bot-challenge pages and pages without the listing marker are
//! failures just like network errors. Failed attempts back off exponentially
//! with jitter.
//!
//! # Example
//!
//! ```no_run
//! use keyscrape_core::{PageFetcher, PageSource, ScraperConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScraperConfig::default();
//! let fetcher = PageFetcher::new(&config)?;
//! let page = fetcher.fetch(&config.page_url(1)).await?;
//! println!("{} bytes", page.body.len());
//! # Ok(())
//! # }
//! ```

mod blocking;
mod client;
mod error;
mod identity;
mod retry;
pub mod retry_after;

pub use blocking::{BlockDetector, DEFAULT_BLOCK_INDICATORS, IndicatorBlockDetector};
pub use client::{Page, PageFetcher, PageSource};
pub use error::FetchError;
pub use identity::{DEFAULT_USER_AGENTS, IdentityPool};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_STATUS_FORCELIST, RetryDecision, RetryPolicy, TransportRetry,
};
pub use retry_after::parse_retry_after;
