//! Keyscrape Core Library
//!
//! Fetches a paginated key listing, extracts validated table rows into
//! [`Record`]s, persists them to a CSV dataset and searches that dataset.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Explicit run configuration (pools, delays, thresholds)
//! - [`fetch`] - HTTP fetcher with identity/proxy rotation and retry
//! - [`parser`] - Listing table extraction and address validation
//! - [`store`] - Buffered read-merge-rewrite persistence
//! - [`pipeline`] - Page iteration and stop conditions
//! - [`search`] - Keyword search with console/CSV/JSON sinks

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fetch;
pub mod parser;
pub mod pipeline;
mod record;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use config::{ConfigError, ProxyMode, ScraperConfig};
pub use fetch::{
    BlockDetector, FetchError, IndicatorBlockDetector, Page, PageFetcher, PageSource,
    RetryDecision, RetryPolicy, TransportRetry,
};
pub use parser::{PageExtract, is_valid_address, parse_page};
pub use pipeline::{RunSummary, Scraper, ScraperError, StopReason};
pub use record::Record;
pub use search::{OutputFormat, Search, SearchError};
pub use store::{FlushOutcome, RecordStore, StoreError};
