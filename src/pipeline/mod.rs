//! Page iteration: fetch, parse, buffer, flush, decide when to stop.
//!
//! A [`Scraper`] walks pages 1..N strictly one at a time. Before every fetch
//! it sleeps a random politeness delay; after every page it checks the stop
//! conditions in a fixed order:
//!
//! 1. page limit reached ([`StopReason::PageLimit`])
//! 2. test-mode cap reached ([`StopReason::TestModeComplete`])
//! 3. page unavailable after the fetcher's retries ([`StopReason::Unavailable`])
//! 4. too many consecutive empty pages ([`StopReason::ConsecutiveEmpty`])
//! 5. no next-page link ([`StopReason::NoMorePages`])
//!
//! Whatever ends the run, including an interrupt, the buffer gets a final
//! forced flush and the HTTP clients are dropped before [`Scraper::run`]
//! returns.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use indicatif::ProgressBar;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{ConfigError, ScraperConfig, TEST_MODE_PAGE_CAP};
use crate::fetch::{FetchError, PageFetcher, PageSource};
use crate::parser::parse_page;
use crate::store::RecordStore;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured page limit was reached.
    PageLimit {
        /// The configured limit.
        limit: u32,
    },
    /// Test mode fetched its fixed number of pages.
    TestModeComplete,
    /// A page could not be fetched within the retry ceiling.
    Unavailable {
        /// The page that failed.
        page: u32,
    },
    /// Too many pages in a row produced no valid records.
    ConsecutiveEmpty {
        /// Length of the empty streak.
        count: u32,
    },
    /// The last page had no next-page link.
    NoMorePages,
    /// The user interrupted the run.
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageLimit { limit } => write!(f, "reached max pages limit ({limit})"),
            Self::TestModeComplete => write!(f, "test mode complete"),
            Self::Unavailable { page } => write!(f, "page {page} unavailable"),
            Self::ConsecutiveEmpty { count } => write!(f, "{count} consecutive empty pages"),
            Self::NoMorePages => write!(f, "no more pages found"),
            Self::Interrupted => write!(f, "interrupted by user"),
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages fetched successfully.
    pub pages: u32,
    /// Valid records produced during this run.
    pub total_records: usize,
    /// What ended the run.
    pub stop_reason: StopReason,
}

/// Errors raised while setting up a [`Scraper`].
#[derive(Debug, Error)]
pub enum ScraperError {
    /// The configuration failed validation.
    #[error("invalid scraper configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP fetcher could not be built.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Drives one scrape over a [`PageSource`].
pub struct Scraper<S: PageSource> {
    config: ScraperConfig,
    source: S,
    store: RecordStore,
    progress: ProgressBar,
    pages: u32,
    total_records: usize,
}

impl Scraper<PageFetcher> {
    /// Builds a scraper with the production HTTP fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Config`] when `config` fails validation and
    /// [`ScraperError::Fetch`] when an HTTP client cannot be built.
    pub fn from_config(config: ScraperConfig) -> Result<Self, ScraperError> {
        config.validate()?;
        let fetcher = PageFetcher::new(&config)?;
        Ok(Self::new(config, fetcher)?)
    }
}

impl<S: PageSource> Scraper<S> {
    /// Creates a scraper over `source`, persisting to `config.output_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(config: ScraperConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = RecordStore::new(config.output_path.clone());
        Ok(Self {
            config,
            source,
            store,
            progress: ProgressBar::hidden(),
            pages: 0,
            total_records: 0,
        })
    }

    /// Reports page and record counts on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs until a stop condition or Ctrl-C.
    pub async fn run(self) -> RunSummary {
        self.run_until(interrupt_signal()).await
    }

    /// Runs until a stop condition or until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        info!(base_url = %self.config.base_url, "starting scrape");

        let stop_reason = tokio::select! {
            biased;
            () = shutdown => StopReason::Interrupted,
            reason = self.crawl() => reason,
        };

        self.finish(stop_reason)
    }

    async fn crawl(&mut self) -> StopReason {
        let mut page: u32 = 1;
        let mut consecutive_empty: u32 = 0;

        loop {
            if let Some(limit) = self.config.max_pages
                && page > limit
            {
                return StopReason::PageLimit { limit };
            }
            if self.config.test_mode && page > TEST_MODE_PAGE_CAP {
                return StopReason::TestModeComplete;
            }

            let url = self.config.page_url(page);
            let delay = politeness_delay(self.config.min_delay, self.config.max_delay);
            debug!(page, delay_ms = delay.as_millis(), "politeness delay");
            tokio::time::sleep(delay).await;

            let fetched = match self.source.fetch(&url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    error!(page, error = %e, "failed to retrieve page");
                    return StopReason::Unavailable { page };
                }
            };
            self.pages = page;

            let extract = parse_page(&fetched.body, &self.config.base_url);
            if extract.records.is_empty() {
                consecutive_empty += 1;
                info!(page, consecutive_empty, "page yielded no records");
                if consecutive_empty >= self.config.empty_page_limit {
                    return StopReason::ConsecutiveEmpty {
                        count: consecutive_empty,
                    };
                }
            } else {
                consecutive_empty = 0;
                self.total_records += extract.records.len();
                self.store.record(extract.records);
            }

            if page % self.config.save_interval == 0 {
                self.store.flush(false);
            }

            self.progress.inc(1);
            self.progress.set_message(format!(
                "page {page}, {} records",
                self.total_records
            ));
            debug!(page, records = self.total_records, "page done");

            if !extract.has_next_page {
                return StopReason::NoMorePages;
            }
            page += 1;
        }
    }

    fn finish(mut self, stop_reason: StopReason) -> RunSummary {
        match stop_reason {
            StopReason::Unavailable { .. } => error!(reason = %stop_reason, "scraping stopped"),
            _ => info!(reason = %stop_reason, "scraping stopped"),
        }

        self.store.flush(true);
        self.progress.finish_and_clear();
        info!(
            total_records = self.total_records,
            pages = self.pages,
            "scraping complete"
        );

        let summary = RunSummary {
            pages: self.pages,
            total_records: self.total_records,
            stop_reason,
        };
        drop(self.source);
        debug!("HTTP session closed");
        summary
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn politeness_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}
