//! Page fetcher: one pooled HTTP client per proxy route.

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, REFERER, RETRY_AFTER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, Proxy};
use tracing::{debug, info, instrument, warn};

use super::blocking::{BlockDetector, IndicatorBlockDetector};
use super::error::FetchError;
use super::identity::{IdentityPool, RouteCursor};
use super::retry::{RetryDecision, RetryPolicy, TransportRetry};
use super::retry_after::parse_retry_after;
use crate::config::ScraperConfig;

/// Idle connections kept per host and route.
const POOL_MAX_IDLE_PER_HOST: usize = 50;

/// A successfully fetched listing page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body, verbatim.
    pub body: String,
}

/// Source of listing pages.
///
/// [`PageFetcher`] is the production implementation; the pipeline is generic
/// over this trait so stop conditions can be exercised with canned pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches one page, retrying internally. An error means the page is
    /// unavailable.
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

#[derive(Debug)]
struct Route {
    proxy: Option<String>,
    client: Client,
}

/// HTTP fetcher with identity rotation, proxy routing and two-layer retry.
///
/// Created once per run; each route keeps its own connection pool.
pub struct PageFetcher {
    routes: Vec<Route>,
    cursor: RouteCursor,
    rotating: bool,
    identities: IdentityPool,
    detector: Box<dyn BlockDetector>,
    table_marker: String,
    retry: RetryPolicy,
    transport: TransportRetry,
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("routes", &self.routes.len())
            .field("rotating", &self.rotating)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PageFetcher {
    /// Builds the per-route clients from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidProxy`] for an unparseable proxy URL and
    /// [`FetchError::ClientBuild`] when the TLS backend cannot be initialized.
    #[instrument(level = "debug", skip(config), fields(base_url = %config.base_url))]
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled");
        }

        let mut proxies = config.proxy.routes();
        if proxies.is_empty() {
            // an empty rotation pool means direct connections
            proxies.push(None);
        }
        let routes = proxies
            .into_iter()
            .map(|proxy| {
                let client = build_client(config, proxy.as_deref())?;
                Ok(Route { proxy, client })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        debug!(routes = routes.len(), "HTTP clients ready");

        Ok(Self {
            cursor: RouteCursor::new(routes.len()),
            rotating: matches!(config.proxy, crate::config::ProxyMode::Rotate(_)),
            routes,
            identities: IdentityPool::new(&config.user_agents),
            detector: Box::new(IndicatorBlockDetector::new(&config.block_indicators)),
            table_marker: config.table_marker.clone(),
            retry: config.retry.clone(),
            transport: config.transport_retry.clone(),
        })
    }

    /// Replaces the blocking-page predicate.
    #[must_use]
    pub fn with_block_detector(mut self, detector: impl BlockDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Number of proxy routes (1 when proxying is disabled or fixed).
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// One attempt: pick identity and route, send (with transport re-sends),
    /// then classify the body.
    async fn attempt(&self, url: &str) -> Result<Page, FetchError> {
        let route = &self.routes[self.cursor.advance()];
        let user_agent = self.identities.pick();

        if self.rotating
            && let Some(proxy) = route.proxy.as_deref()
        {
            info!(proxy, "using proxy");
        }

        let response = self.send_with_resends(route, url, user_agent).await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        if let Some(indicator) = self.detector.detect(&body) {
            return Err(FetchError::blocked(url, indicator));
        }
        if !body.contains(&self.table_marker) {
            return Err(FetchError::malformed(url, self.table_marker.as_str()));
        }

        Ok(Page {
            url: final_url,
            status,
            body,
        })
    }

    async fn send_with_resends(
        &self,
        route: &Route,
        url: &str,
        user_agent: &str,
    ) -> Result<reqwest::Response, FetchError> {
        let mut resends = 0u32;
        loop {
            let response = route
                .client
                .get(url)
                .header(USER_AGENT, user_agent)
                .send()
                .await
                .map_err(|e| classify_send_error(url, route.proxy.as_deref(), e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);

            if self.transport.should_resend(status.as_u16(), resends) {
                resends += 1;
                let delay = retry_after
                    .as_deref()
                    .and_then(parse_retry_after)
                    .unwrap_or_else(|| self.transport.backoff(resends));
                debug!(
                    url,
                    status = status.as_u16(),
                    resend = resends,
                    delay_ms = delay.as_millis(),
                    "re-sending request"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(FetchError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting fetch");

            let error = match self.attempt(url).await {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };

            match self.retry.should_retry(attempt) {
                RetryDecision::Retry { delay, .. } => {
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts(),
                        delay_secs = delay.as_secs_f64(),
                        kind = error.kind(),
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(
                        attempt,
                        kind = error.kind(),
                        error = %error,
                        %reason,
                        "attempt failed, giving up"
                    );
                    return Err(FetchError::exhausted(url, attempt, error));
                }
            }
        }
    }
}

fn classify_send_error(url: &str, proxy: Option<&str>, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::timeout(url);
    }
    match proxy {
        Some(proxy) if error.is_connect() => FetchError::proxy(url, proxy, error),
        _ => FetchError::network(url, error),
    }
}

fn default_headers(config: &ScraperConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    if let Ok(referer) = HeaderValue::from_str(config.base_url.as_str()) {
        headers.insert(REFERER, referer);
    }
    headers
}

fn build_client(config: &ScraperConfig, proxy: Option<&str>) -> Result<Client, FetchError> {
    let mut builder = Client::builder()
        .timeout(config.request_timeout)
        .gzip(true)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .default_headers(default_headers(config))
        .danger_accept_invalid_certs(config.accept_invalid_certs);

    builder = match proxy {
        Some(proxy) => builder.proxy(
            Proxy::all(proxy).map_err(|source| FetchError::InvalidProxy {
                proxy: proxy.to_string(),
                source,
            })?,
        ),
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|source| FetchError::ClientBuild { source })
}
