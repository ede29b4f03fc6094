//! Shared fixtures for integration tests: a mock listing site and a
//! zero-delay scraper configuration pointing at it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use keyscrape_core::{RetryPolicy, ScraperConfig, TransportRetry};
use tokio::sync::oneshot;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the fixture listing is served under.
pub const LISTING_PATH: &str = "/private-keys/bitcoin/";

/// Deterministic, syntactically valid address for row `n`.
pub fn valid_address(n: usize) -> String {
    format!("1BoatSLRHtKNngkdXEeobR76b53LETtp{n:02}")
}

/// One `<tr>` with the five listing cells.
pub fn row(index: usize, address: &str) -> String {
    format!(
        r#"<tr><td>{index}</td><td>{address}</td><td>0.00000000 BTC</td><td>5Hp{index:04}privkey</td><td><a href="/key/{index}">view</a></td></tr>"#
    )
}

/// `count` valid rows numbered from `first`.
pub fn valid_rows(first: usize, count: usize) -> Vec<String> {
    (first..first + count)
        .map(|n| row(n, &valid_address(n)))
        .collect()
}

/// Full listing page with a header row, `rows`, and an optional next link.
pub fn listing(rows: &[String], next_page: Option<u32>) -> String {
    let pager = next_page.map_or_else(String::new, |n| {
        format!(r#"<ul class="pagination"><li><a rel="next" href="?page={n}">Next</a></li></ul>"#)
    });
    format!(
        r#"<!DOCTYPE html><html><head><title>Keys</title></head><body>
<table class="table table-striped">
<thead><tr><th>#</th><th>Address</th><th>Balance</th><th>Private Key</th><th>Details</th></tr></thead>
<tbody>{}</tbody>
</table>
{pager}
</body></html>"#,
        rows.join("\n")
    )
}

#[derive(Debug, Clone)]
struct ScriptedPage {
    body: String,
    failures: usize,
    failure_status: u16,
}

/// Serves listing pages keyed by the `page` query parameter (absent = 1).
///
/// A page can fail a fixed number of times before it is served; requests for
/// unknown pages get a 404.
#[derive(Debug, Default)]
pub struct FixtureSite {
    pages: HashMap<u32, ScriptedPage>,
    served: Mutex<HashMap<u32, usize>>,
    watch: Option<(u32, Mutex<Option<oneshot::Sender<()>>>)>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `page` on every request.
    #[must_use]
    pub fn page(self, page: u32, body: String) -> Self {
        self.flaky_page(page, body, 0, 500)
    }

    /// Answers `failures` requests for `page` with `status` before serving `body`.
    #[must_use]
    pub fn flaky_page(mut self, page: u32, body: String, failures: usize, status: u16) -> Self {
        self.pages.insert(
            page,
            ScriptedPage {
                body,
                failures,
                failure_status: status,
            },
        );
        self
    }

    /// Never serves `page` successfully.
    #[must_use]
    pub fn failing_page(self, page: u32, status: u16) -> Self {
        self.flaky_page(page, String::new(), usize::MAX, status)
    }

    /// Returns a receiver that fires the first time `page` is requested.
    pub fn notify_on(mut self, page: u32) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        self.watch = Some((page, Mutex::new(Some(tx))));
        (self, rx)
    }

    pub async fn mount(self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .respond_with(self)
            .mount(server)
            .await;
    }
}

impl Respond for FixtureSite {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse::<u32>().ok())
            .unwrap_or(1);

        if let Some((watched, tx)) = &self.watch
            && *watched == page
            && let Some(tx) = tx.lock().unwrap().take()
        {
            let _ = tx.send(());
        }

        let Some(script) = self.pages.get(&page) else {
            return ResponseTemplate::new(404).set_body_string("not found");
        };

        let mut served = self.served.lock().unwrap();
        let count = served.entry(page).or_insert(0);
        *count += 1;
        if *count <= script.failures {
            return ResponseTemplate::new(script.failure_status).set_body_string("server error");
        }

        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html; charset=utf-8")
            .set_body_string(script.body.clone())
    }
}

/// Scraper configuration against `server`: no delays, five immediate attempts,
/// no transport-level re-sends.
pub fn fixture_config(server: &MockServer, output: &Path) -> ScraperConfig {
    ScraperConfig {
        base_url: Url::parse(&format!("{}{LISTING_PATH}", server.uri())).unwrap(),
        output_path: output.to_path_buf(),
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        retry: RetryPolicy::immediate(5),
        transport_retry: TransportRetry::disabled(),
        ..ScraperConfig::default()
    }
}

/// Requests the server has received for listing pages.
pub async fn listing_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == LISTING_PATH)
        .count()
}
