//! Listing page extraction.
//!
//! Turns one page body into validated [`Record`]s. Parsing never fails: a
//! missing table is reported through [`PageExtract::table_missing`] (the site
//! layout probably changed) and bad rows are logged and dropped.
//!
//! # Example
//!
//! ```
//! use keyscrape_core::parse_page;
//! use url::Url;
//!
//! let base = Url::parse("https://example.com/keys/").unwrap();
//! let html = r#"<table class="table table-striped">
//!   <tr><th>#</th><th>Address</th><th>Balance</th><th>Key</th><th></th></tr>
//!   <tr><td>1</td><td>1BoatSLRHtKNngkdXEeobR76b53LETtpyT</td><td>0 BTC</td>
//!       <td>5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf</td>
//!       <td><a href="/key/1">view</a></td></tr>
//! </table>"#;
//!
//! let extract = parse_page(html, &base);
//! assert_eq!(extract.records.len(), 1);
//! assert_eq!(extract.records[0].details_url, "https://example.com/key/1");
//! ```

mod address;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub use address::is_valid_address;

use crate::record::Record;

/// Cells a data row needs: index, address, balance, private key, link.
const MIN_CELLS: usize = 5;

#[allow(clippy::expect_used)]
static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table.table-striped").expect("table selector is valid") // Static, safe to panic
});

#[allow(clippy::expect_used)]
static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector is valid"));

#[allow(clippy::expect_used)]
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("cell selector is valid"));

#[allow(clippy::expect_used)]
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));

#[allow(clippy::expect_used)]
static NEXT_PAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[rel~="next"]"#).expect("next-page selector is valid")
});

/// Everything the pipeline needs from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtract {
    /// Validated records, in row order.
    pub records: Vec<Record>,
    /// Rows dropped for failing address validation.
    pub rejected: usize,
    /// The listing table was not found.
    pub table_missing: bool,
    /// The page links to a following page.
    pub has_next_page: bool,
}

/// Extracts records and the next-page signal from a page body.
///
/// The first row of the table is treated as the header. Rows with fewer than
/// five cells are skipped silently; rows with an invalid address are logged
/// and counted in [`PageExtract::rejected`]. Detail links are resolved against
/// `base_url`.
#[must_use]
#[instrument(skip(body, base_url), fields(body_len = body.len()))]
pub fn parse_page(body: &str, base_url: &Url) -> PageExtract {
    let document = Html::parse_document(body);
    let has_next_page = document.select(&NEXT_PAGE_SELECTOR).next().is_some();

    let Some(table) = document.select(&TABLE_SELECTOR).next() else {
        error!("table not found; website structure may have changed");
        return PageExtract {
            table_missing: true,
            has_next_page,
            ..PageExtract::default()
        };
    };

    let rows: Vec<ElementRef<'_>> = table.select(&ROW_SELECTOR).skip(1).collect();
    if rows.is_empty() {
        info!("no rows found on page");
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;
    for row in rows {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL_SELECTOR).collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let address = cell_text(cells[1]);
        if !is_valid_address(&address) {
            warn!(address = %address, "invalid Bitcoin address format");
            rejected += 1;
            continue;
        }

        records.push(Record::captured(
            cell_text(cells[0]),
            address,
            cell_text(cells[2]),
            cell_text(cells[3]),
            details_url(cells[4], base_url),
        ));
    }

    debug!(records = records.len(), rejected, has_next_page, "parsed page");

    PageExtract {
        records,
        rejected,
        table_missing: false,
        has_next_page,
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn details_url(cell: ElementRef<'_>, base_url: &Url) -> String {
    let Some(href) = cell
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"))
    else {
        return String::new();
    };

    match base_url.join(href.trim()) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!(href, error = %e, "unresolvable details link");
            String::new()
        }
    }
}
