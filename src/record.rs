//! The row type shared by the parser, the store and search.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One validated row extracted from a listing page.
///
/// Field order matches the column order of the persisted CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Ordinal label as shown on the page; not unique across the dataset.
    pub index: String,
    /// Address that passed [`is_valid_address`](crate::parser::is_valid_address).
    pub address: String,
    /// Balance text as displayed.
    pub balance: String,
    /// Private key text as displayed.
    pub private_key: String,
    /// Absolute details link, or empty when the row has none.
    pub details_url: String,
    /// Capture time (RFC 3339, UTC).
    pub timestamp: String,
}

impl Record {
    /// Persisted column names, in order.
    pub const COLUMNS: [&'static str; 6] = [
        "index",
        "address",
        "balance",
        "private_key",
        "details_url",
        "timestamp",
    ];

    /// Columns shown by the console search sink.
    pub const DISPLAY_COLUMNS: [&'static str; 5] =
        ["index", "address", "balance", "private_key", "details_url"];

    /// Builds a record stamped with the current capture time.
    #[must_use]
    pub fn captured(
        index: impl Into<String>,
        address: impl Into<String>,
        balance: impl Into<String>,
        private_key: impl Into<String>,
        details_url: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            address: address.into(),
            balance: balance.into(),
            private_key: private_key.into(),
            details_url: details_url.into(),
            timestamp: capture_timestamp(),
        }
    }

    /// All column values in [`Record::COLUMNS`] order.
    #[must_use]
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.index,
            &self.address,
            &self.balance,
            &self.private_key,
            &self.details_url,
            &self.timestamp,
        ]
    }
}

fn capture_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
