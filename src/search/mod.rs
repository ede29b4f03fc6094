//! Keyword search over the persisted dataset.
//!
//! A row matches when any of its columns contains the keyword, compared
//! case-insensitively. Matches go to one sink: a console table, or a
//! `search_results_<keyword>.{csv,json}` export.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::record::Record;
use crate::store::{StoreError, load_records, write_records};

/// Errors raised while searching or exporting.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No dataset has been scraped yet.
    #[error("dataset file not found: {path}; scrape first")]
    MissingDataset {
        /// Expected dataset path.
        path: PathBuf,
    },

    /// File system or console write failure.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The dataset or CSV export could not be processed.
    #[error("CSV error on {path}: {source}")]
    Csv {
        /// Path being read or written.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// The JSON export could not be written.
    #[error("JSON error on {path}: {source}")]
    Json {
        /// Export path.
        path: PathBuf,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for SearchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Io { path, source } => Self::Io { path, source },
            StoreError::Csv { path, source } => Self::Csv { path, source },
        }
    }
}

/// Where search matches are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned table on the output stream.
    #[default]
    Console,
    /// `search_results_<keyword>.csv` with every column.
    Csv,
    /// `search_results_<keyword>.json`, an array of row objects.
    Json,
}

impl OutputFormat {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search over one dataset file.
#[derive(Debug, Clone)]
pub struct Search {
    dataset: PathBuf,
    export_dir: PathBuf,
}

impl Search {
    /// Searches `dataset`, exporting into the current directory.
    pub fn new(dataset: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            export_dir: PathBuf::from("."),
        }
    }

    /// Writes CSV/JSON exports into `dir` instead.
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Runs a search and sends matches to `format`.
    ///
    /// Never fails: a missing or unreadable dataset is logged and yields no
    /// rows. An export failure is logged but the matching rows are still
    /// returned.
    #[instrument(skip(self, out), fields(dataset = %self.dataset.display()))]
    pub fn run(&self, keyword: &str, format: OutputFormat, out: &mut impl Write) -> Vec<Record> {
        info!(keyword, "searching dataset");

        let matches = match self.find(keyword) {
            Ok(matches) => matches,
            Err(e) => {
                error!(error = %e, "search failed");
                return Vec::new();
            }
        };

        if matches.is_empty() {
            info!("no matching records found");
            return matches;
        }

        if let Err(e) = self.emit(keyword, format, &matches, out) {
            error!(error = %e, format = %format, "failed to write search results");
        }

        info!(matches = matches.len(), "search complete");
        matches
    }

    /// Loads the dataset and returns the rows matching `keyword`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::MissingDataset`] when the dataset does not
    /// exist and an IO or CSV error when it cannot be read.
    pub fn find(&self, keyword: &str) -> Result<Vec<Record>, SearchError> {
        if !self.dataset.exists() {
            return Err(SearchError::MissingDataset {
                path: self.dataset.clone(),
            });
        }
        let records = load_records(&self.dataset)?;
        Ok(filter_records(records, keyword))
    }

    /// Sends `matches` to the sink selected by `format`.
    ///
    /// Returns the export path for file sinks.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the console or the export file cannot be
    /// written.
    pub fn emit(
        &self,
        keyword: &str,
        format: OutputFormat,
        matches: &[Record],
        out: &mut impl Write,
    ) -> Result<Option<PathBuf>, SearchError> {
        match format {
            OutputFormat::Console => {
                render_table(matches, out).map_err(|source| SearchError::Io {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
                Ok(None)
            }
            OutputFormat::Csv => {
                let path = self.export_dir.join(export_file_name(keyword, "csv"));
                write_records(&path, matches)?;
                info!(path = %path.display(), "results saved");
                Ok(Some(path))
            }
            OutputFormat::Json => {
                let path = self.export_dir.join(export_file_name(keyword, "json"));
                write_json(&path, matches)?;
                info!(path = %path.display(), "results saved");
                Ok(Some(path))
            }
        }
    }
}

/// Keeps the records where any column contains `keyword`, ignoring case.
#[must_use]
pub fn filter_records(records: Vec<Record>, keyword: &str) -> Vec<Record> {
    let needle = keyword.to_lowercase();
    records
        .into_iter()
        .filter(|record| {
            record
                .fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// `search_results_<keyword>.<ext>`, with keyword characters outside
/// `[A-Za-z0-9_-]` replaced by `_`.
///
/// ```
/// use keyscrape_core::search::export_file_name;
///
/// assert_eq!(export_file_name("1A1zP", "csv"), "search_results_1A1zP.csv");
/// assert_eq!(export_file_name("../etc", "json"), "search_results____etc.json");
/// ```
#[must_use]
pub fn export_file_name(keyword: &str, extension: &str) -> String {
    let safe: String = keyword
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("search_results_{safe}.{extension}")
}

fn write_json(path: &Path, records: &[Record]) -> Result<(), SearchError> {
    let file = File::create(path).map_err(|source| SearchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, records).map_err(|source| SearchError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| SearchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render_table(records: &[Record], out: &mut impl Write) -> io::Result<()> {
    let rows: Vec<[&str; 5]> = records
        .iter()
        .map(|r| {
            [
                r.index.as_str(),
                r.address.as_str(),
                r.balance.as_str(),
                r.private_key.as_str(),
                r.details_url.as_str(),
            ]
        })
        .collect();

    let mut widths = Record::DISPLAY_COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out)?;
    writeln!(out, "Search Results:")?;
    write_row(out, &Record::DISPLAY_COLUMNS, &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    out.flush()
}

fn write_row(out: &mut impl Write, cells: &[&str; 5], widths: &[usize; 5]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:>width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{line}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(index: &str, address: &str, key: &str) -> Record {
        Record {
            index: index.to_string(),
            address: address.to_string(),
            balance: "0 BTC".to_string(),
            private_key: key.to_string(),
            details_url: format!("https://example.com/key/{index}"),
            timestamp: "2026-10-19T08:00:00.000000Z".to_string(),
        }
    }

    fn dataset(dir: &Path) -> PathBuf {
        let path = dir.join("keys.csv");
        write_records(
            &path,
            &[
                record("1", "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "5HpHagT65"),
                record("2", "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", "KwDiBf89Q"),
                record("3", "1BoatSLRHtKNngkdXEeobR76b53LETtpyT", "L1aW4aubD"),
            ],
        )
        .unwrap();
        path
    }

    #[test]
    fn test_filter_is_case_insensitive_across_columns() {
        let records = vec![
            record("1", "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "x"),
            record("2", "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", "x"),
        ];
        let hits = filter_records(records.clone(), "1a1zp");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, "1");

        // matches the details_url column
        let hits = filter_records(records, "KEY/2");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, "2");
    }

    #[test]
    fn test_find_missing_dataset() {
        let temp = TempDir::new().unwrap();
        let search = Search::new(temp.path().join("absent.csv"));
        let err = search.find("1A").unwrap_err();
        assert!(matches!(err, SearchError::MissingDataset { .. }), "{err:?}");
    }

    #[test]
    fn test_run_missing_dataset_returns_empty() {
        let temp = TempDir::new().unwrap();
        let search = Search::new(temp.path().join("absent.csv"));
        let mut out = Vec::new();
        assert!(search.run("1A", OutputFormat::Console, &mut out).is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_console_sink_prints_display_columns() {
        let temp = TempDir::new().unwrap();
        let search = Search::new(dataset(temp.path()));
        let mut out = Vec::new();

        let hits = search.run("1a1zp", OutputFormat::Console, &mut out);
        assert_eq!(hits.len(), 1);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Search Results:"));
        assert!(printed.contains("private_key"));
        assert!(printed.contains("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(!printed.contains("timestamp"));
        assert!(!printed.contains("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"));
    }

    #[test]
    fn test_csv_sink_writes_export_file() {
        let temp = TempDir::new().unwrap();
        let search = Search::new(dataset(temp.path())).with_export_dir(temp.path());
        let mut out = Vec::new();

        let hits = search.run("3J98", OutputFormat::Csv, &mut out);
        assert_eq!(hits.len(), 1);
        assert!(out.is_empty(), "file sinks print nothing to the console");

        let exported = load_records(&temp.path().join("search_results_3J98.csv")).unwrap();
        assert_eq!(exported, hits);
    }

    #[test]
    fn test_json_sink_writes_array_of_objects() {
        let temp = TempDir::new().unwrap();
        let search = Search::new(dataset(temp.path())).with_export_dir(temp.path());
        let hits = search.run("btc", OutputFormat::Json, &mut io::sink());
        assert_eq!(hits.len(), 3);

        let raw = std::fs::read_to_string(temp.path().join("search_results_btc.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["address"], "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        assert_eq!(rows[2]["private_key"], "L1aW4aubD");
    }

    #[test]
    fn test_no_match_writes_no_file() {
        let temp = TempDir::new().unwrap();
        let search = Search::new(dataset(temp.path())).with_export_dir(temp.path());
        let hits = search.run("zzzz", OutputFormat::Csv, &mut io::sink());
        assert!(hits.is_empty());
        assert!(!temp.path().join("search_results_zzzz.csv").exists());
    }

    #[test]
    fn test_export_file_name_sanitizes_keyword() {
        assert_eq!(export_file_name("a b/c", "csv"), "search_results_a_b_c.csv");
        assert_eq!(export_file_name("bc1-q_x", "json"), "search_results_bc1-q_x.json");
    }

    #[test]
    fn test_output_format_labels() {
        assert_eq!(OutputFormat::default(), OutputFormat::Console);
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
