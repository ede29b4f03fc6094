//! Buffered persistence to the CSV dataset.
//!
//! Records are buffered in memory and merged into the dataset on
//! [`RecordStore::flush`]: the whole file is read, the batch is appended after
//! the existing rows and the file is rewritten. Each flush therefore costs
//! O(file size). Rows are never de-duplicated.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::record::Record;

/// Errors reading or writing the dataset file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File system error.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The dataset path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Malformed CSV content or a serialization failure.
    #[error("CSV error on {path}: {source}")]
    Csv {
        /// The dataset path.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Result of a [`RecordStore::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered; the file was not touched.
    Empty,
    /// The batch was merged.
    Written {
        /// Records appended by this flush.
        appended: usize,
        /// Rows in the file afterwards.
        total: usize,
    },
    /// Reading or writing failed; the batch was discarded.
    Failed {
        /// Records lost.
        discarded: usize,
    },
}

/// In-memory buffer in front of the dataset file.
///
/// Dropping a store with buffered records performs a forced flush, so records
/// survive an unwinding panic in the pipeline.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    buffer: Vec<Record>,
}

impl RecordStore {
    /// Creates an empty store backed by `path`. No I/O happens until a flush.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer: Vec::new(),
        }
    }

    /// Dataset path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records waiting for the next flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffers records in capture order.
    pub fn record(&mut self, records: impl IntoIterator<Item = Record>) {
        self.buffer.extend(records);
    }

    /// Merges the buffer into the dataset file and clears the buffer.
    ///
    /// Never fails: errors are logged and the batch is dropped. `force` only
    /// adds a summary log line.
    #[instrument(skip(self), fields(path = %self.path.display(), buffered = self.buffer.len()))]
    pub fn flush(&mut self, force: bool) -> FlushOutcome {
        if self.buffer.is_empty() {
            return FlushOutcome::Empty;
        }

        let batch = std::mem::take(&mut self.buffer);
        let appended = batch.len();
        match merge_into(&self.path, batch) {
            Ok(total) => {
                if force {
                    info!(
                        records = appended,
                        total,
                        path = %self.path.display(),
                        "saved records"
                    );
                } else {
                    debug!(records = appended, total, "flushed progress");
                }
                FlushOutcome::Written { appended, total }
            }
            Err(e) => {
                error!(error = %e, discarded = appended, "failed to save progress");
                FlushOutcome::Failed {
                    discarded: appended,
                }
            }
        }
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.flush(true);
        }
    }
}

/// Loads every row of a dataset file.
///
/// # Errors
///
/// Returns [`StoreError`] when the file cannot be opened or a row does not
/// match the dataset columns.
pub fn load_records(path: &Path) -> Result<Vec<Record>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<Record>, _>>()
        .map_err(|e| StoreError::csv(path, e))
}

/// Writes `records` to `path` with a header row, replacing any existing file.
///
/// Rows go to a sibling temp file first, which is then renamed over `path`;
/// a failed write leaves the previous file intact.
///
/// # Errors
///
/// Returns [`StoreError`] when the file cannot be created or written.
pub fn write_records(path: &Path, records: &[Record]) -> Result<(), StoreError> {
    let temp_path = temp_path_for(path);
    let written = write_csv(&temp_path, records)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e)));
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

/// `keys.csv` becomes `keys.csv.tmp` in the same directory.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_csv(path: &Path, records: &[Record]) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    if records.is_empty() {
        writer
            .write_record(Record::COLUMNS)
            .map_err(|e| StoreError::csv(path, e))?;
    }
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| StoreError::csv(path, e))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| StoreError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| StoreError::io(path, e))
}

fn merge_into(path: &Path, batch: Vec<Record>) -> Result<usize, StoreError> {
    let mut rows = if path.exists() {
        load_records(path)?
    } else {
        Vec::new()
    };
    rows.extend(batch);
    write_records(path, &rows)?;
    Ok(rows.len())
}
