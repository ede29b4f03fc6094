//! Search command handler: filter the dataset and send matches to a sink.

use std::io;
use std::path::Path;

use anyhow::Result;
use keyscrape_core::{OutputFormat, Search};

pub fn run_search_command(dataset: &Path, keyword: &str, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    Search::new(dataset).run(keyword, format, &mut out);
    Ok(())
}
