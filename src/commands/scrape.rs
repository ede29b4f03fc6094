//! Scrape command handler: build the fetcher and run the pipeline.

use anyhow::{Context, Result};
use keyscrape_core::{Scraper, ScraperConfig};
use tracing::info;

use crate::app::terminal;

pub async fn run_scrape_command(config: ScraperConfig, quiet: bool) -> Result<()> {
    info!(
        output = %config.output_path.display(),
        max_pages = ?config.max_pages,
        test_mode = config.test_mode,
        "scrape configured"
    );

    let scraper = Scraper::from_config(config)
        .context("Failed to initialize scraper")?
        .with_progress(terminal::scrape_spinner(quiet));

    let summary = scraper.run().await;
    if !quiet {
        println!(
            "Scraped {} pages, {} records ({})",
            summary.pages, summary.total_records, summary.stop_reason
        );
    }
    Ok(())
}
