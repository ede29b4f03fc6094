//! CLI entry point for the keyscrape tool.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::debug;

mod app;
mod app_config;
mod cli;
mod commands;

use app::{config_runtime, terminal};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        // Help already ends with the usage examples
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    terminal::init_tracing(
        terminal::default_level(cli.verbose, cli.quiet),
        Some(cli.log_file.as_path()),
    );
    debug!(?cli, "CLI arguments parsed");

    let loaded = app_config::load_default_file_config()?;
    if let Some(path) = loaded.path.as_deref()
        && loaded.config.is_some()
    {
        debug!(path = %path.display(), "loaded config file");
    }

    match command {
        Command::Scrape(args) => {
            let config = config_runtime::build_scraper_config(&cli, args, loaded.config.as_ref())?;
            commands::run_scrape_command(config, cli.quiet).await?;
        }
        Command::Search(args) => {
            let dataset = config_runtime::dataset_path(&cli, loaded.config.as_ref());
            commands::run_search_command(&dataset, &args.keyword, args.format.into())?;
        }
    }

    Ok(())
}
