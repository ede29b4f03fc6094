//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use keyscrape_core::OutputFormat;

/// Usage examples printed after help and when no command is given.
pub const EXAMPLES: &str = "Examples:
  keyscrape scrape --max-pages 10
  keyscrape scrape --test --proxy none
  keyscrape search 1A1zP --format console
  keyscrape search bc1q --format json";

/// Scrape a paginated key listing into a CSV dataset and search it.
#[derive(Parser, Debug)]
#[command(name = "keyscrape")]
#[command(author, version, about)]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Dataset CSV file [default: bitcoin_keys.csv]
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Proxy routing: `auto` rotates the configured pool, `none` connects directly, anything else is a proxy URL
    #[arg(long, global = true, default_value = "auto")]
    pub proxy: String,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// File the log stream is appended to
    #[arg(long, global = true, default_value = "keyscrape.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch listing pages and append valid rows to the dataset
    Scrape(ScrapeArgs),

    /// Search the dataset for a keyword
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScrapeArgs {
    /// Stop after this many pages
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,

    /// Test mode: fetch at most 2 pages
    #[arg(long)]
    pub test: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Case-insensitive substring matched against every column
    pub keyword: String,

    /// Where matches are sent
    #[arg(long, value_enum, default_value_t = FormatArg::Console)]
    pub format: FormatArg,
}

/// `--format` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Console,
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Console => Self::Console,
            FormatArg::Csv => Self::Csv,
            FormatArg::Json => Self::Json,
        }
    }
}
