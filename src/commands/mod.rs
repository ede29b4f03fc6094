//! CLI command handlers.

mod scrape;
mod search;

pub use scrape::run_scrape_command;
pub use search::run_search_command;
