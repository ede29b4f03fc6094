//! Effective run configuration: defaults, then the config file, then CLI flags.

use std::time::Duration;

use anyhow::{Context, Result};
use keyscrape_core::{ProxyMode, RetryPolicy, ScraperConfig};
use url::Url;

use crate::app_config::FileConfig;
use crate::cli::{Cli, ScrapeArgs};

pub(crate) fn build_scraper_config(
    cli: &Cli,
    scrape: &ScrapeArgs,
    file: Option<&FileConfig>,
) -> Result<ScraperConfig> {
    let mut config = ScraperConfig::default();

    if let Some(file) = file {
        apply_file_config(&mut config, file)?;
    }

    let pool = file.and_then(|f| f.proxies.as_deref()).unwrap_or_default();
    config.proxy = ProxyMode::from_selector(&cli.proxy, pool);

    if let Some(output) = &cli.output {
        config.output_path.clone_from(output);
    }
    if cli.insecure {
        config.accept_invalid_certs = true;
    }
    config.max_pages = scrape.max_pages;
    config.test_mode = scrape.test;

    config.validate().context("Invalid scraper configuration")?;
    Ok(config)
}

fn apply_file_config(config: &mut ScraperConfig, file: &FileConfig) -> Result<()> {
    if let Some(base_url) = file.base_url.as_deref() {
        config.base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL '{base_url}'"))?;
    }
    if let Some(output) = &file.output {
        config.output_path.clone_from(output);
    }
    if let Some(user_agents) = &file.user_agents {
        config.user_agents.clone_from(user_agents);
    }
    if let Some(ms) = file.min_delay_ms {
        config.min_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = file.max_delay_ms {
        config.max_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = file.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(max_attempts) = file.max_attempts {
        config.retry = RetryPolicy::with_max_attempts(max_attempts);
    }
    if let Some(save_interval) = file.save_interval {
        config.save_interval = save_interval;
    }
    if let Some(limit) = file.empty_page_limit {
        config.empty_page_limit = limit;
    }
    if let Some(accept) = file.accept_invalid_certs {
        config.accept_invalid_certs = accept;
    }
    Ok(())
}

/// Dataset path for `search`: `--output`, then the config file, then the default.
pub(crate) fn dataset_path(cli: &Cli, file: Option<&FileConfig>) -> std::path::PathBuf {
    cli.output
        .clone()
        .or_else(|| file.and_then(|f| f.output.clone()))
        .unwrap_or_else(|| ScraperConfig::default().output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config =
            build_scraper_config(&cli(&["keyscrape"]), &ScrapeArgs::default(), None).unwrap();
        assert_eq!(config.output_path, PathBuf::from("bitcoin_keys.csv"));
        // `auto` with no pool connects directly
        assert_eq!(config.proxy, ProxyMode::Disabled);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_file_values_apply() {
        let file = FileConfig {
            base_url: Some("http://127.0.0.1:8080/keys/".to_string()),
            proxies: Some(vec!["http://10.0.0.1:8080".to_string()]),
            min_delay_ms: Some(0),
            max_delay_ms: Some(10),
            max_attempts: Some(2),
            save_interval: Some(1),
            ..FileConfig::default()
        };
        let config =
            build_scraper_config(&cli(&["keyscrape"]), &ScrapeArgs::default(), Some(&file))
                .unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8080/keys/");
        assert_eq!(
            config.proxy,
            ProxyMode::Rotate(vec!["http://10.0.0.1:8080".to_string()])
        );
        assert_eq!(config.max_delay, Duration::from_millis(10));
        assert_eq!(config.retry.max_attempts(), 2);
        assert_eq!(config.save_interval, 1);
    }

    #[test]
    fn test_cli_flags_win_over_file() {
        let file = FileConfig {
            output: Some(PathBuf::from("from-file.csv")),
            proxies: Some(vec!["http://10.0.0.1:8080".to_string()]),
            accept_invalid_certs: Some(false),
            ..FileConfig::default()
        };
        let cli = cli(&["keyscrape", "-o", "from-cli.csv", "--proxy", "none", "--insecure"]);
        let scrape = ScrapeArgs {
            max_pages: Some(4),
            test: true,
        };
        let config = build_scraper_config(&cli, &scrape, Some(&file)).unwrap();
        assert_eq!(config.output_path, PathBuf::from("from-cli.csv"));
        assert_eq!(config.proxy, ProxyMode::Disabled);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.max_pages, Some(4));
        assert!(config.test_mode);
    }

    #[test]
    fn test_dataset_path_precedence() {
        let file = FileConfig {
            output: Some(PathBuf::from("from-file.csv")),
            ..FileConfig::default()
        };
        assert_eq!(
            dataset_path(&cli(&["keyscrape"]), Some(&file)),
            PathBuf::from("from-file.csv")
        );
        assert_eq!(
            dataset_path(&cli(&["keyscrape", "-o", "x.csv"]), Some(&file)),
            PathBuf::from("x.csv")
        );
        assert_eq!(
            dataset_path(&cli(&["keyscrape"]), None),
            PathBuf::from("bitcoin_keys.csv")
        );
    }
}
