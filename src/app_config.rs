//! Config file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// `key = value` file configuration; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Listing root URL.
    pub base_url: Option<String>,
    /// Dataset CSV path.
    pub output: Option<PathBuf>,
    /// Proxy rotation pool used by `--proxy auto`.
    pub proxies: Option<Vec<String>>,
    /// User-agent pool.
    pub user_agents: Option<Vec<String>>,
    /// Lower politeness delay bound in milliseconds.
    pub min_delay_ms: Option<u64>,
    /// Upper politeness delay bound in milliseconds.
    pub max_delay_ms: Option<u64>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Fetch attempts per page.
    pub max_attempts: Option<u32>,
    /// Flush every N pages.
    pub save_interval: Option<u32>,
    /// Consecutive empty pages before stopping.
    pub empty_page_limit: Option<u32>,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: Option<bool>,
}

impl FileConfig {
    /// Validates values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = self.base_url.as_deref() {
            let parsed = url::Url::parse(base_url)
                .with_context(|| format!("Invalid config value for `base_url`: {base_url}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Invalid config value for `base_url`: {base_url}. Expected an http(s) URL");
            }
        }

        if let (Some(min), Some(max)) = (self.min_delay_ms, self.max_delay_ms)
            && min > max
        {
            bail!("Invalid config values: `min_delay_ms` ({min}) exceeds `max_delay_ms` ({max})");
        }

        if let Some(timeout) = self.request_timeout_secs
            && !(1..=3600).contains(&timeout)
        {
            bail!(
                "Invalid config value for `request_timeout_secs`: {timeout}. Expected range: 1..=3600"
            );
        }

        validate_positive("max_attempts", self.max_attempts)?;
        validate_positive("save_interval", self.save_interval)?;
        validate_positive("empty_page_limit", self.empty_page_limit)?;

        Ok(())
    }
}

fn validate_positive(field: &str, value: Option<u32>) -> Result<()> {
    if value == Some(0) {
        bail!("Invalid config value for `{field}`: 0. Expected at least 1");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/keyscrape/config.toml`
/// 2. `$HOME/.config/keyscrape/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("keyscrape")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("keyscrape")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "base_url" => {
                cfg.base_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "output" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.output = Some(PathBuf::from(parsed));
            }
            "proxies" => {
                cfg.proxies = Some(parse_string_array(value).with_context(context)?);
            }
            "user_agents" => {
                cfg.user_agents = Some(parse_string_array(value).with_context(context)?);
            }
            "min_delay_ms" => {
                cfg.min_delay_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "max_delay_ms" => {
                cfg.max_delay_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "max_attempts" => {
                cfg.max_attempts = Some(parse_integer_u32(value).with_context(context)?);
            }
            "save_interval" => {
                cfg.save_interval = Some(parse_integer_u32(value).with_context(context)?);
            }
            "empty_page_limit" => {
                cfg.empty_page_limit = Some(parse_integer_u32(value).with_context(context)?);
            }
            "accept_invalid_certs" => {
                cfg.accept_invalid_certs = Some(parse_boolean(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

/// `["a", "b"]`; a trailing comma is allowed.
fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected array of double-quoted strings");
    };

    let mut items = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (index, ch) in inner.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            ',' if !in_string => {
                push_array_item(&mut items, &inner[start..index])?;
                start = index + 1;
            }
            _ => {}
        }
    }
    if in_string {
        bail!("Unterminated string in array");
    }
    push_array_item(&mut items, &inner[start..])?;
    Ok(items)
}

fn push_array_item(items: &mut Vec<String>, raw_item: &str) -> Result<()> {
    let item = raw_item.trim();
    if !item.is_empty() {
        items.push(parse_string_literal(item)?);
    }
    Ok(())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_integer_u32(raw_value: &str) -> Result<u32> {
    let value = parse_integer_u64(raw_value)?;
    u32::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
