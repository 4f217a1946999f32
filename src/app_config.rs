//! Application configuration: config file loading and flag resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pricelist_core::download::constants::DEFAULT_CRAWL_DELAY;
use pricelist_core::site::DEFAULT_BASE_URL;
use pricelist_core::{DEFAULT_CONCURRENCY, DEFAULT_DEALER_CONCURRENCY, DEFAULT_MAX_RETRIES};
use serde::Deserialize;

use crate::cli::Args;

/// Default output root for documents.
pub const DEFAULT_OUTPUT_DIR: &str = "data/pricelists";

/// Default directory for run reports.
pub const DEFAULT_REPORT_DIR: &str = "data";

/// Default dealer mapping file.
pub const DEFAULT_MAPPING_FILE: &str = "data/dealer_brand_mapping.json";

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Root directory documents are filed under.
    pub output_dir: Option<PathBuf>,
    /// Directory run reports are written to.
    pub report_dir: Option<PathBuf>,
    /// Dealer to brand mapping file.
    pub mapping_file: Option<PathBuf>,
    /// Site base URL.
    pub base_url: Option<String>,
    /// Concurrent document downloads (same range as CLI).
    pub concurrency: Option<u32>,
    /// Concurrent dealers (same range as CLI).
    pub dealer_concurrency: Option<u32>,
    /// Attempts per request when rate limited.
    pub max_retries: Option<u32>,
    /// Minimum delay between requests to the site in milliseconds.
    pub crawl_delay_ms: Option<u64>,
    /// Load and honour robots.txt.
    pub check_robots: Option<bool>,
    /// `"random"`, `"rotate"` or a literal User-Agent.
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Validates config values against the same constraints as the CLI.
    pub fn validate(&self) -> Result<()> {
        validate_range("concurrency", self.concurrency, 1..=100)?;
        validate_range("dealer_concurrency", self.dealer_concurrency, 1..=100)?;
        validate_range("max_retries", self.max_retries, 1..=10)?;

        if let Some(crawl_delay_ms) = self.crawl_delay_ms
            && crawl_delay_ms > 60_000
        {
            bail!("Invalid config value for `crawl_delay_ms`: {crawl_delay_ms}. Expected range: 0..=60000");
        }

        if let Some(base_url) = &self.base_url
            && url::Url::parse(base_url).is_err()
        {
            bail!("Invalid config value for `base_url`: '{base_url}' is not an absolute URL");
        }

        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u32>, range: std::ops::RangeInclusive<u32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path that was consulted, if one could be determined.
    pub path: Option<PathBuf>,
    /// Parsed config when a file existed.
    pub config: FileConfig,
    /// Whether configuration was read from disk.
    pub loaded_from_file: bool,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/pricelists/config.toml`
/// 2. `$HOME/.config/pricelists/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("pricelists")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("pricelists")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            ..LoadedConfig::default()
        }),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Effective run settings after applying CLI flag > config file > default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root directory documents are filed under.
    pub output_dir: PathBuf,
    /// Directory run reports are written to.
    pub report_dir: PathBuf,
    /// Dealer to brand mapping file.
    pub mapping_file: PathBuf,
    /// Site base URL.
    pub base_url: String,
    /// Concurrent document downloads.
    pub concurrency: usize,
    /// Concurrent dealers.
    pub dealer_concurrency: usize,
    /// Attempts per request.
    pub max_retries: u32,
    /// Minimum spacing between requests; zero disables.
    pub crawl_delay: Duration,
    /// Load and honour robots.txt.
    pub check_robots: bool,
    /// User-Agent setting passed to the provider factory.
    pub user_agent: Option<String>,
}

impl Settings {
    /// Merges parsed flags over a file config.
    #[must_use]
    pub fn resolve(args: &Args, file: &FileConfig) -> Self {
        Self {
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            report_dir: args
                .report_dir
                .clone()
                .or_else(|| file.report_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR)),
            mapping_file: args
                .mapping
                .clone()
                .or_else(|| file.mapping_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAPPING_FILE)),
            base_url: args
                .base_url
                .clone()
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            concurrency: args
                .concurrency
                .map(u32::from)
                .or(file.concurrency)
                .map_or(DEFAULT_CONCURRENCY, |v| v as usize),
            dealer_concurrency: args
                .dealer_concurrency
                .map(u32::from)
                .or(file.dealer_concurrency)
                .map_or(DEFAULT_DEALER_CONCURRENCY, |v| v as usize),
            max_retries: args
                .max_retries
                .map(u32::from)
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            crawl_delay: args
                .crawl_delay
                .or(file.crawl_delay_ms)
                .map_or(DEFAULT_CRAWL_DELAY, Duration::from_millis),
            check_robots: args.check_robots || file.check_robots.unwrap_or(false),
            user_agent: args.user_agent.clone().or_else(|| file.user_agent.clone()),
        }
    }
}
