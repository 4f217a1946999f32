//! CLI entry point for the price-list fetcher.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pricelist_core::download::robots::fetch_robots_rules;
use pricelist_core::listing::normalize_brand;
use pricelist_core::report::{DEALER_REPORT_PREFIX, DOCUMENT_REPORT_PREFIX};
use pricelist_core::user_agent::{UserAgentProvider, provider_from_setting};
use pricelist_core::{
    CrawlPolicy, DealerBrandMapping, DealerProcessor, DealerReport, DocumentDownloader,
    DownloadEngine, DownloadReport, HistoricalIndex, HttpClient, RateLimiter, RetryPolicy, RunMode,
    Site, Transport, write_report,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod output;

use app_config::{Settings, load_config};
use cli::{Args, Command, DealerFilter};
use output::Progress;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_config(args.config.as_deref())?;
    if loaded.loaded_from_file {
        info!(path = ?loaded.path, "loaded config file");
    }
    let settings = Settings::resolve(&args, &loaded.config);
    debug!(?settings, "effective settings");

    let site = Site::new(settings.base_url.clone());
    let user_agents: Arc<dyn UserAgentProvider> =
        Arc::from(provider_from_setting(settings.user_agent.as_deref()));
    let client = HttpClient::new(user_agents);

    let (policy, crawl_delay) = crawl_rules(&client, &site, &settings).await;
    if crawl_delay.is_zero() {
        debug!("crawl delay disabled");
    } else {
        debug!(crawl_delay_ms = crawl_delay.as_millis(), "crawl delay enabled");
    }

    let transport = Transport::new(
        client,
        RetryPolicy::with_max_attempts(settings.max_retries),
        Arc::new(RateLimiter::new(crawl_delay)),
        policy,
    );
    let downloader = DocumentDownloader::new(transport, &settings.output_dir);

    match args.command {
        Command::Latest(filter) => run_latest(&settings, downloader, site, &filter, args.quiet).await,
        Command::Archive { all, brand, dealers } => {
            let mode = if all { RunMode::All } else { RunMode::Brand };
            let filter = DealerFilter { brand, dealers };
            run_archive(&settings, downloader, site, mode, &filter, args.quiet).await
        }
        Command::Page { url, brand } => {
            run_page(&settings, downloader, site, &url, brand, args.quiet).await
        }
        Command::History { index, filter } => {
            run_history(&settings, downloader, site, &index, &filter, args.quiet).await
        }
    }
}

/// Site restrictions and the effective crawl delay.
///
/// With robots checking on, the delay is the larger of the configured and the
/// published one. An unreachable robots.txt leaves the configured rules in place.
async fn crawl_rules(client: &HttpClient, site: &Site, settings: &Settings) -> (CrawlPolicy, Duration) {
    let policy = CrawlPolicy::for_site(site);
    if !settings.check_robots {
        return (policy, settings.crawl_delay);
    }

    match fetch_robots_rules(client, site).await {
        Ok(rules) => {
            let delay = rules
                .crawl_delay
                .map_or(settings.crawl_delay, |published| published.max(settings.crawl_delay));
            (policy.with_robots(rules), delay)
        }
        Err(error) => {
            warn!(error = %error, "robots.txt unavailable; using configured rules");
            (policy, settings.crawl_delay)
        }
    }
}

fn load_mapping(settings: &Settings) -> Result<DealerBrandMapping> {
    let mapping = DealerBrandMapping::load(&settings.mapping_file)
        .context("A dealer mapping is required (set --mapping or `mapping_file`)")?;
    info!(dealers = mapping.len(), "loaded dealer mapping");
    Ok(mapping)
}

/// Dealer/brand pairs left after applying the brand and dealer filters.
fn select_dealers(mapping: &DealerBrandMapping, filter: &DealerFilter) -> Result<Vec<(String, String)>> {
    let scoped = mapping.restricted_to(&filter.dealers);
    let selected: Vec<(String, String)> = match &filter.brand {
        Some(brand) => {
            let matched = scoped.for_brand(brand);
            if matched.is_empty() {
                bail!(
                    "Unknown brand '{brand}'. Available brands: {}",
                    mapping.brands().join(", ")
                );
            }
            matched
                .into_iter()
                .map(|(d, b)| (d.to_string(), b.to_string()))
                .collect()
        }
        None => scoped
            .iter()
            .map(|(d, b)| (d.to_string(), b.to_string()))
            .collect(),
    };

    for dealer in &filter.dealers {
        if !selected.iter().any(|(id, _)| id == dealer) {
            warn!(dealer_id = %dealer, "dealer not selected; not in mapping or brand filter");
        }
    }
    Ok(selected)
}

async fn run_latest(
    settings: &Settings,
    downloader: DocumentDownloader,
    site: Site,
    filter: &DealerFilter,
    quiet: bool,
) -> Result<()> {
    let mapping = load_mapping(settings)?;
    let dealers = select_dealers(&mapping, filter)?;
    info!(dealers = dealers.len(), "fetching newest price lists");

    let progress = Progress::bounded(dealers.len(), quiet);
    progress.set_message("dealers");
    let processor = DealerProcessor::new(settings.dealer_concurrency, downloader, site)?
        .with_progress(progress.dealers());
    let outcomes = processor.process_all(dealers).await;
    progress.finish();

    let report = DealerReport::new(
        RunMode::Latest,
        filter.brand.clone(),
        &settings.output_dir,
        outcomes,
    );
    let path = write_report(&settings.report_dir, DEALER_REPORT_PREFIX, &report)
        .context("Failed to write run report")?;
    output::print_dealer_summary(&report.summary, &path);
    Ok(())
}

async fn run_archive(
    settings: &Settings,
    downloader: DocumentDownloader,
    site: Site,
    mode: RunMode,
    filter: &DealerFilter,
    quiet: bool,
) -> Result<()> {
    let mapping = load_mapping(settings)?;
    let dealers = select_dealers(&mapping, filter)?;
    info!(dealers = dealers.len(), "fetching every listed price list");

    let progress = Progress::unbounded(quiet);
    let engine = DownloadEngine::new(settings.concurrency, downloader, site.clone())?
        .with_progress(progress.documents());

    let mut outcomes = Vec::new();
    for (dealer_id, brand) in &dealers {
        progress.set_message(format!("{brand} ({dealer_id})"));
        let listing_url = site.listing_url(dealer_id, brand);
        outcomes.extend(engine.download_all_from_listing(&listing_url, Some(brand)).await);
    }
    progress.finish();

    finish_documents(settings, mode, filter.brand.clone(), outcomes)
}

async fn run_page(
    settings: &Settings,
    downloader: DocumentDownloader,
    site: Site,
    url: &str,
    brand: Option<String>,
    quiet: bool,
) -> Result<()> {
    let progress = Progress::unbounded(quiet);
    progress.set_message(url.to_string());
    let engine = DownloadEngine::new(settings.concurrency, downloader, site)?
        .with_progress(progress.documents());
    let outcomes = engine.download_all_from_listing(url, brand.as_deref()).await;
    progress.finish();

    finish_documents(settings, RunMode::Page, brand, outcomes)
}

async fn run_history(
    settings: &Settings,
    downloader: DocumentDownloader,
    site: Site,
    index_path: &Path,
    filter: &DealerFilter,
    quiet: bool,
) -> Result<()> {
    let index = HistoricalIndex::load(index_path)?;
    let mapping = load_mapping(settings)?;
    let wanted_brand = filter.brand.as_deref().map(normalize_brand);

    let mut dealers = Vec::new();
    for dealer_id in index.dealer_ids() {
        if !filter.dealers.is_empty() && !filter.dealers.iter().any(|d| d == dealer_id) {
            continue;
        }
        let Some(brand) = mapping.brand_of(dealer_id) else {
            warn!(dealer_id, "dealer in index but not in mapping; skipping");
            continue;
        };
        if wanted_brand.as_ref().is_some_and(|wanted| *wanted != normalize_brand(brand)) {
            continue;
        }
        dealers.push((dealer_id.to_string(), brand.to_string()));
    }
    info!(dealers = dealers.len(), "replaying historical discovery");

    let progress = Progress::unbounded(quiet);
    let engine = DownloadEngine::new(settings.concurrency, downloader, site)?
        .with_progress(progress.documents());

    let mut outcomes = Vec::new();
    for (dealer_id, brand) in &dealers {
        progress.set_message(format!("{brand} ({dealer_id})"));
        outcomes.extend(engine.download_historical(&index, dealer_id, brand).await);
    }
    progress.finish();

    finish_documents(settings, RunMode::History, filter.brand.clone(), outcomes)
}

fn finish_documents(
    settings: &Settings,
    mode: RunMode,
    brand_filter: Option<String>,
    outcomes: Vec<pricelist_core::DownloadOutcome>,
) -> Result<()> {
    let report = DownloadReport::new(mode, brand_filter, &settings.output_dir, outcomes);
    let path = write_report(&settings.report_dir, DOCUMENT_REPORT_PREFIX, &report)
        .context("Failed to write run report")?;
    output::print_download_summary(&report.summary, &path);
    Ok(())
}
