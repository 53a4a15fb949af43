//! Sluice main entry point
//!
//! This is the command-line interface for the Sluice forum crawler.

use anyhow::Context;
use clap::Parser;
use sluice::config::{load_config_with_hash, validate, Config};
use sluice::crawler::run_crawl;
use sluice::output::{generate_markdown_summary, print_statistics};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sluice: a sequential forum crawler and downloader
///
/// Sluice walks a paginated forum index from the highest page down to the
/// lowest, keeps posts whose titles match the configured keywords, and
/// downloads the file behind each post's redirect link through a real
/// Chromium browser.
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version = "1.0.0")]
#[command(about = "A sequential forum crawler and downloader", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the first (highest) list page
    #[arg(long, value_name = "N")]
    page_max: Option<u32>,

    /// Override the last (lowest) list page
    #[arg(long, value_name = "N")]
    page_min: Option<u32>,

    /// Replace the keyword filter (repeatable)
    #[arg(short, long = "keyword", value_name = "WORD")]
    keywords: Vec<String>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Override the download directory
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Validate config and show what would be crawled without launching a browser
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(page_max) = self.page_max {
            config.crawl.page_max = page_max;
        }
        if let Some(page_min) = self.page_min {
            config.crawl.page_min = page_min;
        }
        if !self.keywords.is_empty() {
            config.crawl.keywords = self.keywords.clone();
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(dir) = &self.download_dir {
            config.download.directory = dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    cli.apply_overrides(&mut config);
    validate(&config).context("invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sluice=info,warn"),
            1 => EnvFilter::new("sluice=debug,info"),
            2 => EnvFilter::new("sluice=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration and the
/// list pages that would be visited
fn handle_dry_run(config: &Config) {
    println!("=== Sluice Dry Run ===\n");

    println!("Site:");
    println!("  List URL template: {}", config.site.list_url_template);

    println!("\nCrawl:");
    println!(
        "  Pages: {} down to {}",
        config.crawl.page_max, config.crawl.page_min
    );
    println!("  Attempts per post: {}", config.crawl.try_count);
    if config.crawl.keywords.is_empty() {
        println!("  Keywords: (none, every post is kept)");
    } else {
        println!("  Keywords: {}", config.crawl.keywords.join(", "));
    }

    println!("\nTiming:");
    println!("  Navigation timeout: {}ms", config.timing.navigation_timeout_ms);
    println!("  Selector timeout: {}ms", config.timing.selector_timeout_ms);
    println!(
        "  Download start/complete timeout: {}ms / {}ms",
        config.timing.download_start_timeout_ms, config.timing.download_complete_timeout_ms
    );
    println!(
        "  Human delay: {}..{}ms",
        config.timing.human_delay_min_ms, config.timing.human_delay_max_ms
    );

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    if let Some(executable) = &config.browser.executable {
        println!("  Executable: {}", executable.display());
    }
    if let Some(proxy) = &config.browser.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nOutput:");
    println!("  Downloads: {}", config.download.directory.display());
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary.display());
    }

    println!("\nList pages:");
    for page in (config.crawl.page_min..=config.crawl.page_max).rev() {
        match sluice::url::list_page_url(&config.site.list_url_template, page) {
            Ok(url) => println!("  {:>4}  {}", page, url),
            Err(e) => println!("  {:>4}  invalid URL: {}", page, e),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling pages {} down to {} into {}",
        config.crawl.page_max,
        config.crawl.page_min,
        config.download.directory.display()
    );

    let summary_path = config.output.summary_path.clone();

    let report = match run_crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_statistics(&report);

    if let Some(path) = summary_path {
        generate_markdown_summary(&report, config_hash, &path)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        println!("\n✓ Summary written to: {}", path.display());
    }

    Ok(())
}
