//! Crawler module for list traversal and post downloads
//!
//! This module contains the core crawling logic, including:
//! - Login/error wall classification
//! - List page extraction and keyword filtering
//! - Redirect link resolution and download execution
//! - The per-post retry loop and the list page traversal

mod classifier;
mod coordinator;
mod downloader;
mod filter;
mod pacer;
mod parser;
mod processor;

pub use classifier::{
    classify_page, ensure_clear, inspect_page, BlockSignal, PageVerdict, LOGIN_FORM_SELECTOR,
};
pub use coordinator::Coordinator;
pub use downloader::{safe_filename, DownloadExecutor, DownloadResult};
pub use filter::KeywordFilter;
pub use pacer::Pacer;
pub use parser::{LinkResolver, ListExtractor, PostEntry};
pub use processor::{EntryOutcome, PostProcessor};

use crate::browser::ChromiumEngine;
use crate::config::Config;
use crate::output::CrawlReport;
use crate::CrawlError;

/// Runs a complete crawl with a freshly launched Chromium
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Launch the browser described by `config.browser`
/// 2. Traverse the configured page range
/// 3. Shut the browser down, whatever the traversal outcome
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The traversal completed or stopped early
/// * `Err(CrawlError)` - The browser could not be launched or driven
pub async fn run_crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    let browser = ChromiumEngine::launch(&config.browser).await?;
    let coordinator = Coordinator::new(config, browser)?;

    let result = coordinator.run_configured().await;

    if let Err(e) = coordinator.shutdown().await {
        tracing::warn!("Failed to shut down browser: {}", e);
    }

    result
}
