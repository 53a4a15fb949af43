//! Crawl coordinator - list page traversal
//!
//! The coordinator owns the browser for the whole run and walks the list
//! pages from the highest number down to the lowest. For each page it:
//! - Navigates and checks the response status
//! - Checks the page is not a login/error wall
//! - Extracts and keyword-filters the post entries
//! - Hands each entry to the post processor, pausing between entries
//!
//! A failure on the list page itself stops the traversal. Failures inside a
//! post never reach this level.

use crate::browser::{BrowserEngine, PageSession, Readiness, ScopedPage};
use crate::config::Config;
use crate::crawler::classifier::ensure_clear;
use crate::crawler::{KeywordFilter, ListExtractor, Pacer, PostProcessor};
use crate::output::CrawlReport;
use crate::state::{CrawlState, StopReason};
use crate::url::list_page_url;
use crate::{BrowserResult, CrawlError};
use std::time::Duration;

/// Main crawler coordinator structure
pub struct Coordinator<B: BrowserEngine> {
    config: Config,
    browser: B,
    extractor: ListExtractor,
    filter: KeywordFilter,
    processor: PostProcessor,
    pacer: Pacer,
    navigation_timeout: Duration,
}

impl<B: BrowserEngine> Coordinator<B> {
    /// Creates a coordinator that drives `browser` according to `config`
    ///
    /// # Arguments
    ///
    /// * `config` - A validated crawler configuration
    /// * `browser` - The engine owned by this run until [`Coordinator::shutdown`]
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - All selectors and patterns compiled
    /// * `Err(CrawlError)` - A selector or pattern in the config is invalid
    pub fn new(config: Config, browser: B) -> Result<Self, CrawlError> {
        let extractor = ListExtractor::new(&config.selectors, config.timing.selector_timeout())?;
        let filter = KeywordFilter::new(&config.crawl.keywords);
        let processor = PostProcessor::from_config(&config)?;
        let pacer = Pacer::from_timing(&config.timing);
        let navigation_timeout = config.timing.navigation_timeout();

        Ok(Self {
            config,
            browser,
            extractor,
            filter,
            processor,
            pacer,
            navigation_timeout,
        })
    }

    /// Runs the traversal over the configured page range
    pub async fn run_configured(&self) -> Result<CrawlReport, CrawlError> {
        self.run(self.config.crawl.page_max, self.config.crawl.page_min)
            .await
    }

    /// Visits list pages `page_max` down to `page_min` inclusive
    ///
    /// A stopped traversal is still `Ok`: the stop reason is in the report's
    /// final state. Only a failure to open the list page tab is an error.
    pub async fn run(&self, page_max: u32, page_min: u32) -> Result<CrawlReport, CrawlError> {
        tracing::info!(page_max, page_min, "Starting crawl");

        let mut report = CrawlReport::new(page_max, page_min);
        let page = ScopedPage::open(&self.browser, "list pages").await?;
        let state = self.traverse(&*page, page_max, page_min, &mut report).await;
        page.close().await;
        report.finish(state);

        match &report.state {
            CrawlState::Stopped { page, reason } => {
                tracing::warn!(page, reason = %reason, "Crawl stopped early");
            }
            _ => tracing::info!(
                pages = report.pages_visited.len(),
                downloaded = report.downloaded_count(),
                abandoned = report.abandoned_count(),
                "Crawl completed"
            ),
        }

        Ok(report)
    }

    /// Closes the browser
    pub async fn shutdown(self) -> BrowserResult<()> {
        self.browser.shutdown().await
    }

    async fn traverse<P: PageSession>(
        &self,
        page: &P,
        page_max: u32,
        page_min: u32,
        report: &mut CrawlReport,
    ) -> CrawlState {
        let mut state = CrawlState::start(page_max, page_min);

        while let Some(page_number) = state.current_page() {
            report.pages_visited.push(page_number);

            match self.crawl_list_page(page, page_number, report).await {
                Ok(()) => state.advance(page_min),
                Err(e) => {
                    tracing::error!(page = page_number, error = %e, "List page failed");
                    state.stop(stop_reason(&e));
                }
            }
        }

        state
    }

    async fn crawl_list_page<P: PageSession>(
        &self,
        page: &P,
        page_number: u32,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlError> {
        let url = list_page_url(&self.config.site.list_url_template, page_number)?;
        tracing::info!(page = page_number, url = %url, "Visiting list page");

        let navigation = page
            .goto(&url, Readiness::DomContentLoaded, self.navigation_timeout)
            .await?;
        if !navigation.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: navigation.status,
            });
        }

        ensure_clear(page).await?;

        let entries = self.extractor.extract(page).await?;
        tracing::info!(page = page_number, count = entries.len(), "Extracted posts");
        report.entries_found += entries.len();

        let matched = self.filter.apply(entries);
        tracing::info!(
            page = page_number,
            count = matched.len(),
            "Posts matching keywords"
        );
        report.entries_matched += matched.len();

        for entry in matched {
            let outcome = self.processor.process(&self.browser, &entry).await;
            report.record(page_number, entry, outcome);
            self.pacer.pause().await;
        }

        Ok(())
    }
}

/// Maps a list page failure to the reason the traversal stops
fn stop_reason(err: &CrawlError) -> StopReason {
    match err {
        CrawlError::HttpStatus { status, .. } => StopReason::HttpStatus(*status),
        CrawlError::PageBlocked { signal, .. } => StopReason::Blocked(signal.to_string()),
        other => StopReason::PageFailure(other.to_string()),
    }
}
