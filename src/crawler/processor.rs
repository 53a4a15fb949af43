//! Per-post processing with a bounded retry loop
//!
//! Each attempt runs in its own scoped tab:
//! 1. Navigate to the post and check it is not a login/error wall
//! 2. Pause like a reader would
//! 3. Resolve the redirect link from the post content
//! 4. Navigate to the redirect page, check it, and run the download
//!
//! The first successful attempt ends the loop. Every failure inside an
//! attempt is absorbed here: after the last attempt the post is abandoned
//! and the crawl moves on.

use crate::browser::{BrowserEngine, PageSession, Readiness, ScopedPage};
use crate::config::Config;
use crate::crawler::classifier::ensure_clear;
use crate::crawler::{DownloadExecutor, DownloadResult, LinkResolver, Pacer, PostEntry};
use crate::state::EntryPhase;
use crate::{ConfigError, CrawlError};
use std::time::Duration;

/// Terminal result for one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A file was saved on attempt `attempts`
    Downloaded {
        result: DownloadResult,
        attempts: u32,
    },

    /// Every attempt failed
    Abandoned { attempts: u32, last_error: String },
}

impl EntryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Downloaded { attempts, .. } | Self::Abandoned { attempts, .. } => *attempts,
        }
    }

    pub fn phase(&self) -> EntryPhase {
        match self {
            Self::Downloaded { .. } => EntryPhase::Succeeded,
            Self::Abandoned { .. } => EntryPhase::Abandoned,
        }
    }
}

/// Runs the retry state machine for single posts
#[derive(Debug, Clone)]
pub struct PostProcessor {
    resolver: LinkResolver,
    executor: DownloadExecutor,
    pacer: Pacer,
    try_count: u32,
    navigation_timeout: Duration,
}

impl PostProcessor {
    pub fn new(
        resolver: LinkResolver,
        executor: DownloadExecutor,
        pacer: Pacer,
        try_count: u32,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            executor,
            pacer,
            try_count,
            navigation_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            LinkResolver::new(&config.selectors, config.timing.selector_timeout())?,
            DownloadExecutor::from_config(config)?,
            Pacer::from_timing(&config.timing),
            config.crawl.try_count,
            config.timing.navigation_timeout(),
        ))
    }

    pub fn try_count(&self) -> u32 {
        self.try_count
    }

    /// Processes one post until it downloads or runs out of attempts
    pub async fn process<B: BrowserEngine>(&self, browser: &B, entry: &PostEntry) -> EntryOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.try_count {
            tracing::info!(
                attempt,
                title = %entry.title,
                url = %entry.url,
                "Processing post"
            );

            match self.attempt(browser, entry).await {
                Ok(result) => {
                    tracing::info!(
                        attempt,
                        path = %result.path.display(),
                        "Download complete"
                    );
                    return EntryOutcome::Downloaded {
                        result,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    if e.is_entry_recoverable() {
                        tracing::warn!(attempt, error = %e, "Attempt failed");
                    } else {
                        tracing::error!(attempt, error = %e, "Attempt failed locally");
                    }
                    last_error = e.to_string();

                    if EntryPhase::after_failure(attempt, self.try_count).is_terminal() {
                        tracing::warn!(
                            title = %entry.title,
                            "Retry budget exhausted, skipping post"
                        );
                    } else {
                        tracing::info!(next = attempt + 1, "Retrying post");
                        self.pacer.pause().await;
                    }
                }
            }
        }

        EntryOutcome::Abandoned {
            attempts: self.try_count,
            last_error,
        }
    }

    /// One attempt in a fresh tab that is closed whatever the outcome
    async fn attempt<B: BrowserEngine>(
        &self,
        browser: &B,
        entry: &PostEntry,
    ) -> Result<DownloadResult, CrawlError> {
        let page = ScopedPage::open(browser, entry.url.as_str()).await?;
        let result = self.drive(&*page, entry).await;
        page.close().await;
        result
    }

    async fn drive<P: PageSession>(
        &self,
        page: &P,
        entry: &PostEntry,
    ) -> Result<DownloadResult, CrawlError> {
        tracing::debug!(phase = %EntryPhase::Navigating, url = %entry.url);
        page.goto(&entry.url, Readiness::DomContentLoaded, self.navigation_timeout)
            .await?;

        tracing::debug!(phase = %EntryPhase::Checking);
        ensure_clear(page).await?;

        self.pacer.pause().await;

        tracing::debug!(phase = %EntryPhase::Resolving);
        let link = self
            .resolver
            .resolve(page)
            .await?
            .ok_or_else(|| CrawlError::LinkNotFound {
                url: entry.url.to_string(),
            })?;
        tracing::info!(link = %link, "Found redirect link");

        tracing::debug!(phase = %EntryPhase::Downloading, url = %link);
        page.goto(&link, Readiness::DomContentLoaded, self.navigation_timeout)
            .await?;
        ensure_clear(page).await?;

        self.executor.execute(page, &self.pacer).await
    }
}
