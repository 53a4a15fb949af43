//! List and post page extraction
//!
//! This module reads two kinds of pages:
//! - list pages, yielding the (title, URL) of every post row
//! - post pages, yielding the redirect link embedded in the post content
//!
//! Parsing works on serialized HTML so it can be tested without a browser;
//! the async wrappers add the bounded wait for the container element.

use crate::browser::PageSession;
use crate::config::SelectorConfig;
use crate::url::resolve_href;
use crate::{ConfigError, CrawlError};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// One post discovered on a list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEntry {
    /// Anchor text, trimmed
    pub title: String,

    /// Absolute post URL
    pub url: Url,
}

fn parse_selector(name: &str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| {
        ConfigError::InvalidPattern(format!("{} '{}' is not a valid selector: {:?}", name, css, e))
    })
}

/// Extracts post entries from list pages
#[derive(Debug, Clone)]
pub struct ListExtractor {
    container: String,
    rows: Selector,
    link: Selector,
    timeout: Duration,
}

impl ListExtractor {
    pub fn new(selectors: &SelectorConfig, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            container: selectors.list_container.clone(),
            rows: parse_selector("list_row", &selectors.list_row)?,
            link: parse_selector("post_link", &selectors.post_link)?,
            timeout,
        })
    }

    /// Parses list page HTML into entries, top to bottom
    ///
    /// The first row is the table header and is skipped. Rows without a
    /// matching post anchor are skipped silently.
    pub fn parse(&self, html: &str, base: &Url) -> Vec<PostEntry> {
        let document = Html::parse_document(html);

        document
            .select(&self.rows)
            .skip(1)
            .filter_map(|row| {
                let anchor = row.select(&self.link).next()?;
                let href = anchor.value().attr("href")?;
                let url = resolve_href(href, base)?;
                let title = anchor.text().collect::<String>().trim().to_string();
                Some(PostEntry { title, url })
            })
            .collect()
    }

    /// Waits for the list container, then parses the loaded page
    ///
    /// A missing container is a page-level failure surfaced as
    /// [`CrawlError::Timeout`].
    pub async fn extract<P: PageSession>(&self, page: &P) -> Result<Vec<PostEntry>, CrawlError> {
        page.wait_for_selector(&self.container, self.timeout).await?;
        let base = page.current_url().await?;
        let html = page.content().await?;
        Ok(self.parse(&html, &base))
    }
}

/// Finds the outbound redirect link inside a post
#[derive(Debug, Clone)]
pub struct LinkResolver {
    container_css: String,
    container: Selector,
    anchor: Selector,
    marker: String,
    timeout: Duration,
}

impl LinkResolver {
    pub fn new(selectors: &SelectorConfig, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            container_css: selectors.content_container.clone(),
            container: parse_selector("content_container", &selectors.content_container)?,
            anchor: parse_selector("anchor", "a[href]")?,
            marker: selectors.redirect_marker.clone(),
            timeout,
        })
    }

    /// Returns the first anchor in the content area whose href contains the
    /// redirect marker, resolved against `base`
    pub fn find(&self, html: &str, base: &Url) -> Option<Url> {
        let document = Html::parse_document(html);

        document
            .select(&self.container)
            .flat_map(|content| content.select(&self.anchor))
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter(|href| href.contains(&self.marker))
            .find_map(|href| resolve_href(href, base))
    }

    /// Waits for the content container, then looks for the redirect link
    ///
    /// `Ok(None)` means the post has no download; a container that never
    /// appears is an error instead.
    pub async fn resolve<P: PageSession>(&self, page: &P) -> Result<Option<Url>, CrawlError> {
        page.wait_for_selector(&self.container_css, self.timeout).await?;
        let base = page.current_url().await?;
        let html = page.content().await?;
        Ok(self.find(&html, &base))
    }
}
