//! Browser engine seam
//!
//! The crawler never talks to a browser directly. It drives pages through
//! the [`BrowserEngine`] and [`PageSession`] traits, which expose exactly what
//! the pipeline needs:
//! - navigation with a readiness criterion and a bounded wait
//! - bounded waits for selectors and for text-matched controls
//! - the page URL and serialized DOM, for classification and extraction
//! - a click that captures the file transfer it triggers
//!
//! [`ChromiumEngine`] is the production implementation.

mod chromium;
mod scoped;

pub use chromium::{ChromiumEngine, ChromiumPage};
pub use scoped::ScopedPage;

use crate::BrowserResult;
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Point at which a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The DOM is parsed; subresources may still be loading
    DomContentLoaded,

    /// The document finished loading and no request was in flight for a
    /// short quiet window
    NetworkIdle,
}

/// Outcome of a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// Status of the main document response, if one was observed
    pub status: Option<u16>,
}

impl Navigation {
    /// Returns true for a response status in [200, 300)
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
    }
}

/// Locates a clickable control by tag and visible text
#[derive(Debug, Clone)]
pub struct ControlQuery {
    /// CSS selector for candidate elements, usually a tag name
    pub selector: String,

    /// Case-insensitive pattern the visible text must match
    pub text: Regex,
}

impl ControlQuery {
    /// Builds a query matching `selector` elements whose text contains
    /// `text`, ignoring case
    pub fn new(selector: &str, text: &str) -> Result<Self, regex::Error> {
        let text = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            selector: selector.to_string(),
            text,
        })
    }

    pub fn matches_text(&self, visible_text: &str) -> bool {
        self.text.is_match(visible_text)
    }
}

impl fmt::Display for ControlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with text /{}/i", self.selector, self.text.as_str())
    }
}

/// Bounds on a file transfer
#[derive(Debug, Clone, Copy)]
pub struct TransferTimeouts {
    /// Wait for the transfer-started signal after the click
    pub start: Duration,

    /// Wait for the started transfer to finish
    pub complete: Duration,
}

/// A finished file transfer, still sitting in the staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Filename proposed by the engine (from Content-Disposition or the URL)
    pub suggested_filename: String,

    /// Where the engine wrote the bytes
    pub staged_path: PathBuf,

    /// URL the bytes came from
    pub source_url: String,
}

/// One browser tab
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigates to `url` and waits until `readiness` holds, at most `timeout`
    async fn goto(
        &self,
        url: &Url,
        readiness: Readiness,
        timeout: Duration,
    ) -> BrowserResult<Navigation>;

    /// URL currently loaded, after any redirects
    async fn current_url(&self) -> BrowserResult<Url>;

    /// Serialized DOM of the current document
    async fn content(&self) -> BrowserResult<String>;

    /// Returns true if any element matches `selector` right now
    async fn has_element(&self, selector: &str) -> BrowserResult<bool>;

    /// Waits until an element matches `selector`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Waits until a control matching `control` is present
    async fn wait_for_control(&self, control: &ControlQuery, timeout: Duration)
        -> BrowserResult<()>;

    /// Clicks the control and captures the transfer it triggers into
    /// `staging_dir`
    ///
    /// Implementations must subscribe to the transfer-started signal before
    /// the click is dispatched, otherwise a fast transfer can be missed.
    async fn click_for_download(
        &self,
        control: &ControlQuery,
        staging_dir: &Path,
        timeouts: TransferTimeouts,
    ) -> BrowserResult<Transfer>;

    /// Closes the tab
    async fn close(self) -> BrowserResult<()>;
}

/// A running browser owning every tab the crawl uses
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    type Page: PageSession;

    /// Opens a new blank tab
    async fn open_page(&self) -> BrowserResult<Self::Page>;

    /// Closes the browser and every remaining tab
    async fn shutdown(self) -> BrowserResult<()>;
}
