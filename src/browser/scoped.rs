use crate::browser::{BrowserEngine, PageSession};
use crate::BrowserResult;
use std::ops::Deref;

/// A secondary tab whose lifetime is tied to one unit of work
///
/// Open it, use it through `Deref`, and call [`ScopedPage::close`] on every
/// exit path. Closing is async, so `Drop` can only report a tab that was
/// never closed (a cancelled future or a panic).
pub struct ScopedPage<P: PageSession> {
    page: Option<P>,
    label: String,
}

impl<P: PageSession> ScopedPage<P> {
    /// Opens a fresh tab on `browser`
    pub async fn open<B>(browser: &B, label: impl Into<String>) -> BrowserResult<Self>
    where
        B: BrowserEngine<Page = P>,
    {
        let page = browser.open_page().await?;
        let label = label.into();
        tracing::trace!("Opened scoped page for {}", label);
        Ok(Self {
            page: Some(page),
            label,
        })
    }

    /// Closes the tab; a failing close is logged, never propagated
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            match page.close().await {
                Ok(()) => tracing::trace!("Closed scoped page for {}", self.label),
                Err(e) => tracing::warn!("Failed to close page for {}: {}", self.label, e),
            }
        }
    }
}

impl<P: PageSession> Deref for ScopedPage<P> {
    type Target = P;

    fn deref(&self) -> &P {
        // Only `close` takes the page, and it consumes the guard.
        self.page
            .as_ref()
            .expect("ScopedPage: page already closed")
    }
}

impl<P: PageSession> Drop for ScopedPage<P> {
    fn drop(&mut self) {
        if self.page.is_some() {
            tracing::warn!("Scoped page for {} dropped without being closed", self.label);
        }
    }
}
