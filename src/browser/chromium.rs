//! Chromium engine over the DevTools protocol
//!
//! This module implements the engine traits with `chromiumoxide`:
//! - launching Chromium with the configured flags and spawning the CDP handler
//! - navigating without waiting for the load event when only the DOM is needed
//! - reading the main document status from `Network.responseReceived`
//! - tracking in-flight requests for network-idle readiness
//! - polling for selectors and text-matched controls under a deadline
//! - capturing downloads through `Browser.downloadWillBegin`/`downloadProgress`

use crate::browser::{
    BrowserEngine, ControlQuery, Navigation, PageSession, Readiness, Transfer, TransferTimeouts,
};
use crate::config::BrowserConfig;
use crate::{BrowserError, BrowserResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    RequestId, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::EventDomContentEventFired;
use chromiumoxide::element::Element;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Interval between DOM probes while waiting for an element
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Window with no request in flight after which the network counts as idle
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// How long the document response may trail the navigation it belongs to
const STATUS_GRACE: Duration = Duration::from_secs(2);

/// A launched Chromium process
pub struct ChromiumEngine {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumEngine {
    /// Launches Chromium according to `config`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sluice::browser::ChromiumEngine;
    /// use sluice::config::BrowserConfig;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let engine = ChromiumEngine::launch(&BrowserConfig::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        let mut builder = LaunchConfig::builder();

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        if let Some(proxy) = &config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        for arg in &config.args {
            builder = builder.arg(arg.clone());
        }

        let launch_config = builder.build().map_err(BrowserError::Launch)?;
        let (browser, mut handler) = Browser::launch(launch_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            "Launched Chromium (headless: {}, proxy: {})",
            config.headless,
            config.proxy.as_deref().unwrap_or("none")
        );

        Ok(Self {
            browser,
            handler_task,
        })
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    type Page = ChromiumPage;

    async fn open_page(&self) -> BrowserResult<ChromiumPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(protocol)?;
        Ok(ChromiumPage { page })
    }

    async fn shutdown(mut self) -> BrowserResult<()> {
        let closed = self.browser.close().await.map_err(protocol);
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Failed to wait for Chromium to exit: {}", e);
        }
        self.handler_task.abort();
        closed.map(|_| ())
    }
}

/// One Chromium tab
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn url_string(&self) -> String {
        match self.page.url().await {
            Ok(Some(url)) => url,
            _ => "about:blank".to_string(),
        }
    }

    async fn ready_state(&self) -> BrowserResult<String> {
        self.page
            .evaluate("document.readyState")
            .await
            .map_err(protocol)?
            .into_value::<String>()
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn wait_ready(&self, readiness: Readiness) -> BrowserResult<()> {
        loop {
            let state = self.ready_state().await?;
            let ready = match readiness {
                Readiness::DomContentLoaded => state != "loading",
                Readiness::NetworkIdle => state == "complete",
            };
            if ready {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Starts a navigation and returns once the DOM of the new document is
    /// parsed
    ///
    /// `Page::goto` only resolves after the load event, so it is raced
    /// against `Page.domContentEventFired`.
    async fn navigate_until_dom(&self, url: &Url) -> BrowserResult<()> {
        let mut dom_ready = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(protocol)?;

        tokio::select! {
            loaded = self.page.goto(url.as_str()) => {
                loaded.map_err(|e| navigation_failed(url, e))?;
            }
            fired = dom_ready.next() => {
                if fired.is_none() {
                    return Err(BrowserError::Protocol(
                        "DOMContentLoaded event stream closed".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    async fn find_control(&self, control: &ControlQuery) -> BrowserResult<Option<Element>> {
        let candidates = self
            .page
            .find_elements(control.selector.as_str())
            .await
            .map_err(protocol)?;

        for element in candidates {
            let text = element.inner_text().await.map_err(protocol)?;
            if text.is_some_and(|t| control.matches_text(&t)) {
                return Ok(Some(element));
            }
        }

        Ok(None)
    }

    async fn bounded<T, F>(&self, what: &str, after: Duration, fut: F) -> BrowserResult<T>
    where
        F: Future<Output = BrowserResult<T>> + Send,
    {
        match tokio::time::timeout(after, fut).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout {
                what: what.to_string(),
                url: self.url_string().await,
                after,
            }),
        }
    }
}

#[async_trait]
impl PageSession for ChromiumPage {
    async fn goto(
        &self,
        url: &Url,
        readiness: Readiness,
        timeout: Duration,
    ) -> BrowserResult<Navigation> {
        // Subscribe first so neither the document response nor any request
        // of the new page can slip past.
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(protocol)?;
        let network = match readiness {
            Readiness::NetworkIdle => Some(NetworkTracker::subscribe(&self.page).await?),
            Readiness::DomContentLoaded => None,
        };

        let navigate = async {
            match network {
                None => self.navigate_until_dom(url).await?,
                Some(network) => {
                    self.page
                        .goto(url.as_str())
                        .await
                        .map_err(|e| navigation_failed(url, e))?;
                    network.until_idle().await?;
                }
            }
            self.wait_ready(readiness).await
        };

        match tokio::time::timeout(timeout, navigate).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BrowserError::Timeout {
                    what: "navigation".to_string(),
                    url: url.to_string(),
                    after: timeout,
                })
            }
        }

        Ok(Navigation {
            status: document_status(&mut responses).await,
        })
    }

    async fn current_url(&self) -> BrowserResult<Url> {
        let raw = self
            .page
            .url()
            .await
            .map_err(protocol)?
            .ok_or_else(|| BrowserError::Protocol("page has no URL".to_string()))?;
        Url::parse(&raw).map_err(|e| BrowserError::Protocol(format!("bad page URL {}: {}", raw, e)))
    }

    async fn content(&self) -> BrowserResult<String> {
        self.page.content().await.map_err(protocol)
    }

    async fn has_element(&self, selector: &str) -> BrowserResult<bool> {
        let found = self.page.find_elements(selector).await.map_err(protocol)?;
        Ok(!found.is_empty())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let what = format!("selector {}", selector);
        self.bounded(&what, timeout, async {
            while !self.has_element(selector).await? {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Ok(())
        })
        .await
    }

    async fn wait_for_control(
        &self,
        control: &ControlQuery,
        timeout: Duration,
    ) -> BrowserResult<()> {
        let what = control.to_string();
        self.bounded(&what, timeout, async {
            while self.find_control(control).await?.is_none() {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Ok(())
        })
        .await
    }

    async fn click_for_download(
        &self,
        control: &ControlQuery,
        staging_dir: &Path,
        timeouts: TransferTimeouts,
    ) -> BrowserResult<Transfer> {
        tokio::fs::create_dir_all(staging_dir).await?;
        self.page
            .execute(download_behavior(staging_dir)?)
            .await
            .map_err(protocol)?;

        let mut started_events = self
            .page
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(protocol)?;
        let mut progress_events = self
            .page
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(protocol)?;

        let element = self
            .find_control(control)
            .await?
            .ok_or_else(|| BrowserError::ElementNotFound(control.to_string()))?;
        element.click().await.map_err(protocol)?;

        let started = self
            .bounded("download to start", timeouts.start, async {
                started_events.next().await.ok_or_else(|| {
                    BrowserError::Protocol("download event stream closed".to_string())
                })
            })
            .await?;

        tracing::debug!(
            "Transfer {} started: {} ({})",
            started.guid,
            started.suggested_filename,
            started.url
        );

        let guid = started.guid.clone();
        let source_url = started.url.clone();
        self.bounded("download to complete", timeouts.complete, async {
            while let Some(event) = progress_events.next().await {
                if event.guid != guid {
                    continue;
                }
                match event.state {
                    DownloadProgressState::Completed => return Ok(()),
                    DownloadProgressState::Canceled => {
                        return Err(BrowserError::DownloadCanceled {
                            url: source_url.clone(),
                        })
                    }
                    DownloadProgressState::InProgress => {}
                }
            }
            Err(BrowserError::Protocol(
                "download progress stream closed".to_string(),
            ))
        })
        .await?;

        Ok(Transfer {
            suggested_filename: started.suggested_filename.clone(),
            staged_path: staging_dir.join(&started.suggested_filename),
            source_url: started.url.clone(),
        })
    }

    async fn close(self) -> BrowserResult<()> {
        self.page.close().await.map_err(protocol)
    }
}

/// `Browser.setDownloadBehavior` saving into `staging_dir` with download
/// events turned on
///
/// Chromium only emits `downloadWillBegin`/`downloadProgress` when
/// `eventsEnabled` is set, and it resolves a relative `downloadPath` against
/// its own working directory.
fn download_behavior(staging_dir: &Path) -> BrowserResult<SetDownloadBehaviorParams> {
    let download_path = std::path::absolute(staging_dir)?;
    SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(download_path.to_string_lossy().into_owned())
        .events_enabled(true)
        .build()
        .map_err(BrowserError::Protocol)
}

/// Status of the first main-document response on `responses`
///
/// The event can reach the listener slightly after the navigation settles,
/// so this waits up to [`STATUS_GRACE`] for it.
async fn document_status(responses: &mut EventStream<EventResponseReceived>) -> Option<u16> {
    let deadline = tokio::time::Instant::now() + STATUS_GRACE;
    loop {
        match tokio::time::timeout_at(deadline, responses.next()).await {
            Ok(Some(event)) if event.r#type == ResourceType::Document => {
                return u16::try_from(event.response.status).ok();
            }
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => {
                tracing::debug!("No document response observed");
                return None;
            }
        }
    }
}

/// Requests started but not yet finished or failed
#[derive(Debug, Default)]
struct InFlight {
    requests: HashSet<RequestId>,
}

impl InFlight {
    fn started(&mut self, id: RequestId) {
        self.requests.insert(id);
    }

    fn settled(&mut self, id: &RequestId) {
        self.requests.remove(id);
    }

    fn is_idle(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Network listeners registered before a navigation starts
struct NetworkTracker {
    started: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkTracker {
    async fn subscribe(page: &Page) -> BrowserResult<Self> {
        Ok(Self {
            started: page.event_listener().await.map_err(protocol)?,
            finished: page.event_listener().await.map_err(protocol)?,
            failed: page.event_listener().await.map_err(protocol)?,
        })
    }

    /// Resolves once no request has been in flight for [`IDLE_WINDOW`]
    async fn until_idle(mut self) -> BrowserResult<()> {
        let mut in_flight = InFlight::default();
        loop {
            tokio::select! {
                Some(event) = self.started.next() => in_flight.started(event.request_id.clone()),
                Some(event) = self.finished.next() => in_flight.settled(&event.request_id),
                Some(event) = self.failed.next() => in_flight.settled(&event.request_id),
                _ = tokio::time::sleep(IDLE_WINDOW), if in_flight.is_idle() => return Ok(()),
                else => {
                    return Err(BrowserError::Protocol(
                        "network event streams closed".to_string(),
                    ))
                }
            }
        }
    }
}

fn navigation_failed(url: &Url, err: chromiumoxide::error::CdpError) -> BrowserError {
    BrowserError::Navigation {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn protocol(err: chromiumoxide::error::CdpError) -> BrowserError {
    BrowserError::Protocol(err.to_string())
}
