//! Scripted in-memory browser engine
//!
//! Documents are registered per URL. Each URL holds a queue of responses:
//! a visit takes the front document, and the last one repeats forever, so a
//! post can be blocked on the first visit and clear on the next. Every visit
//! and every tab open/close is counted for assertions.

use async_trait::async_trait;
use scraper::{Html, Selector};
use sluice::browser::{
    BrowserEngine, ControlQuery, Navigation, PageSession, Readiness, Transfer, TransferTimeouts,
};
use sluice::{BrowserError, BrowserResult};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// One scripted response
#[derive(Debug, Clone)]
pub struct Doc {
    pub status: Option<u16>,
    pub html: String,

    /// URL the tab ends up on, when the server redirects
    pub final_url: Option<Url>,

    /// File delivered when the download control is clicked
    pub download: Option<(String, Vec<u8>)>,
}

impl Doc {
    pub fn ok(html: impl Into<String>) -> Self {
        Self {
            status: Some(200),
            html: html.into(),
            final_url: None,
            download: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            html: "<html><body></body></html>".to_string(),
            final_url: None,
            download: None,
        }
    }

    /// Navigation that never received a document response
    pub fn no_response() -> Self {
        Self {
            status: None,
            ..Self::status(0)
        }
    }

    pub fn redirected_to(mut self, url: &str) -> Self {
        self.final_url = Some(Url::parse(url).unwrap());
        self
    }

    pub fn with_download(mut self, filename: &str, bytes: &[u8]) -> Self {
        self.download = Some((filename.to_string(), bytes.to_vec()));
        self
    }
}

#[derive(Default)]
pub struct Site {
    docs: Mutex<HashMap<String, VecDeque<Doc>>>,
    visits: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Site {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues `docs` as the successive responses for `url`
    pub fn serve(&self, url: &str, docs: Vec<Doc>) {
        let key = Url::parse(url).unwrap().to_string();
        self.docs.lock().unwrap().insert(key, docs.into());
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn visit_count(&self, url: &str) -> usize {
        let key = Url::parse(url).unwrap().to_string();
        self.visits().iter().filter(|v| **v == key).count()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn respond(&self, url: &Url) -> Doc {
        self.visits.lock().unwrap().push(url.to_string());

        let mut docs = self.docs.lock().unwrap();
        match docs.get_mut(url.as_str()) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Doc::status(404),
        }
    }
}

pub struct ScriptedEngine {
    site: Arc<Site>,
}

impl ScriptedEngine {
    pub fn new(site: Arc<Site>) -> Self {
        Self { site }
    }
}

#[async_trait]
impl BrowserEngine for ScriptedEngine {
    type Page = ScriptedTab;

    async fn open_page(&self) -> BrowserResult<ScriptedTab> {
        self.site.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedTab {
            site: Arc::clone(&self.site),
            current: Mutex::new(None),
        })
    }

    async fn shutdown(self) -> BrowserResult<()> {
        Ok(())
    }
}

pub struct ScriptedTab {
    site: Arc<Site>,
    current: Mutex<Option<(Url, Doc)>>,
}

impl ScriptedTab {
    fn loaded(&self) -> (Url, Doc) {
        self.current
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| (Url::parse("about:blank").unwrap(), Doc::ok("")))
    }

    fn expired(&self, what: String, after: Duration) -> BrowserError {
        BrowserError::Timeout {
            what,
            url: self.loaded().0.to_string(),
            after,
        }
    }
}

fn matches_selector(html: &str, css: &str) -> bool {
    let selector = Selector::parse(css).unwrap();
    Html::parse_document(html).select(&selector).next().is_some()
}

fn matches_control(html: &str, control: &ControlQuery) -> bool {
    let selector = Selector::parse(&control.selector).unwrap();
    Html::parse_document(html)
        .select(&selector)
        .any(|element| control.matches_text(&element.text().collect::<String>()))
}

#[async_trait]
impl PageSession for ScriptedTab {
    async fn goto(
        &self,
        url: &Url,
        _readiness: Readiness,
        _timeout: Duration,
    ) -> BrowserResult<Navigation> {
        let doc = self.site.respond(url);
        let status = doc.status;
        let landed = doc.final_url.clone().unwrap_or_else(|| url.clone());
        *self.current.lock().unwrap() = Some((landed, doc));
        Ok(Navigation { status })
    }

    async fn current_url(&self) -> BrowserResult<Url> {
        Ok(self.loaded().0)
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.loaded().1.html)
    }

    async fn has_element(&self, selector: &str) -> BrowserResult<bool> {
        Ok(matches_selector(&self.loaded().1.html, selector))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        if matches_selector(&self.loaded().1.html, selector) {
            Ok(())
        } else {
            Err(self.expired(format!("selector {}", selector), timeout))
        }
    }

    async fn wait_for_control(
        &self,
        control: &ControlQuery,
        timeout: Duration,
    ) -> BrowserResult<()> {
        if matches_control(&self.loaded().1.html, control) {
            Ok(())
        } else {
            Err(self.expired(control.to_string(), timeout))
        }
    }

    async fn click_for_download(
        &self,
        control: &ControlQuery,
        staging_dir: &Path,
        timeouts: TransferTimeouts,
    ) -> BrowserResult<Transfer> {
        let (url, doc) = self.loaded();
        if !matches_control(&doc.html, control) {
            return Err(BrowserError::ElementNotFound(control.to_string()));
        }

        let (filename, bytes) = doc
            .download
            .ok_or_else(|| self.expired("download to start".to_string(), timeouts.start))?;

        std::fs::create_dir_all(staging_dir)?;
        let staged_path = staging_dir.join(&filename);
        std::fs::write(&staged_path, bytes)?;

        Ok(Transfer {
            suggested_filename: filename,
            staged_path,
            source_url: url.to_string(),
        })
    }

    async fn close(self) -> BrowserResult<()> {
        self.site.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
