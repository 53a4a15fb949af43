//! Download execution on the redirect page
//!
//! Given a redirect page that is already loaded and known not to be blocked,
//! the executor:
//! 1. Waits (bounded) for the download control to appear
//! 2. Pauses a human-like interval
//! 3. Clicks the control and captures the transfer it triggers
//! 4. Moves the finished file into the download directory under its
//!    suggested filename, replacing any file already there
//!
//! Partial files left by a failed transfer are not cleaned up; the next
//! attempt simply downloads again into a fresh staging directory.

use crate::browser::{ControlQuery, PageSession, TransferTimeouts};
use crate::config::{Config, SelectorConfig};
use crate::crawler::Pacer;
use crate::{ConfigError, CrawlError};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Staging area for in-flight transfers, inside the download directory
const STAGING_DIR: &str = ".partial";

/// Fallback name when the suggested filename is unusable
const FALLBACK_FILENAME: &str = "download";

/// A file saved by a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Final location on disk
    pub path: PathBuf,

    /// Filename the engine proposed
    pub suggested_filename: String,
}

/// Drives the redirect page to a saved file
#[derive(Debug, Clone)]
pub struct DownloadExecutor {
    control: ControlQuery,
    directory: PathBuf,
    control_timeout: Duration,
    transfer: TransferTimeouts,
}

impl DownloadExecutor {
    pub fn new(
        selectors: &SelectorConfig,
        directory: impl Into<PathBuf>,
        control_timeout: Duration,
        transfer: TransferTimeouts,
    ) -> Result<Self, ConfigError> {
        let control = ControlQuery::new(&selectors.download_control, &selectors.download_text)
            .map_err(|e| ConfigError::InvalidPattern(format!("download_text: {}", e)))?;
        Ok(Self {
            control,
            directory: directory.into(),
            control_timeout,
            transfer,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            &config.selectors,
            config.download.directory.clone(),
            config.timing.selector_timeout(),
            TransferTimeouts {
                start: config.timing.download_start_timeout(),
                complete: config.timing.download_complete_timeout(),
            },
        )
    }

    /// Runs the download on the currently loaded redirect page
    pub async fn execute<P: PageSession>(
        &self,
        page: &P,
        pacer: &Pacer,
    ) -> Result<DownloadResult, CrawlError> {
        page.wait_for_control(&self.control, self.control_timeout).await?;

        pacer.pause().await;

        tokio::fs::create_dir_all(&self.directory).await?;
        let directory = std::path::absolute(&self.directory)?;
        let staging = staging_dir(&directory);
        let transfer = page
            .click_for_download(&self.control, &staging, self.transfer)
            .await?;

        let suggested_filename = transfer.suggested_filename.clone();
        let path = directory.join(safe_filename(&suggested_filename));
        replace_file(&transfer.staged_path, &path).await?;
        tracing::debug!(source = %transfer.source_url, path = %path.display(), "Saved transfer");

        if let Err(e) = tokio::fs::remove_dir(&staging).await {
            tracing::debug!("Left staging directory {} in place: {}", staging.display(), e);
        }

        Ok(DownloadResult {
            path,
            suggested_filename,
        })
    }
}

/// Fresh staging directory for one transfer inside `directory`
fn staging_dir(directory: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.9f").to_string();
    directory.join(STAGING_DIR).join(stamp)
}

/// Reduces a suggested filename to a single safe path component
pub fn safe_filename(suggested: &str) -> String {
    let last = suggested
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        last.to_string()
    }
}

/// Moves `from` to `to`, replacing an existing file (last write wins)
async fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(to).await {
        Ok(()) => tracing::debug!("Replacing existing file {}", to.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::rename(from, to).await
}
