use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawl: CrawlConfig,
    pub download: DownloadConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Forum location
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// List page URL; `{page}` is replaced by the page number, otherwise the
    /// number is appended
    #[serde(rename = "list-url-template")]
    pub list_url_template: String,
}

/// Traversal range, retry budget and keyword filter
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First (highest) list page to visit
    #[serde(rename = "page-max")]
    pub page_max: u32,

    /// Last (lowest) list page to visit, inclusive
    #[serde(rename = "page-min")]
    pub page_min: u32,

    /// Maximum attempts per post
    #[serde(rename = "try-count", default = "default_try_count")]
    pub try_count: u32,

    /// Title keywords; an empty list keeps every post
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Where downloaded files land
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    pub directory: PathBuf,
}

/// Bounded waits and human-like pacing, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    #[serde(rename = "selector-timeout-ms", default = "default_selector_timeout")]
    pub selector_timeout_ms: u64,

    /// Bound on the file-transfer-started signal after the click
    #[serde(
        rename = "download-start-timeout-ms",
        default = "default_download_start_timeout"
    )]
    pub download_start_timeout_ms: u64,

    /// Bound on the transfer itself once it has started
    #[serde(
        rename = "download-complete-timeout-ms",
        default = "default_download_complete_timeout"
    )]
    pub download_complete_timeout_ms: u64,

    #[serde(rename = "human-delay-min-ms", default = "default_human_delay_min")]
    pub human_delay_min_ms: u64,

    #[serde(rename = "human-delay-max-ms", default = "default_human_delay_max")]
    pub human_delay_max_ms: u64,
}

impl TimingConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn download_start_timeout(&self) -> Duration {
        Duration::from_millis(self.download_start_timeout_ms)
    }

    pub fn download_complete_timeout(&self) -> Duration {
        Duration::from_millis(self.download_complete_timeout_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout(),
            selector_timeout_ms: default_selector_timeout(),
            download_start_timeout_ms: default_download_start_timeout(),
            download_complete_timeout_ms: default_download_complete_timeout(),
            human_delay_min_ms: default_human_delay_min(),
            human_delay_max_ms: default_human_delay_max(),
        }
    }
}

/// CSS selectors and markers describing the forum's markup
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Element that must exist before the list page is read
    #[serde(rename = "list-container", default = "default_list_container")]
    pub list_container: String,

    /// Rows of the post table; the first row is the header
    #[serde(rename = "list-row", default = "default_list_row")]
    pub list_row: String,

    /// Anchor inside a row that links to the post
    #[serde(rename = "post-link", default = "default_post_link")]
    pub post_link: String,

    /// Post body container holding the redirect link
    #[serde(rename = "content-container", default = "default_content_container")]
    pub content_container: String,

    /// Substring an href must contain to count as the redirect link
    #[serde(rename = "redirect-marker", default = "default_redirect_marker")]
    pub redirect_marker: String,

    /// Tag of the download control on the redirect page
    #[serde(rename = "download-control", default = "default_download_control")]
    pub download_control: String,

    /// Case-insensitive text the download control must contain
    #[serde(rename = "download-text", default = "default_download_text")]
    pub download_text: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            list_container: default_list_container(),
            list_row: default_list_row(),
            post_link: default_post_link(),
            content_container: default_content_container(),
            redirect_marker: default_redirect_marker(),
            download_control: default_download_control(),
            download_text: default_download_text(),
        }
    }
}

/// Browser launch options
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chromium executable; auto-detected when absent
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Proxy server passed to Chromium as `--proxy-server`
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            proxy: None,
            args: default_browser_args(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown summary file, written after the run
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<PathBuf>,
}

fn default_try_count() -> u32 {
    3
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_selector_timeout() -> u64 {
    15_000
}

fn default_download_start_timeout() -> u64 {
    120_000
}

fn default_download_complete_timeout() -> u64 {
    600_000
}

fn default_human_delay_min() -> u64 {
    2_000
}

fn default_human_delay_max() -> u64 {
    5_000
}

fn default_list_container() -> String {
    "#ajaxtable".to_string()
}

fn default_list_row() -> String {
    "#ajaxtable tr".to_string()
}

fn default_post_link() -> String {
    r#"a[href^="/htm_data/"]"#.to_string()
}

fn default_content_container() -> String {
    "#conttpc".to_string()
}

fn default_redirect_marker() -> String {
    "rmdown.com/link.php".to_string()
}

fn default_download_control() -> String {
    "button".to_string()
}

fn default_download_text() -> String {
    "download".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_browser_args() -> Vec<String> {
    vec!["--no-sandbox".to_string()]
}
