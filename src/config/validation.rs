use crate::config::types::{
    Config, CrawlConfig, DownloadConfig, SelectorConfig, SiteConfig, TimingConfig,
};
use crate::url::list_page_url;
use crate::ConfigError;
use scraper::Selector;

/// Upper bound on per-post attempts
const MAX_TRY_COUNT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawl_config(&config.crawl)?;
    validate_download_config(&config.download)?;
    validate_timing_config(&config.timing)?;
    validate_selector_config(&config.selectors)?;
    Ok(())
}

/// Validates the list URL template
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.list_url_template.trim().is_empty() {
        return Err(ConfigError::Validation(
            "list_url_template cannot be empty".to_string(),
        ));
    }

    let url = list_page_url(&config.list_url_template, 1).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "list_url_template '{}' does not form a URL: {}",
            config.list_url_template, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "list_url_template must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(())
}

/// Validates page range, retry budget and keywords
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_min < 1 {
        return Err(ConfigError::Validation(format!(
            "page_min must be >= 1, got {}",
            config.page_min
        )));
    }

    if config.page_max < config.page_min {
        return Err(ConfigError::Validation(format!(
            "page_max ({}) must be >= page_min ({})",
            config.page_max, config.page_min
        )));
    }

    if config.try_count < 1 || config.try_count > MAX_TRY_COUNT {
        return Err(ConfigError::Validation(format!(
            "try_count must be between 1 and {}, got {}",
            MAX_TRY_COUNT, config.try_count
        )));
    }

    if config.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "keywords cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates timeouts and the human delay range
fn validate_timing_config(config: &TimingConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("navigation_timeout_ms", config.navigation_timeout_ms),
        ("selector_timeout_ms", config.selector_timeout_ms),
        ("download_start_timeout_ms", config.download_start_timeout_ms),
        (
            "download_complete_timeout_ms",
            config.download_complete_timeout_ms,
        ),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.human_delay_min_ms > config.human_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "human_delay_min_ms ({}) must be <= human_delay_max_ms ({})",
            config.human_delay_min_ms, config.human_delay_max_ms
        )));
    }

    Ok(())
}

/// Validates that every selector parses and every marker is usable
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in [
        ("list_container", &config.list_container),
        ("list_row", &config.list_row),
        ("post_link", &config.post_link),
        ("content_container", &config.content_container),
        ("download_control", &config.download_control),
    ] {
        validate_css_selector(name, selector)?;
    }

    if config.redirect_marker.trim().is_empty() {
        return Err(ConfigError::InvalidPattern(
            "redirect_marker cannot be empty".to_string(),
        ));
    }

    if config.download_text.trim().is_empty() {
        return Err(ConfigError::InvalidPattern(
            "download_text cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_css_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidPattern(format!("{} '{}' is not a valid selector: {:?}", name, selector, e))
    })?;
    Ok(())
}
