//! URL handling module
//!
//! This module builds list-page URLs from the configured template and
//! resolves hrefs scraped from a page against that page's URL.

use url::{ParseError, Url};

/// Placeholder replaced by the page number in the list URL template
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Builds the URL of list page `page` from a template
///
/// Every `{page}` in the template is replaced by the number. A template
/// without the placeholder gets the number appended, so
/// `https://host/thread.php?fid=25&page=` also works.
///
/// # Examples
///
/// ```
/// use sluice::url::list_page_url;
///
/// let url = list_page_url("https://forum.example.com/list?page={page}", 7).unwrap();
/// assert_eq!(url.as_str(), "https://forum.example.com/list?page=7");
/// ```
pub fn list_page_url(template: &str, page: u32) -> Result<Url, ParseError> {
    let raw = if template.contains(PAGE_PLACEHOLDER) {
        template.replace(PAGE_PLACEHOLDER, &page.to_string())
    } else {
        format!("{}{}", template, page)
    };
    Url::parse(&raw)
}

/// Resolves an href to an absolute URL using `base` as the reference
///
/// Absolute hrefs pass through unchanged. Returns None for empty hrefs,
/// `javascript:`/`mailto:`/`data:` targets, and anything that does not
/// resolve to http(s).
pub fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
