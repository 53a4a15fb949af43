//! Login/error wall detection
//!
//! A page counts as blocked when any of three independent signals fires:
//! - the URL looks like a login/auth/passport/signin endpoint
//! - the page text contains a known blocking phrase
//! - the document holds a login-style form control
//!
//! This is a heuristic gate. It yields false positives (a legitimate post
//! that contains the word for "error") and false negatives (a block page
//! whose copy is not in the phrase set).

use crate::browser::PageSession;
use crate::{BrowserResult, CrawlError};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Selector for the login form probe
pub const LOGIN_FORM_SELECTOR: &str = r#"input[name="username"], input[name="email"], form#login"#;

static LOGIN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)login|signin|auth|passport").expect("login URL pattern"));

// Login required, please log in, login to browse, captcha, access
// restricted, error, page does not exist.
static BLOCKING_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)登录后才能查看|请先登录|登录才能浏览|验证码|访问受限|错误|页面不存在")
        .expect("blocking phrase pattern")
});

/// Which signal marked a page as blocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSignal {
    /// URL matched the login pattern
    LoginUrl,

    /// Page text contained this blocking phrase
    BlockingPhrase(String),

    /// A login form control is present
    LoginForm,
}

impl fmt::Display for BlockSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginUrl => write!(f, "login URL"),
            Self::BlockingPhrase(phrase) => write!(f, "blocking phrase '{}'", phrase),
            Self::LoginForm => write!(f, "login form"),
        }
    }
}

/// Classification of a loaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageVerdict {
    Clear,
    Blocked(BlockSignal),
}

impl PageVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

/// Classifies a page from its URL, its text, and the login form probe
///
/// Signals are checked in that order and the first one that fires is
/// reported.
///
/// # Examples
///
/// ```
/// use sluice::crawler::{classify_page, BlockSignal, PageVerdict};
///
/// let verdict = classify_page("https://forum.example.com/login.php", "", false);
/// assert_eq!(verdict, PageVerdict::Blocked(BlockSignal::LoginUrl));
///
/// let verdict = classify_page("https://forum.example.com/htm_data/1.html", "<p>hello</p>", false);
/// assert_eq!(verdict, PageVerdict::Clear);
/// ```
pub fn classify_page(url: &str, text: &str, has_login_form: bool) -> PageVerdict {
    if LOGIN_URL.is_match(url) {
        return PageVerdict::Blocked(BlockSignal::LoginUrl);
    }

    if let Some(found) = BLOCKING_PHRASES.find(text) {
        return PageVerdict::Blocked(BlockSignal::BlockingPhrase(found.as_str().to_string()));
    }

    if has_login_form {
        return PageVerdict::Blocked(BlockSignal::LoginForm);
    }

    PageVerdict::Clear
}

/// Runs [`classify_page`] against whatever `page` currently shows
pub async fn inspect_page<P: PageSession>(page: &P) -> BrowserResult<PageVerdict> {
    let url = page.current_url().await?;
    let text = page.content().await?;
    let has_login_form = page.has_element(LOGIN_FORM_SELECTOR).await?;
    Ok(classify_page(url.as_str(), &text, has_login_form))
}

/// Fails with [`CrawlError::PageBlocked`] if the page is a login/error wall
pub async fn ensure_clear<P: PageSession>(page: &P) -> Result<(), CrawlError> {
    match inspect_page(page).await? {
        PageVerdict::Clear => Ok(()),
        PageVerdict::Blocked(signal) => {
            let url = page.current_url().await?.to_string();
            tracing::warn!(url = %url, signal = %signal, "Page is blocked");
            Err(CrawlError::PageBlocked { url, signal })
        }
    }
}
