use std::fmt;

/// Why a traversal ended before reaching the lowest page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// List page answered outside 2xx, or with no response at all
    HttpStatus(Option<u16>),

    /// List page landed on a login/error wall
    Blocked(String),

    /// Navigation or extraction failed on the list page
    PageFailure(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(Some(status)) => write!(f, "list page returned status {}", status),
            Self::HttpStatus(None) => write!(f, "list page returned no response"),
            Self::Blocked(signal) => write!(f, "list page blocked ({})", signal),
            Self::PageFailure(message) => write!(f, "list page failed: {}", message),
        }
    }
}

/// Process-wide traversal cursor
///
/// The cursor starts at the highest page and only ever moves down by one.
/// `Stopped` is absorbing: once reached, no further page is visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    /// Next page to visit
    Running { page: u32 },

    /// Every page down to the lowest was visited
    Completed,

    /// Traversal ended early while on `page`
    Stopped { page: u32, reason: StopReason },
}

impl CrawlState {
    /// Cursor for a traversal from `page_max` down to `page_min`
    ///
    /// An empty range starts out completed.
    pub fn start(page_max: u32, page_min: u32) -> Self {
        if page_max < page_min {
            Self::Completed
        } else {
            Self::Running { page: page_max }
        }
    }

    /// Page the cursor points at, if still running
    pub fn current_page(&self) -> Option<u32> {
        match self {
            Self::Running { page } => Some(*page),
            _ => None,
        }
    }

    /// Moves past the current page
    pub fn advance(&mut self, page_min: u32) {
        if let Self::Running { page } = *self {
            *self = if page <= page_min {
                Self::Completed
            } else {
                Self::Running { page: page - 1 }
            };
        }
    }

    /// Halts the traversal on the current page
    pub fn stop(&mut self, reason: StopReason) {
        if let Self::Running { page } = *self {
            *self = Self::Stopped { page, reason };
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { page } => write!(f, "running (page {})", page),
            Self::Completed => write!(f, "completed"),
            Self::Stopped { page, reason } => write!(f, "stopped on page {}: {}", page, reason),
        }
    }
}
