use crate::crawler::{EntryOutcome, PostEntry};
use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use url::Url;

/// What happened to one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// List page the post was found on
    pub page: u32,
    pub title: String,
    pub url: Url,
    pub outcome: EntryOutcome,
}

/// Result of one traversal
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub page_max: u32,
    pub page_min: u32,

    /// List pages in the order they were visited, including the page a
    /// stop happened on
    pub pages_visited: Vec<u32>,

    /// Posts extracted across all list pages
    pub entries_found: usize,

    /// Posts that passed the keyword filter
    pub entries_matched: usize,

    /// Per-post outcomes in processing order
    pub entries: Vec<EntryRecord>,

    pub state: CrawlState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlReport {
    pub fn new(page_max: u32, page_min: u32) -> Self {
        Self {
            page_max,
            page_min,
            pages_visited: Vec::new(),
            entries_found: 0,
            entries_matched: 0,
            entries: Vec::new(),
            state: CrawlState::start(page_max, page_min),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, page: u32, entry: PostEntry, outcome: EntryOutcome) {
        self.entries.push(EntryRecord {
            page,
            title: entry.title,
            url: entry.url,
            outcome,
        });
    }

    /// Stamps the terminal state and finish time
    pub fn finish(&mut self, state: CrawlState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    pub fn downloaded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Downloaded { .. }))
            .count()
    }

    pub fn abandoned_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Abandoned { .. }))
            .count()
    }

    /// Attempts spent across every processed post
    pub fn total_attempts(&self) -> u32 {
        self.entries.iter().map(|r| r.outcome.attempts()).sum()
    }

    /// Percentage of processed posts that downloaded
    pub fn success_rate(&self) -> f64 {
        if self.entries.is_empty() {
            0.0
        } else {
            (self.downloaded_count() as f64 / self.entries.len() as f64) * 100.0
        }
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}
