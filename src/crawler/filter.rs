//! Title keyword filtering

use crate::crawler::PostEntry;

/// Keeps posts whose title contains any configured keyword
///
/// Matching is a case-insensitive substring test; an empty keyword set keeps
/// everything.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let title = title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }

    /// Filters entries, preserving their relative order
    pub fn apply(&self, entries: Vec<PostEntry>) -> Vec<PostEntry> {
        entries
            .into_iter()
            .filter(|entry| self.matches(&entry.title))
            .collect()
    }
}
