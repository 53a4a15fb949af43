//! Per-post phase definitions
//!
//! A post moves through these phases once per attempt until it reaches one of
//! the two terminal phases.

use std::fmt;

/// Represents where a post currently is in the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPhase {
    // ===== Attempt Phases =====
    /// Opening the post page
    Navigating,

    /// Running the page classifier on the post page
    Checking,

    /// Looking for the redirect link in the post content
    Resolving,

    /// Driving the redirect page to a finished file
    Downloading,

    /// Attempt failed and another one is scheduled
    Retrying,

    // ===== Terminal States =====
    /// A file was saved
    Succeeded,

    /// Every attempt failed; the post is skipped
    Abandoned,
}

impl EntryPhase {
    /// Returns true if no further attempt will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Abandoned)
    }

    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigating => "navigating",
            Self::Checking => "checking",
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Abandoned => "abandoned",
        }
    }

    /// Phase after a failed attempt, given the attempt number and budget
    pub fn after_failure(attempt: u32, try_count: u32) -> Self {
        if attempt >= try_count {
            Self::Abandoned
        } else {
            Self::Retrying
        }
    }
}

impl fmt::Display for EntryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
