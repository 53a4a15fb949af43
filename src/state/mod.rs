//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the descending page cursor and its terminal states
//! - `EntryPhase`: where a single post is in its retry state machine

mod crawl_state;
mod entry_state;

// Re-export main types
pub use crawl_state::{CrawlState, StopReason};
pub use entry_state::EntryPhase;
