//! Output module for crawl reports
//!
//! This module handles:
//! - Collecting per-page and per-post results into a [`CrawlReport`]
//! - Printing crawl statistics to the console
//! - Writing an optional markdown summary

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{CrawlReport, EntryRecord};
pub use stats::print_statistics;
