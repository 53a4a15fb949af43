//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every knob the crawler reads lives here; nothing is kept in module-level state.
//!
//! # Example
//!
//! ```no_run
//! use sluice::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sluice.toml")).unwrap();
//! println!("Crawling pages {}..={}", config.crawl.page_min, config.crawl.page_max);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, CrawlConfig, DownloadConfig, OutputConfig, SelectorConfig, SiteConfig,
    TimingConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
