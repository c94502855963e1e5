//! Configuration module for tnt-crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the crawler can run without any file at all.
//!
//! # Example
//!
//! ```no_run
//! use tnt_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tnt-crawler.toml")).unwrap();
//! println!("Crawler will keep at most {} pages in flight", config.crawler.max_in_flight);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, SearchConfig, UserAgentConfig, DEFAULT_ENDPOINT};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
