//! Output module: where decoded entries and crawl events go
//!
//! This module handles:
//! - The sink interface the crawler pushes into
//! - A channel-backed sink for consuming events on another task
//! - Running statistics and progress
//! - Markdown reports of the gathered entries

mod channel;
mod markdown;
pub mod stats;
mod traits;

pub use channel::ChannelSink;
pub use markdown::{format_markdown_report, generate_markdown_report, sort_entries, SortKey};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{EntrySink, OutputError, OutputResult, SinkEvent};
