//! Sink interface and event types
//!
//! This module defines the trait the crawler pushes entries and lifecycle
//! notifications into, along with the enumerated form of those notifications
//! used when the consumer lives on another task.

use crate::crawler::{Entry, ParseError};
use crate::TntError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumer of decoded entries and crawl lifecycle notifications
///
/// Hooks are called from the crawl's page tasks, possibly concurrently, so
/// implementations must be thread-safe. Every hook except [`EntrySink::entry`]
/// defaults to a no-op.
///
/// Ordering:
/// - `crawl_starting` fires before page 1 is requested.
/// - `page_count_discovered` fires once, after page 1 arrives and before any
///   of its entries.
/// - `page_fetch_starting`/`page_fetch_finished` fire for pages 2..N only.
/// - `page_processed` fires once per page, after all of that page's entries.
/// - Page 1's entries always precede entries from other pages; entries from
///   pages 2..N follow completion order.
pub trait EntrySink: Send + Sync {
    /// Called before the first page is requested
    fn crawl_starting(&self) {}

    /// Called once with the total number of pages in the listing
    fn page_count_discovered(&self, _count: u32) {}

    /// Called when the request for `page` (>= 2) is issued
    fn page_fetch_starting(&self, _page: u32) {}

    /// Called when the request for `page` (>= 2) has returned, successfully or not
    fn page_fetch_finished(&self, _page: u32) {}

    /// Called once per decoded record
    fn entry(&self, entry: &Entry);

    /// Called once per page after its entries have all been delivered
    fn page_processed(&self, _page: u32) {}

    /// Called when a page's transport failed; the page contributes no entries
    fn page_failed(&self, _page: u32, _error: &TntError) {}

    /// Called when a page's table or one of its rows could not be decoded
    fn parse_failed(&self, _page: u32, _error: &ParseError) {}
}

/// Enumerated form of the [`EntrySink`] hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    CrawlStarting,
    PageCountDiscovered(u32),
    PageFetchStarting(u32),
    PageFetchFinished(u32),
    Entry(Entry),
    PageProcessed(u32),
    PageFailed { page: u32, message: String },
    ParseFailed { page: u32, message: String },
}

impl fmt::Display for SinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrawlStarting => write!(f, "crawl starting"),
            Self::PageCountDiscovered(count) => write!(f, "{} pages discovered", count),
            Self::PageFetchStarting(page) => write!(f, "downloading page {}", page),
            Self::PageFetchFinished(page) => write!(f, "page {} downloaded", page),
            Self::Entry(entry) => write!(f, "entry: {}", entry.title),
            Self::PageProcessed(page) => write!(f, "page {} processed", page),
            Self::PageFailed { page, message } => write!(f, "page {} failed: {}", page, message),
            Self::ParseFailed { page, message } => {
                write!(f, "page {} parse failure: {}", page, message)
            }
        }
    }
}
