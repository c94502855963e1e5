//! Crawler module for listing page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Posting the search form for one page at a time
//! - Decoding results tables and the pagination control
//! - Bounded fan-out of pages 2..N
//! - Cooperative stop and overall crawl coordination

mod cancel;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use cancel::StopHandle;
pub use coordinator::{CrawlOutcome, CrawlReport, TntCrawler};
pub use fetcher::{build_http_client, CrawlRequest, HttpFetcher, PageSource};
pub use parser::{extract_entries, read_page_count, Entry, ParseError, ParsedPage};
pub use scheduler::{Scheduler, DEFAULT_MAX_IN_FLIGHT};

use crate::config::Config;
use crate::output::EntrySink;
use crate::TntError;
use std::sync::Arc;

/// Runs a complete crawl for one keyword and category
///
/// Convenience wrapper over [`TntCrawler`] for callers that never need to
/// stop the crawl early.
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl reached a terminal phase
/// * `Err(TntError)` - The client could not be built or the search parameters
///   were invalid
pub async fn crawl_once(
    config: &Config,
    keyword: &str,
    category: u32,
    sink: Arc<dyn EntrySink>,
) -> Result<CrawlReport, TntError> {
    let mut crawler = TntCrawler::new(config, sink)?;
    crawler.setup(Some(keyword), Some(category))?;
    let report = crawler.crawl().await;
    crawler.shutdown();
    report
}
