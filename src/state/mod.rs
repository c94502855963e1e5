//! State module for tracking a single crawl invocation
//!
//! # Components
//!
//! - `CrawlPhase`: The orchestrator's lifecycle state machine
//! - `CrawlState`: Per-crawl phase holder plus the shared `CrawlTally`
//! - `CrawlTally`: Counters updated concurrently by page tasks

mod crawl_state;

pub use crawl_state::{CrawlPhase, CrawlState, CrawlTally};
