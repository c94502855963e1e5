//! Crawler coordinator - end-to-end crawl orchestration
//!
//! This module contains the crawl lifecycle that ties the other pieces
//! together:
//! - Validating the search parameters before any network activity
//! - Fetching page 1 and discovering the page count
//! - Fanning out pages 2..N through the scheduler
//! - Draining the spawned pages, or abandoning them on stop
//! - Reporting how the crawl ended

use crate::config::Config;
use crate::crawler::cancel::StopHandle;
use crate::crawler::fetcher::{CrawlRequest, HttpFetcher, PageSource};
use crate::crawler::parser::read_page_count;
use crate::crawler::scheduler::{deliver_page, PageJob, Scheduler};
use crate::output::EntrySink;
use crate::state::{CrawlPhase, CrawlState};
use crate::{ConfigError, TntError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// How a crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Every page of the listing was processed
    Completed,

    /// The stop flag ended the crawl; entries already delivered stand
    Cancelled,

    /// Page 1 could not be fetched, so the listing could not be read
    Failed { reason: String },
}

impl CrawlOutcome {
    /// The terminal phase matching this outcome
    pub fn phase(&self) -> CrawlPhase {
        match self {
            Self::Completed => CrawlPhase::Completed,
            Self::Cancelled => CrawlPhase::Cancelled,
            Self::Failed { .. } => CrawlPhase::Failed,
        }
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Summary of one `crawl()` call
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,

    /// Total pages in the listing (0 if page 1 never arrived)
    pub page_count: u32,

    pub pages_processed: usize,
    pub pages_failed: usize,
    pub entries_delivered: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Crawler for one paginated release listing
///
/// Usage: [`setup`](Self::setup) → [`crawl`](Self::crawl) →
/// [`shutdown`](Self::shutdown). [`stop`](Self::stop) (or a
/// [`StopHandle`]) may be called at any time from anywhere. An instance runs
/// at most one crawl at a time.
pub struct TntCrawler<S: PageSource = HttpFetcher> {
    source: Arc<S>,
    sink: Arc<dyn EntrySink>,
    scheduler: Scheduler,
    stop: StopHandle,
    request: Option<Arc<CrawlRequest>>,
    phase: Arc<Mutex<CrawlPhase>>,
}

impl TntCrawler<HttpFetcher> {
    /// Creates a crawler posting to the endpoint in `config`
    pub fn new(config: &Config, sink: Arc<dyn EntrySink>) -> Result<Self, TntError> {
        let fetcher = HttpFetcher::new(&config.crawler, &config.user_agent)?;
        Ok(Self::with_source(
            fetcher,
            config.crawler.max_in_flight as usize,
            sink,
        ))
    }
}

impl<S: PageSource> TntCrawler<S> {
    /// Creates a crawler reading pages from `source`
    pub fn with_source(source: S, max_in_flight: usize, sink: Arc<dyn EntrySink>) -> Self {
        Self {
            source: Arc::new(source),
            sink,
            scheduler: Scheduler::new(max_in_flight),
            stop: StopHandle::new(),
            request: None,
            phase: Arc::new(Mutex::new(CrawlPhase::Idle)),
        }
    }

    /// Sets the search keyword and category for the next crawl
    ///
    /// Fails before any network activity if either is absent or the keyword
    /// is blank. A successful setup also discards any stop requested since the
    /// previous crawl.
    pub fn setup(&mut self, keyword: Option<&str>, category: Option<u32>) -> Result<(), ConfigError> {
        let request = CrawlRequest::new(keyword, category)?;
        tracing::debug!(
            keyword = request.keyword(),
            category = request.category(),
            "Crawler configured"
        );
        self.request = Some(Arc::new(request));
        self.stop.reset();
        Ok(())
    }

    /// Runs one crawl to a terminal phase
    ///
    /// Entries reach the sink as they are decoded. Transport and parse
    /// failures of individual pages are absorbed into the report; only a
    /// missing [`setup`](Self::setup) is returned as an error.
    pub async fn crawl(&self) -> Result<CrawlReport, TntError> {
        let request = self.request.clone().ok_or(ConfigError::NotConfigured)?;
        let state = CrawlState::begin(Arc::clone(&self.phase));
        let started_at = Utc::now();

        let result = self.run(&request, &state).await;
        self.stop.reset();
        let (outcome, page_count) = result?;

        let tally = state.tally();
        let report = CrawlReport {
            outcome,
            page_count,
            pages_processed: tally.pages_processed(),
            pages_failed: tally.pages_failed(),
            entries_delivered: tally.entries_delivered(),
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            outcome = %report.outcome,
            pages = report.page_count,
            processed = report.pages_processed,
            failed = report.pages_failed,
            entries = report.entries_delivered,
            "Crawl finished"
        );

        Ok(report)
    }

    /// Walks the state machine; returns the outcome and discovered page count
    async fn run(
        &self,
        request: &Arc<CrawlRequest>,
        state: &CrawlState,
    ) -> Result<(CrawlOutcome, u32), TntError> {
        if self.stop.is_stopped() {
            tracing::info!("Stop requested before the crawl started");
            state.advance(CrawlPhase::Cancelled)?;
            return Ok((CrawlOutcome::Cancelled, 0));
        }

        state.advance(CrawlPhase::FetchingFirstPage)?;
        self.sink.crawl_starting();
        tracing::info!(
            keyword = request.keyword(),
            category = request.category(),
            "Downloading page 1"
        );

        let first_page = match self
            .stop
            .until_stopped(self.source.fetch_page(request, 1))
            .await
        {
            Some(Ok(html)) => html,
            Some(Err(error)) => {
                tracing::error!(error = %error, "Page 1 download failed; cannot discover the listing");
                state.tally().record_page_failed();
                self.sink.page_failed(1, &error);
                state.advance(CrawlPhase::Failed)?;
                return Ok((
                    CrawlOutcome::Failed {
                        reason: error.to_string(),
                    },
                    0,
                ));
            }
            None => {
                tracing::info!("Stop requested while downloading page 1");
                state.advance(CrawlPhase::Cancelled)?;
                return Ok((CrawlOutcome::Cancelled, 0));
            }
        };

        state.advance(CrawlPhase::DiscoveringPages)?;
        let page_count = read_page_count(&first_page).max(1);
        self.sink.page_count_discovered(page_count);
        deliver_page(1, &first_page, self.sink.as_ref(), state.tally());
        drop(first_page);

        if page_count > 1 {
            tracing::info!(
                remaining = page_count - 1,
                "Page 1 processed, other {} pages to download",
                page_count - 1
            );
        } else {
            tracing::info!("Page 1 processed, no other pages to download");
        }

        let mut tasks = JoinSet::new();
        if page_count > 1 {
            state.advance(CrawlPhase::FanningOut)?;
            let job = PageJob {
                source: Arc::clone(&self.source),
                request: Arc::clone(request),
                sink: Arc::clone(&self.sink),
                tally: Arc::clone(state.tally()),
            };

            let fan_out = self.scheduler.fan_out(2..=page_count, &job, &self.stop).await;
            tasks = fan_out.tasks;

            if fan_out.cancelled {
                state.advance(CrawlPhase::Cancelled)?;
                // the flag is level-triggered, so the join race resolves at once
                Scheduler::drain(&mut tasks, &self.stop).await;
                return Ok((CrawlOutcome::Cancelled, page_count));
            }
        }

        state.advance(CrawlPhase::Draining)?;
        let outcome = if Scheduler::drain(&mut tasks, &self.stop).await {
            CrawlOutcome::Completed
        } else {
            CrawlOutcome::Cancelled
        };
        state.advance(outcome.phase())?;

        Ok((outcome, page_count))
    }

    /// Requests that the running crawl stop; idempotent, returns immediately
    pub fn stop(&self) {
        tracing::debug!("Stop requested");
        self.stop.stop();
    }

    /// Returns a handle that can stop this crawler from another task or thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle phase of the most recent crawl
    pub fn phase(&self) -> CrawlPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The search parameters set by the last successful `setup()`
    pub fn request(&self) -> Option<&CrawlRequest> {
        self.request.as_deref()
    }

    pub fn max_in_flight(&self) -> usize {
        self.scheduler.max_in_flight()
    }

    /// Free fetch slots; equals `max_in_flight()` whenever no crawl is running
    pub fn available_slots(&self) -> usize {
        self.scheduler.available_slots()
    }

    /// Releases the page source and its network resources
    pub fn shutdown(self) {
        tracing::debug!(phase = %self.phase(), "Shutting down crawler");
        drop(self);
    }
}
