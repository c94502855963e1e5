//! Scheduler for fetching pages 2..N under a worker cap
//!
//! This module handles:
//! - Bounding the number of outstanding page fetches with a semaphore
//! - Spawning one task per page, in ascending page order
//! - Joining the spawned tasks, racing the join against the stop flag
//! - Delivering each fetched page's entries to the sink
//!
//! Every task owns the permit it was spawned with, so a slot is released on
//! every exit path: success, transport failure, decode failure, or abort.

use crate::crawler::cancel::StopHandle;
use crate::crawler::fetcher::{CrawlRequest, PageSource};
use crate::crawler::parser::extract_entries;
use crate::output::EntrySink;
use crate::state::CrawlTally;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Default cap on outstanding page fetches
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

/// Everything a page task needs, shared between all tasks of a crawl
pub struct PageJob<S> {
    pub source: Arc<S>,
    pub request: Arc<CrawlRequest>,
    pub sink: Arc<dyn EntrySink>,
    pub tally: Arc<CrawlTally>,
}

// Manual impl: `S` itself does not need to be Clone
impl<S> Clone for PageJob<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            request: Arc::clone(&self.request),
            sink: Arc::clone(&self.sink),
            tally: Arc::clone(&self.tally),
        }
    }
}

/// Result of spawning the remaining pages
pub struct FanOut {
    /// Tasks spawned so far
    pub tasks: JoinSet<()>,

    /// Number of pages spawned
    pub spawned: usize,

    /// True if the stop flag interrupted slot acquisition
    pub cancelled: bool,
}

/// Scheduler owns the bounded pool of fetch slots
#[derive(Debug, Clone)]
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

impl Scheduler {
    /// Creates a scheduler allowing `max_in_flight` outstanding fetches
    ///
    /// A cap of 0 is raised to 1 so the crawl can always make progress.
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Slots currently free; equals `max_in_flight` when nothing is in flight
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawns one task per page in `pages`, in ascending order
    ///
    /// Each spawn first waits for a free slot. That wait is raced against the
    /// stop flag: if the flag wins no further pages are spawned, and the
    /// tasks already running are handed back to the caller untouched. A slot
    /// granted before the flag is observed is still used for its page.
    pub async fn fan_out<S: PageSource>(
        &self,
        pages: RangeInclusive<u32>,
        job: &PageJob<S>,
        stop: &StopHandle,
    ) -> FanOut {
        let mut tasks = JoinSet::new();
        let mut spawned = 0;
        let mut cancelled = false;

        for page in pages {
            tracing::trace!(
                page,
                available = self.semaphore.available_permits(),
                "Waiting for a fetch slot"
            );

            let acquire = Arc::clone(&self.semaphore).acquire_owned();
            let permit = match stop.until_stopped(acquire).await {
                Some(Ok(permit)) => permit,
                Some(Err(_)) => {
                    // The semaphore is never closed while the scheduler lives
                    tracing::warn!(page, "Fetch slot pool closed; no further pages spawned");
                    cancelled = true;
                    break;
                }
                None => {
                    tracing::info!(page, spawned, "Stop requested; no further pages spawned");
                    cancelled = true;
                    break;
                }
            };

            tasks.spawn(process_page(job.clone(), page, permit));
            spawned += 1;
        }

        FanOut {
            tasks,
            spawned,
            cancelled,
        }
    }

    /// Waits for every task in `tasks`, racing the join against the stop flag
    ///
    /// Returns `true` if every task finished. If the flag wins, the remaining
    /// tasks are aborted (dropping their in-flight requests and permits) and
    /// awaited before returning `false`.
    pub async fn drain(tasks: &mut JoinSet<()>, stop: &StopHandle) -> bool {
        let joined = stop
            .until_stopped(async {
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        if e.is_panic() {
                            tracing::error!("Page task panicked: {}", e);
                        }
                    }
                }
            })
            .await;

        if joined.is_some() {
            return true;
        }

        tracing::info!(remaining = tasks.len(), "Stop requested; aborting page tasks");
        tasks.shutdown().await;
        false
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT)
    }
}

/// Fetches and delivers one page, holding its slot until done
async fn process_page<S: PageSource>(job: PageJob<S>, page: u32, _permit: OwnedSemaphorePermit) {
    job.sink.page_fetch_starting(page);
    let fetched = job.source.fetch_page(&job.request, page).await;
    job.sink.page_fetch_finished(page);

    match fetched {
        Ok(html) => deliver_page(page, &html, job.sink.as_ref(), &job.tally),
        Err(error) => {
            tracing::warn!(page, error = %error, "Page download failed; skipping its entries");
            job.tally.record_page_failed();
            job.sink.page_failed(page, &error);
        }
    }
}

/// Decodes `html` and pushes its entries to `sink`, then marks the page processed
///
/// A missing table or undecodable row is reported to the sink and logged;
/// the page then contributes whatever rows did decode.
pub(crate) fn deliver_page(page: u32, html: &str, sink: &dyn EntrySink, tally: &CrawlTally) {
    let mut delivered = 0usize;

    match extract_entries(html) {
        Ok(parsed) => {
            for rejected in &parsed.rejected {
                tracing::warn!(page, error = %rejected, "Skipping undecodable row");
                sink.parse_failed(page, rejected);
            }
            for entry in &parsed.entries {
                sink.entry(entry);
                tally.record_entry();
                delivered += 1;
            }
        }
        Err(error) => {
            tracing::warn!(page, error = %error, "No entries decoded from page");
            sink.parse_failed(page, &error);
        }
    }

    tally.record_page_processed();
    sink.page_processed(page);
    tracing::debug!(page, entries = delivered, "Page processed");
}
