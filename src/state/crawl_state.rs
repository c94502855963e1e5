/// Crawl lifecycle state definitions
///
/// A crawl moves through the phases below exactly once per `crawl()` call.
use crate::TntError;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Active Phases =====
    /// No crawl has started yet
    Idle,

    /// Page 1 is being requested
    FetchingFirstPage,

    /// Page 1 arrived; its page count and entries are being decoded
    DiscoveringPages,

    /// Pages 2..N are being spawned as slots become available
    FanningOut,

    /// Every page task has been spawned; waiting for them to finish
    Draining,

    // ===== Terminal Phases =====
    /// Every page was processed
    Completed,

    /// The stop signal ended the crawl
    Cancelled,

    /// The crawl could not proceed past page 1
    Failed,
}

impl CrawlPhase {
    /// Returns true if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns true if the state machine allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: CrawlPhase) -> bool {
        use CrawlPhase::*;

        matches!(
            (self, to),
            (Idle, FetchingFirstPage)
                | (Idle, Cancelled)
                | (Idle, Failed)
                | (FetchingFirstPage, DiscoveringPages)
                | (FetchingFirstPage, Cancelled)
                | (FetchingFirstPage, Failed)
                | (DiscoveringPages, FanningOut)
                | (DiscoveringPages, Draining)
                | (FanningOut, Draining)
                | (FanningOut, Cancelled)
                | (Draining, Completed)
                | (Draining, Cancelled)
        )
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingFirstPage => "fetching_first_page",
            Self::DiscoveringPages => "discovering_pages",
            Self::FanningOut => "fanning_out",
            Self::Draining => "draining",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters shared between the orchestrator and every page task
#[derive(Debug, Default)]
pub struct CrawlTally {
    pages_processed: AtomicUsize,
    pages_failed: AtomicUsize,
    entries_delivered: AtomicUsize,
}

impl CrawlTally {
    pub fn record_page_processed(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry(&self) {
        self.entries_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_processed(&self) -> usize {
        self.pages_processed.load(Ordering::Relaxed)
    }

    pub fn pages_failed(&self) -> usize {
        self.pages_failed.load(Ordering::Relaxed)
    }

    pub fn entries_delivered(&self) -> usize {
        self.entries_delivered.load(Ordering::Relaxed)
    }
}

/// Process-local state of one crawl invocation
///
/// The phase cell is shared with the owning crawler so callers can observe
/// progress; the tally is handed to every spawned page task.
#[derive(Debug, Clone)]
pub struct CrawlState {
    phase: Arc<Mutex<CrawlPhase>>,
    tally: Arc<CrawlTally>,
}

impl CrawlState {
    /// Starts a new crawl state, resetting the shared phase cell to `Idle`
    pub fn begin(phase: Arc<Mutex<CrawlPhase>>) -> Self {
        *phase.lock().unwrap_or_else(PoisonError::into_inner) = CrawlPhase::Idle;
        Self {
            phase,
            tally: Arc::new(CrawlTally::default()),
        }
    }

    /// Returns the current phase
    pub fn phase(&self) -> CrawlPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `to`, rejecting transitions the state machine does not allow
    pub fn advance(&self, to: CrawlPhase) -> Result<(), TntError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if !phase.can_transition_to(to) {
            return Err(TntError::InvalidTransition { from: *phase, to });
        }
        tracing::trace!(from = %*phase, to = %to, "Crawl phase transition");
        *phase = to;
        Ok(())
    }

    pub fn tally(&self) -> &Arc<CrawlTally> {
        &self.tally
    }
}
