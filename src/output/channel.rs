//! Channel-backed sink
//!
//! Lets a crawl run on a worker task while another task (typically a display
//! layer) drains its events. The receiver sees the channel close once the
//! crawler and every page task holding the sink have been dropped.

use crate::crawler::{Entry, ParseError};
use crate::output::traits::{EntrySink, SinkEvent};
use crate::TntError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// An [`EntrySink`] that forwards every hook as a [`SinkEvent`]
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events arrive on
    pub fn new() -> (Self, UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        // A closed receiver means nobody is listening anymore
        let _ = self.tx.send(event);
    }
}

impl EntrySink for ChannelSink {
    fn crawl_starting(&self) {
        self.send(SinkEvent::CrawlStarting);
    }

    fn page_count_discovered(&self, count: u32) {
        self.send(SinkEvent::PageCountDiscovered(count));
    }

    fn page_fetch_starting(&self, page: u32) {
        self.send(SinkEvent::PageFetchStarting(page));
    }

    fn page_fetch_finished(&self, page: u32) {
        self.send(SinkEvent::PageFetchFinished(page));
    }

    fn entry(&self, entry: &Entry) {
        self.send(SinkEvent::Entry(entry.clone()));
    }

    fn page_processed(&self, page: u32) {
        self.send(SinkEvent::PageProcessed(page));
    }

    fn page_failed(&self, page: u32, error: &TntError) {
        self.send(SinkEvent::PageFailed {
            page,
            message: error.to_string(),
        });
    }

    fn parse_failed(&self, page: u32, error: &ParseError) {
        self.send(SinkEvent::ParseFailed {
            page,
            message: error.to_string(),
        });
    }
}
