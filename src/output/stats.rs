//! Crawl statistics
//!
//! Accumulates [`SinkEvent`]s into running totals that drive progress
//! reporting while a crawl runs and the summary printed once it ends.

use crate::crawler::CrawlReport;
use crate::output::traits::SinkEvent;

/// Running totals for one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Total pages in the listing, once page 1 has been read
    pub page_count: Option<u32>,

    /// Pages whose entries have all been delivered
    pub pages_processed: u64,

    /// Pages whose transport failed
    pub pages_failed: u64,

    /// Table or row decode failures
    pub parse_failures: u64,

    /// Entries received
    pub entries: u64,

    /// Sum of seeders across all entries
    pub total_seeders: u64,

    /// Sum of leechers across all entries
    pub total_leechers: u64,

    /// Sum of completed downloads across all entries
    pub total_downloads: u64,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the totals
    pub fn record(&mut self, event: &SinkEvent) {
        match event {
            SinkEvent::PageCountDiscovered(count) => self.page_count = Some(*count),
            SinkEvent::PageProcessed(_) => self.pages_processed += 1,
            SinkEvent::PageFailed { .. } => self.pages_failed += 1,
            SinkEvent::ParseFailed { .. } => self.parse_failures += 1,
            SinkEvent::Entry(entry) => {
                self.entries += 1;
                self.total_seeders += entry.seeder_count;
                self.total_leechers += entry.leech_count;
                self.total_downloads += entry.download_count;
            }
            SinkEvent::CrawlStarting
            | SinkEvent::PageFetchStarting(_)
            | SinkEvent::PageFetchFinished(_) => {}
        }
    }

    /// Pages finished (processed or failed) out of the discovered total
    pub fn progress(&self) -> Option<(u64, u32)> {
        self.page_count
            .map(|total| (self.pages_processed + self.pages_failed, total))
    }

    /// Completion as a percentage of the discovered page count
    pub fn progress_percent(&self) -> f64 {
        match self.progress() {
            Some((done, total)) if total > 0 => (done as f64 / total as f64) * 100.0,
            _ => 0.0,
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics, report: &CrawlReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Outcome: {}", report.outcome);
    println!(
        "Duration: {:.2}s",
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    println!();

    println!("Pages:");
    println!("  Total in listing: {}", report.page_count);
    println!("  Processed: {}", stats.pages_processed);
    println!("  Failed: {}", stats.pages_failed);
    if stats.parse_failures > 0 {
        println!("  Parse failures: {}", stats.parse_failures);
    }
    println!();

    println!("Entries:");
    println!("  Downloaded magnets: {}", stats.entries);
    println!("  Seeders: {}", stats.total_seeders);
    println!("  Leechers: {}", stats.total_leechers);
    println!("  Completed downloads: {}", stats.total_downloads);
}
