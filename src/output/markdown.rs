//! Markdown report generation
//!
//! Writes the entries gathered during a crawl as a sortable markdown table,
//! preceded by run information and statistics.

use crate::crawler::{CrawlReport, Entry};
use crate::output::stats::CrawlStatistics;
use crate::output::traits::OutputResult;
use std::cmp::Ordering;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Column an entry table can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Title,
    #[default]
    Seeders,
    Leeches,
    Downloaded,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "seeders" => Ok(Self::Seeders),
            "leeches" | "leechers" => Ok(Self::Leeches),
            "downloaded" | "downloads" => Ok(Self::Downloaded),
            other => Err(format!(
                "unknown sort column '{}' (expected title, seeders, leeches or downloaded)",
                other
            )),
        }
    }
}

/// Sorts entries by `key`
///
/// Numeric columns sort descending (most seeded first) unless `reverse` is
/// set; titles sort ascending unless `reverse` is set. Ties keep their
/// arrival order.
pub fn sort_entries(entries: &mut [Entry], key: SortKey, reverse: bool) {
    let compare = |a: &Entry, b: &Entry| -> Ordering {
        match key {
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Seeders => b.seeder_count.cmp(&a.seeder_count),
            SortKey::Leeches => b.leech_count.cmp(&a.leech_count),
            SortKey::Downloaded => b.download_count.cmp(&a.download_count),
        }
    };

    if reverse {
        entries.sort_by(|a, b| compare(b, a));
    } else {
        entries.sort_by(compare);
    }
}

/// Writes a markdown report to `output_path`
///
/// # Arguments
///
/// * `keyword` - The search keyword the crawl ran with
/// * `report` - The crawl's final report
/// * `stats` - Totals accumulated from the crawl's events
/// * `entries` - Entries to tabulate, in the order they should appear
pub fn generate_markdown_report(
    keyword: &str,
    report: &CrawlReport,
    stats: &CrawlStatistics,
    entries: &[Entry],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(keyword, report, stats, entries);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl as markdown
pub fn format_markdown_report(
    keyword: &str,
    report: &CrawlReport,
    stats: &CrawlStatistics,
    entries: &[Entry],
) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Release search: {}\n\n", escape_cell(keyword)));

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Outcome**: {}\n\n", report.outcome));

    md.push_str("## Statistics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages in listing | {} |\n", report.page_count));
    md.push_str(&format!("| Pages processed | {} |\n", report.pages_processed));
    md.push_str(&format!("| Pages failed | {} |\n", report.pages_failed));
    md.push_str(&format!("| Entries | {} |\n", report.entries_delivered));
    md.push_str(&format!("| Seeders | {} |\n", stats.total_seeders));
    md.push_str(&format!("| Leechers | {} |\n", stats.total_leechers));
    md.push_str(&format!("| Downloads | {} |\n\n", stats.total_downloads));

    md.push_str("## Entries\n\n");
    if entries.is_empty() {
        md.push_str("_No entries found._\n");
        return md;
    }

    md.push_str("| Title | Seeders | Leeches | Downloaded | Magnet |\n");
    md.push_str("|-------|---------|---------|------------|--------|\n");
    for entry in entries {
        md.push_str(&format!(
            "| {} | {} | {} | {} | [magnet]({}) |\n",
            escape_cell(&entry.title),
            entry.seeder_count,
            entry.leech_count,
            entry.download_count,
            escape_cell(&entry.magnet_link)
        ));
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlOutcome;
    use chrono::Utc;

    fn entry(title: &str, seeders: u64, leeches: u64, downloads: u64) -> Entry {
        Entry {
            torrent_link: format!("http://example.com/{}.torrent", title),
            magnet_link: format!("magnet:?dn={}", title),
            title: title.to_string(),
            leech_count: leeches,
            seeder_count: seeders,
            download_count: downloads,
        }
    }

    fn report(entries: usize) -> CrawlReport {
        let now = Utc::now();
        CrawlReport {
            outcome: CrawlOutcome::Completed,
            page_count: 1,
            pages_processed: 1,
            pages_failed: 0,
            entries_delivered: entries,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Seeders".parse::<SortKey>().unwrap(), SortKey::Seeders);
        assert_eq!("leechers".parse::<SortKey>().unwrap(), SortKey::Leeches);
        assert_eq!("title".parse::<SortKey>().unwrap(), SortKey::Title);
        assert!("size".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_sort_by_seeders_descending() {
        let mut entries = vec![entry("a", 1, 0, 0), entry("b", 9, 0, 0), entry("c", 5, 0, 0)];
        sort_entries(&mut entries, SortKey::Seeders, false);
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a"]);

        sort_entries(&mut entries, SortKey::Seeders, true);
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_by_title_case_insensitive() {
        let mut entries = vec![entry("beta", 0, 0, 0), entry("Alpha", 0, 0, 0)];
        sort_entries(&mut entries, SortKey::Title, false);
        assert_eq!(entries[0].title, "Alpha");
    }

    #[test]
    fn test_format_contains_table_rows() {
        let entries = vec![entry("Show | S01", 3, 2, 1)];
        let md = format_markdown_report("show", &report(1), &CrawlStatistics::new(), &entries);

        assert!(md.starts_with("# Release search: show"));
        assert!(md.contains("| Show \\| S01 | 3 | 2 | 1 | [magnet](magnet:?dn=Show \\| S01) |"));
        assert!(md.contains("| Entries | 1 |"));
    }

    #[test]
    fn test_format_without_entries() {
        let md = format_markdown_report("none", &report(0), &CrawlStatistics::new(), &[]);
        assert!(md.contains("_No entries found._"));
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        generate_markdown_report("k", &report(0), &CrawlStatistics::new(), &[], &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Statistics"));
    }
}
