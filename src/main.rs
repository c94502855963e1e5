//! tnt-crawler main entry point
//!
//! This is the command-line interface for the TNT release-list crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tnt_crawler::config::{load_config_with_hash, validate, Config};
use tnt_crawler::crawler::{CrawlOutcome, Entry, StopHandle, TntCrawler};
use tnt_crawler::output::{
    generate_markdown_report, print_statistics, sort_entries, ChannelSink, CrawlStatistics,
    SinkEvent, SortKey,
};
use tracing_subscriber::EnvFilter;

/// tnt-crawler: download every result of a release-list search
///
/// Posts the search form once per page, discovers how many pages the listing
/// has from page 1, then fetches the rest concurrently and prints each
/// release's magnet link as it arrives.
#[derive(Parser, Debug)]
#[command(name = "tnt-crawler")]
#[command(version)]
#[command(about = "Crawl a paginated release listing", long_about = None)]
struct Cli {
    /// Search keyword
    #[arg(value_name = "KEYWORD")]
    keyword: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Search category (overrides the configuration file)
    #[arg(long)]
    category: Option<u32>,

    /// Maximum number of page downloads in flight at once
    #[arg(long)]
    max_in_flight: Option<u32>,

    /// Search endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Stop the crawl after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Write a markdown report of the gathered entries to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Column the report table is sorted by (title, seeders, leeches, downloaded)
    #[arg(long, default_value = "seeders")]
    sort: SortKey,

    /// Reverse the report's sort order
    #[arg(long)]
    reverse: bool,

    /// Do not print magnet links as entries arrive
    #[arg(long)]
    quiet_entries: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load_effective_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let category = cli.category.unwrap_or(config.search.category);

    let (sink, mut events) = ChannelSink::new();
    let mut crawler = TntCrawler::new(&config, Arc::new(sink)).context("Failed to build crawler")?;
    if let Err(e) = crawler.setup(Some(&cli.keyword), Some(category)) {
        tracing::error!("{}", e);
        return Ok(ExitCode::from(2));
    }

    spawn_stop_triggers(crawler.stop_handle(), cli.timeout_secs);

    tracing::info!(
        keyword = %cli.keyword,
        category,
        max_in_flight = crawler.max_in_flight(),
        "Starting crawl"
    );

    let mut worker = tokio::spawn(async move {
        let report = crawler.crawl().await;
        (crawler, report)
    });

    let mut display = Display::new(!cli.quiet_entries && !cli.quiet);
    let (crawler, report) = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => display.handle(event),
            joined = &mut worker => break joined.context("Crawl task failed")?,
        }
    };
    while let Ok(event) = events.try_recv() {
        display.handle(event);
    }

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl could not start: {}", e);
            crawler.shutdown();
            return Ok(ExitCode::from(2));
        }
    };

    if !cli.quiet {
        println!();
        print_statistics(&display.stats, &report);
    }

    if let Some(path) = &cli.output {
        let mut entries = display.entries;
        sort_entries(&mut entries, cli.sort, cli.reverse);
        generate_markdown_report(&cli.keyword, &report, &display.stats, &entries, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    crawler.shutdown();

    Ok(match report.outcome {
        CrawlOutcome::Failed { .. } => ExitCode::FAILURE,
        CrawlOutcome::Completed | CrawlOutcome::Cancelled => ExitCode::SUCCESS,
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tnt_crawler=info,warn"),
            1 => EnvFilter::new("tnt_crawler=debug,info"),
            2 => EnvFilter::new("tnt_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration file (if any), applies CLI overrides and validates
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(max_in_flight) = cli.max_in_flight {
        config.crawler.max_in_flight = max_in_flight;
    }
    if let Some(endpoint) = &cli.endpoint {
        config.crawler.endpoint = endpoint.clone();
    }

    validate(&config)?;
    Ok(config)
}

/// Stops the crawl on Ctrl-C or once the optional deadline passes
fn spawn_stop_triggers(stop: StopHandle, timeout_secs: Option<u64>) {
    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            on_signal.stop();
        }
    });

    if let Some(secs) = timeout_secs {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!("Deadline of {}s reached, stopping crawl", secs);
            stop.stop();
        });
    }
}

/// Consumes crawl events on the main task
struct Display {
    stats: CrawlStatistics,
    entries: Vec<Entry>,
    print_entries: bool,
}

impl Display {
    fn new(print_entries: bool) -> Self {
        Self {
            stats: CrawlStatistics::new(),
            entries: Vec::new(),
            print_entries,
        }
    }

    fn handle(&mut self, event: SinkEvent) {
        self.stats.record(&event);

        match event {
            SinkEvent::Entry(entry) => {
                if self.print_entries {
                    println!("{}", entry.magnet_link);
                }
                self.entries.push(entry);
            }
            SinkEvent::PageCountDiscovered(count) => {
                tracing::info!(count, "Listing has {} pages", count);
            }
            SinkEvent::PageProcessed(page) => {
                if let Some((done, total)) = self.stats.progress() {
                    tracing::info!(
                        page,
                        "Progress: {}/{} pages ({:.0}%)",
                        done,
                        total,
                        self.stats.progress_percent()
                    );
                }
            }
            _ => {}
        }
    }
}
