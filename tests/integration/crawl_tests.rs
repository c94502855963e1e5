//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through the real HTTP fetcher.

use std::sync::{Arc, Mutex};
use tnt_crawler::config::{Config, CrawlerConfig, SearchConfig, UserAgentConfig};
use tnt_crawler::crawler::{crawl_once, CrawlOutcome, Entry, TntCrawler};
use tnt_crawler::output::{ChannelSink, EntrySink, SinkEvent};
use tnt_crawler::TntError;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/src/releaselist.php";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, max_in_flight: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            endpoint: format!("{}{}", server.uri(), LISTING_PATH),
            max_in_flight,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
        },
        search: SearchConfig { category: 0 },
    }
}

/// Renders one listing page with `rows` releases
fn listing_page(total_pages: u32, page: u32, rows: u32) -> String {
    let mut html = String::from("<html><body>");
    if total_pages > 1 {
        html.push_str(r#"<div class="pagination"><ul>"#);
        for p in 1..=total_pages {
            html.push_str(&format!(r#"<li p="{p}"><a href="/list?p={p}">{p}</a></li>"#));
        }
        html.push_str(&format!(
            r#"<li p="{total_pages}"><a href="/list?p={total_pages}">Ultima</a></li>"#
        ));
        html.push_str("</ul></div>");
    }
    html.push_str(r#"<div class="showrelease_tb"><table>"#);
    html.push_str("<tr><th>T</th><th>M</th><th>C</th><th>L</th><th>S</th><th>D</th><th>Titolo</th></tr>");
    for row in 0..rows {
        html.push_str(&format!(
            r#"<tr><td><a href="/download/{page}-{row}.torrent">T</a></td><td><a href="magnet:?xt=urn:btih:{page}{row}">M</a></td><td>cat</td><td>{leech}</td><td>{seed}</td><td>{down}</td><td><a href="/release/{page}-{row}">Release {page}-{row}</a></td></tr>"#,
            leech = row,
            seed = page * 10 + row,
            down = 100 + row,
        ));
    }
    html.push_str("</table></div></body></html>");
    html
}

/// Mounts a mock answering the form post for `page`
async fn mount_page(server: &MockServer, page: u32, body: String, expected: u64) {
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .and(body_string_contains(format!("page={}", page).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<Entry>>,
    page_counts: Mutex<Vec<u32>>,
    processed: Mutex<Vec<u32>>,
    failed: Mutex<Vec<u32>>,
}

impl EntrySink for CollectingSink {
    fn page_count_discovered(&self, count: u32) {
        self.page_counts.lock().unwrap().push(count);
    }

    fn entry(&self, entry: &Entry) {
        self.entries.lock().unwrap().push(entry.clone());
    }

    fn page_processed(&self, page: u32) {
        self.processed.lock().unwrap().push(page);
    }

    fn page_failed(&self, page: u32, _error: &TntError) {
        self.failed.lock().unwrap().push(page);
    }
}

#[tokio::test]
async fn test_full_crawl_three_pages() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        mount_page(&server, page, listing_page(3, page, 2), 1).await;
    }

    let config = create_test_config(&server, 10);
    let sink = Arc::new(CollectingSink::default());
    let report = crawl_once(&config, "ciao", 0, sink.clone())
        .await
        .expect("Crawl should run");

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.page_count, 3);
    assert_eq!(report.pages_processed, 3);
    assert_eq!(report.entries_delivered, 6);

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0].title, "Release 1-0");
    assert_eq!(entries[0].magnet_link, "magnet:?xt=urn:btih:10");
    assert_eq!(entries[0].seeder_count, 10);
    assert_eq!(entries[0].download_count, 100);
    assert!(entries.iter().any(|e| e.title == "Release 3-1"));

    assert_eq!(*sink.page_counts.lock().unwrap(), vec![3]);
    let mut processed = sink.processed.lock().unwrap().clone();
    processed.sort_unstable();
    assert_eq!(processed, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_form_fields_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .and(header("user-agent", "TestBot/1.0.0"))
        .and(body_string_contains("srcrel=the+wire"))
        .and(body_string_contains("cat=4"))
        .and(body_string_contains("page=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1, 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, 10);
    let sink = Arc::new(CollectingSink::default());
    let report = crawl_once(&config, "the wire", 4, sink.clone()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(sink.entries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_single_page_listing() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(1, 1, 3), 1).await;
    mount_page(&server, 2, listing_page(1, 2, 3), 0).await;

    let config = create_test_config(&server, 10);
    let sink = Arc::new(CollectingSink::default());
    let report = crawl_once(&config, "ciao", 0, sink.clone()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.page_count, 1);
    assert_eq!(sink.entries.lock().unwrap().len(), 3);
    assert_eq!(*sink.page_counts.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_failed_later_page_is_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(3, 1, 2), 1).await;
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .and(body_string_contains("page=2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 3, listing_page(3, 3, 2), 1).await;

    let config = create_test_config(&server, 10);
    let sink = Arc::new(CollectingSink::default());
    let report = crawl_once(&config, "ciao", 0, sink.clone()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.entries_delivered, 4);
    assert_eq!(*sink.failed.lock().unwrap(), vec![2]);
    assert!(!sink.processed.lock().unwrap().contains(&2));
}

#[tokio::test]
async fn test_first_page_failure_fails_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, 10);
    let sink = Arc::new(CollectingSink::default());
    let report = crawl_once(&config, "ciao", 0, sink.clone()).await.unwrap();

    match report.outcome {
        CrawlOutcome::Failed { reason } => assert!(reason.contains("503")),
        other => panic!("Expected Failed, got {:?}", other),
    }
    assert!(sink.page_counts.lock().unwrap().is_empty());
    assert!(sink.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_page_without_table_does_not_stop_others() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(3, 1, 1), 1).await;
    mount_page(
        &server,
        2,
        "<html><body><p>Nessun risultato</p></body></html>".to_string(),
        1,
    )
    .await;
    mount_page(&server, 3, listing_page(3, 3, 1), 1).await;

    let config = create_test_config(&server, 2);
    let sink = Arc::new(CollectingSink::default());
    let report = crawl_once(&config, "ciao", 0, sink.clone()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.entries_delivered, 2);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(sink.processed.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_stop_before_crawl_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1, 1, 1)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, 10);
    let sink = Arc::new(CollectingSink::default());
    let mut crawler = TntCrawler::new(&config, sink.clone()).unwrap();
    crawler.setup(Some("ciao"), Some(0)).unwrap();
    crawler.stop();

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Cancelled);
    assert_eq!(report.entries_delivered, 0);
    assert_eq!(crawler.available_slots(), 10);
    crawler.shutdown();
}

#[tokio::test]
async fn test_channel_sink_event_order() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(2, 1, 1), 1).await;
    mount_page(&server, 2, listing_page(2, 2, 1), 1).await;

    let config = create_test_config(&server, 10);
    let (sink, mut events) = ChannelSink::new();
    let report = crawl_once(&config, "ciao", 0, Arc::new(sink)).await.unwrap();
    assert_eq!(report.outcome, CrawlOutcome::Completed);

    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }

    assert_eq!(received.first(), Some(&SinkEvent::CrawlStarting));
    let discovered = received
        .iter()
        .position(|e| *e == SinkEvent::PageCountDiscovered(2))
        .expect("page count event");
    let first_entry = received
        .iter()
        .position(|e| matches!(e, SinkEvent::Entry(_)))
        .expect("entry event");
    let page_one_done = received
        .iter()
        .position(|e| *e == SinkEvent::PageProcessed(1))
        .expect("page 1 processed");
    assert!(discovered < first_entry);
    assert!(first_entry < page_one_done);
    assert!(received.contains(&SinkEvent::PageFetchStarting(2)));
    assert!(received.contains(&SinkEvent::PageProcessed(2)));
}
