//! End-to-end crawls against a mock listing site

use crate::common::{
    closed_port, fast_settings, handler, malformed_rightmove_card, mock_proxies, no_results_page,
    openrent_card, page, proxy_entry, rightmove_card, StubSolver,
};
use rent_sweep::config::{Config, OpenRentConfig, RightmoveConfig};
use rent_sweep::crawler::{CrawlSettings, SiteCrawler, SiteProfile, StopReason};
use rent_sweep::output::export_report;
use rent_sweep::resilience::FetchError;
use rent_sweep::trigger::{self, SiteSelector, TriggerOutcome};
use rent_sweep::{Site, SweepError};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RIGHTMOVE_PATH: &str = "/property-to-rent/find.html";
const OPENRENT_PATH: &str = "/properties-to-rent/london";

fn rightmove_profile(server: &MockServer) -> SiteProfile {
    SiteProfile::rightmove(&RightmoveConfig {
        base_url: format!("{}{}", server.uri(), RIGHTMOVE_PATH),
        ..RightmoveConfig::default()
    })
}

fn settings(target_count: usize) -> CrawlSettings {
    CrawlSettings {
        target_count,
        max_consecutive_failures: 2,
        deadline: None,
    }
}

async fn mount_rightmove_page(server: &MockServer, index: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(RIGHTMOVE_PATH))
        .and(query_param("index", index))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_malformed_fragment_is_dropped_without_failing_page() {
    let server = MockServer::start().await;

    mount_rightmove_page(
        &server,
        "0",
        page(&[
            rightmove_card(1, "£1,500 pcm"),
            malformed_rightmove_card(),
            rightmove_card(2, "£2,000 pcm"),
            rightmove_card(3, "£950 pcm"),
        ]),
    )
    .await;
    mount_rightmove_page(&server, "24", no_results_page()).await;

    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(10));

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.site, Site::Rightmove);
    assert_eq!(report.records.len(), 3);
    assert!(report.failed_pages.is_empty());
    assert_eq!(report.dropped_fragments, 1);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.stop_reason, StopReason::Exhausted);

    let first = &report.records[0];
    assert_eq!(
        first.url.as_deref(),
        Some(format!("{}/properties/1", server.uri()).as_str())
    );
    assert_eq!(first.address, "1 Example Road, London");
    assert_eq!(first.monthly_price, 1500.0);
    assert_eq!(first.deposit, Some(7500.0));
    assert_eq!(first.size_sqm, Some(55.74));
    assert_eq!(first.latitude, 51.51);
    assert_eq!(first.longitude, -0.12);
}

#[tokio::test]
async fn test_crawl_stops_at_target() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RIGHTMOVE_PATH))
        .and(query_param("index", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[
            rightmove_card(1, "£1,000 pcm"),
            rightmove_card(2, "£1,100 pcm"),
            rightmove_card(3, "£1,200 pcm"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(2));

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.stop_reason, StopReason::TargetReached);
    assert_eq!(report.pages_visited, 1);
}

#[tokio::test]
async fn test_duplicate_listings_across_pages_are_skipped() {
    let server = MockServer::start().await;

    mount_rightmove_page(
        &server,
        "0",
        page(&[rightmove_card(1, "£1,000 pcm"), rightmove_card(2, "£1,100 pcm")]),
    )
    .await;
    mount_rightmove_page(
        &server,
        "24",
        page(&[rightmove_card(2, "£1,100 pcm"), rightmove_card(3, "£1,200 pcm")]),
    )
    .await;
    mount_rightmove_page(&server, "48", no_results_page()).await;

    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(10));

    let report = crawler.crawl().await.unwrap();

    let addresses: Vec<_> = report.records.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(
        addresses,
        vec![
            "1 Example Road, London",
            "2 Example Road, London",
            "3 Example Road, London"
        ]
    );
    assert_eq!(report.duplicates, 1);
}

#[tokio::test]
async fn test_failed_page_is_skipped_and_crawl_continues() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RIGHTMOVE_PATH))
        .and(query_param("index", "0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_rightmove_page(&server, "24", page(&[rightmove_card(4, "£1,400 pcm")])).await;
    mount_rightmove_page(&server, "48", no_results_page()).await;

    let handler = handler(&mock_proxies(&server), 10, fast_settings(2, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(10));

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.failed_pages, vec![1]);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.proxy_failures, 2);
    assert_eq!(report.stop_reason, StopReason::Exhausted);
}

#[tokio::test]
async fn test_consecutive_empty_pages_stop_the_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RIGHTMOVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .expect(2)
        .mount(&server)
        .await;

    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(10));

    let report = crawler.crawl().await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.failed_pages, vec![1, 2]);
    assert_eq!(report.stop_reason, StopReason::FailureStreak);
}

#[tokio::test]
async fn test_exhausted_proxy_pool_fails_the_crawl() {
    let server = MockServer::start().await;
    let proxies = vec![proxy_entry(closed_port())];

    let handler = handler(&proxies, 1, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(10));

    let err = crawler.crawl().await.unwrap_err();

    assert!(matches!(err, SweepError::Fetch(FetchError::NoHealthyProxy)));
}

#[tokio::test]
async fn test_openrent_crawl_keeps_listings_without_links() {
    let server = MockServer::start().await;

    let unlinked = r#"<div class="property">
        <div class="location">7 Holloway Road, London</div>
        <div class="price"><strong>£1,050</strong></div>
    </div>"#
        .to_string();

    Mock::given(method("GET"))
        .and(path(OPENRENT_PATH))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(&[openrent_card(11, "£900"), unlinked])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(OPENRENT_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(no_results_page()))
        .mount(&server)
        .await;

    let profile = SiteProfile::openrent(&OpenRentConfig {
        base_url: format!("{}{}", server.uri(), OPENRENT_PATH),
    });
    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(profile, handler, settings(10));

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(
        report.records[0].url.as_deref(),
        Some(format!("{}/property-to-rent/11", server.uri()).as_str())
    );
    assert_eq!(report.records[0].latitude, 51.4);
    assert_eq!(report.records[1].url, None);
    assert_eq!(report.records[1].deposit, Some(5250.0));
}

#[tokio::test]
async fn test_crawl_report_exports_to_csv() {
    let server = MockServer::start().await;

    mount_rightmove_page(
        &server,
        "0",
        page(&[rightmove_card(1, "£1,500 pcm"), rightmove_card(2, "£2,000 pcm")]),
    )
    .await;
    mount_rightmove_page(&server, "24", no_results_page()).await;

    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings(10));
    let report = crawler.crawl().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("exports");
    let path = export_report(&report, &out_dir, 1).unwrap();

    assert_eq!(path, out_dir.join("rightmove_data.csv"));
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "url,address,monthly_price,property_type,size_sqm,latitude,longitude,deposit,available_from"
    );
    assert!(lines[1].contains("\"1 Example Road, London\",1500.0,2 bedroom flat,55.74"));
}

#[tokio::test]
async fn test_trigger_runs_both_sites() {
    let server = MockServer::start().await;

    mount_rightmove_page(&server, "0", page(&[rightmove_card(1, "£1,500 pcm")])).await;
    mount_rightmove_page(&server, "24", no_results_page()).await;
    Mock::given(method("GET"))
        .and(path(OPENRENT_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(no_results_page()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let port = server.address().port();
    let config: Config = toml::from_str(&format!(
        r#"
        [crawler]
        requests-per-minute = 600

        [captcha]
        service-key = "test-key"

        [output]
        directory = "{dir}"

        [[proxies]]
        host = "127.0.0.1"
        port = {port}
        username = "user"
        password = "pass"

        [rightmove]
        base-url = "{uri}{rightmove}"

        [openrent]
        base-url = "{uri}{openrent}"
        "#,
        dir = dir.path().display(),
        port = port,
        uri = server.uri(),
        rightmove = RIGHTMOVE_PATH,
        openrent = OPENRENT_PATH,
    ))
    .unwrap();

    let outcome = trigger::run(&config, SiteSelector::All, StubSolver::new("tok")).await;

    match outcome {
        TriggerOutcome::Success {
            message,
            files,
            statistics,
        } => {
            assert_eq!(message, "Scraping for both sites complete");
            assert_eq!(
                files,
                vec![
                    dir.path().join("rightmove_data.csv"),
                    dir.path().join("openrent_data.csv")
                ]
            );
            assert_eq!(statistics[0].listings, 1);
            assert_eq!(statistics[1].listings, 0);
        }
        TriggerOutcome::Error { message } => panic!("run failed: {message}"),
    }

    let openrent_csv = std::fs::read_to_string(dir.path().join("openrent_data.csv")).unwrap();
    assert_eq!(openrent_csv.lines().count(), 1);
}

#[tokio::test]
async fn test_crawl_stops_at_deadline_on_duplicate_only_pages() {
    let server = MockServer::start().await;

    // Every page repeats the same listing, so nothing new is ever retained
    Mock::given(method("GET"))
        .and(path(RIGHTMOVE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page(&[rightmove_card(1, "£1,500 pcm")])),
        )
        .mount(&server)
        .await;

    let handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));
    let settings = CrawlSettings {
        target_count: 10,
        max_consecutive_failures: 2,
        deadline: Some(Duration::from_millis(250)),
    };
    let mut crawler = SiteCrawler::with_handler(rightmove_profile(&server), handler, settings);

    let report = crawler.crawl().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::DeadlineExceeded);
    assert_eq!(report.records.len(), 1);
    assert!(report.duplicates >= 1);
    assert!(report.pages_visited > 2);
    assert!(report.failed_pages.is_empty());
}
