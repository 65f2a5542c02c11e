//! Request handler behaviour against a mock site routed through mock proxies

use crate::common::{closed_port, fast_settings, handler, mock_proxies, proxy_entry, StubSolver};
use reqwest::header::HeaderMap;
use rent_sweep::resilience::{FetchError, HandlerSettings, CAPTCHA_TOKEN_PARAM};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAPTCHA_BODY: &str = r#"<html><body><h1>Please complete the captcha</h1>
    <div class="g-recaptcha" data-sitekey="site-key-123"></div></body></html>"#;

fn no_params() -> Vec<(String, String)> {
    Vec::new()
}

#[tokio::test]
async fn test_retries_through_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>listings</html>"))
        .with_priority(3)
        .mount(&server)
        .await;

    let mut handler = handler(
        &mock_proxies(&server),
        3,
        fast_settings(3, 3),
        StubSolver::new("unused"),
    );

    let body = handler
        .fetch(&format!("{}/find.html", server.uri()), &no_params(), &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(body, "<html>listings</html>");
    assert_eq!(handler.rotator().total_failures(), 2);
    assert_eq!(handler.rotator().failures(0), Some(1));
    assert_eq!(handler.rotator().failures(1), Some(1));
}

#[tokio::test]
async fn test_captcha_is_solved_and_request_retried_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/find.html"))
        .and(query_param(CAPTCHA_TOKEN_PARAM, "tok"))
        .and(query_param("index", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>solved</html>"))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(403).set_body_string(CAPTCHA_BODY))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let solver = StubSolver::new("tok");
    let mut handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), solver.clone());

    let params = vec![("index".to_string(), "0".to_string())];
    let body = handler
        .fetch(&format!("{}/find.html", server.uri()), &params, &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(body, "<html>solved</html>");
    assert_eq!(solver.calls(), 1);
    assert_eq!(handler.rotator().total_failures(), 0);
}

#[tokio::test]
async fn test_captcha_rounds_are_capped() {
    let server = MockServer::start().await;

    // One solved round, then two attempts spent on the exhausted CAPTCHA budget
    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(403).set_body_string(CAPTCHA_BODY))
        .expect(3)
        .mount(&server)
        .await;

    let solver = StubSolver::new("tok");
    let mut handler = handler(&mock_proxies(&server), 3, fast_settings(2, 1), solver.clone());

    let err = handler
        .fetch(&format!("{}/find.html", server.uri()), &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 2, .. }));
    assert_eq!(solver.calls(), 1);
    assert_eq!(handler.rotator().total_failures(), 0);
}

#[tokio::test]
async fn test_forbidden_without_captcha_demotes_proxy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Access denied"))
        .expect(2)
        .mount(&server)
        .await;

    let solver = StubSolver::new("tok");
    let mut handler = handler(&mock_proxies(&server), 3, fast_settings(2, 3), solver.clone());

    let err = handler
        .fetch(&format!("{}/find.html", server.uri()), &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 2, .. }));
    assert_eq!(solver.calls(), 0);
    assert_eq!(handler.rotator().total_failures(), 2);
}

#[tokio::test]
async fn test_transport_failures_exhaust_attempts() {
    let proxies = vec![proxy_entry(closed_port())];
    let mut handler = handler(&proxies, 5, fast_settings(3, 3), StubSolver::new("tok"));

    let err = handler
        .fetch("http://listings.invalid/find.html", &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();

    match err {
        FetchError::RetriesExhausted { url, attempts } => {
            assert_eq!(url, "http://listings.invalid/find.html");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(handler.rotator().failures(0), Some(3));
    assert_eq!(handler.rotator().healthy_count(), 1);
    assert_eq!(handler.backoff_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failures_back_off_between_attempts_only() {
    let proxies = vec![proxy_entry(closed_port())];
    let settings = HandlerSettings {
        max_attempts: 3,
        captcha_retries: 3,
        request_timeout: Duration::from_secs(5),
        backoff_min: Duration::from_secs(2),
        backoff_max: Duration::from_secs(5),
    };
    let mut handler = handler(&proxies, 5, settings, StubSolver::new("tok"));

    let started = tokio::time::Instant::now();
    let err = handler
        .fetch("http://listings.invalid/find.html", &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }));
    // Two sleeps between three attempts, none after the last one
    assert_eq!(handler.backoff_count(), 2);
    assert!(started.elapsed() >= Duration::from_secs(4));
}

#[tokio::test]
async fn test_reset_proxy_is_selected_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/find.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>back</html>"))
        .with_priority(2)
        .mount(&server)
        .await;

    let proxies = vec![proxy_entry(server.address().port())];
    let mut handler = handler(&proxies, 1, fast_settings(3, 3), StubSolver::new("tok"));
    let url = format!("{}/find.html", server.uri());

    let err = handler
        .fetch(&url, &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NoHealthyProxy));

    handler.rotator_mut().reset_failures(0);
    assert_eq!(handler.rotator().healthy_count(), 1);

    let body = handler
        .fetch(&url, &no_params(), &HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(body, "<html>back</html>");
}

#[tokio::test]
async fn test_demoting_every_proxy_is_fatal() {
    let proxies = vec![proxy_entry(closed_port())];
    let mut handler = handler(&proxies, 1, fast_settings(3, 3), StubSolver::new("tok"));

    let err = handler
        .fetch("http://listings.invalid/find.html", &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::NoHealthyProxy));
    assert!(!err.is_page_local());
    assert_eq!(handler.rotator().healthy_count(), 0);
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let mut handler = handler(&mock_proxies(&server), 3, fast_settings(3, 3), StubSolver::new("tok"));

    let err = handler
        .fetch("not a url", &no_params(), &HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::InvalidUrl { .. }));
    assert_eq!(handler.rotator().total_failures(), 0);
}
