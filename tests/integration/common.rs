//! Shared fixtures for the integration tests

use async_trait::async_trait;
use rent_sweep::config::ProxyEntry;
use rent_sweep::resilience::{
    CaptchaError, CaptchaSolver, HandlerSettings, ProxyRotator, RateLimiter, RequestHandler,
};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Solver that always returns the same token and counts its calls
pub struct StubSolver {
    token: String,
    calls: AtomicU32,
}

impl StubSolver {
    pub fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaSolver for StubSolver {
    async fn solve(&self, _site_key: &str, _page_url: &str) -> Result<String, CaptchaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }
}

pub fn proxy_entry(port: u16) -> ProxyEntry {
    ProxyEntry {
        host: "127.0.0.1".to_string(),
        port,
        username: "user".to_string(),
        password: "pass".to_string(),
    }
}

/// Two proxy entries that both route through the mock server
pub fn mock_proxies(server: &MockServer) -> Vec<ProxyEntry> {
    let port = server.address().port();
    vec![proxy_entry(port), proxy_entry(port)]
}

/// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Settings with short timeouts and backoff so tests stay fast
pub fn fast_settings(max_attempts: u32, captcha_retries: u32) -> HandlerSettings {
    HandlerSettings {
        max_attempts,
        captcha_retries,
        request_timeout: Duration::from_secs(5),
        backoff_min: Duration::from_millis(10),
        backoff_max: Duration::from_millis(20),
    }
}

pub fn handler(
    proxies: &[ProxyEntry],
    threshold: u32,
    settings: HandlerSettings,
    solver: Arc<dyn CaptchaSolver>,
) -> RequestHandler {
    RequestHandler::new(
        settings,
        ProxyRotator::from_entries(proxies, threshold),
        RateLimiter::new(600),
        solver,
    )
}

/// A well-formed Rightmove listing card
pub fn rightmove_card(id: u32, price: &str) -> String {
    format!(
        r#"<div class="propertyCard" data-lat-lng="51.5{id},-0.12">
            <a class="propertyCard-link" href="/properties/{id}">
                <h2 class="propertyCard-title">2 bedroom flat</h2>
            </a>
            <address class="propertyCard-address">{id} Example Road, London</address>
            <div class="propertyCard-priceValue">{price}</div>
            <div class="propertyCard-size">600 sq ft</div>
            <div class="propertyCard-available">Available now</div>
        </div>"#
    )
}

/// A Rightmove card with no price, which fails retention
pub fn malformed_rightmove_card() -> String {
    r#"<div class="propertyCard">
        <a class="propertyCard-link" href="/properties/999">Flat</a>
        <address class="propertyCard-address">999 Nowhere Lane</address>
        <div class="propertyCard-priceValue">POA</div>
    </div>"#
        .to_string()
}

/// A well-formed OpenRent listing card
pub fn openrent_card(id: u32, price: &str) -> String {
    format!(
        r#"<div class="property" data-latitude="51.4" data-longitude="-0.1">
            <h2><a href="/property-to-rent/{id}">Studio</a></h2>
            <div class="location">{id} Camden Road, London</div>
            <div class="price"><strong>{price}</strong> per month</div>
        </div>"#
    )
}

pub fn page(cards: &[String]) -> String {
    format!("<html><body><div class=\"results\">{}</div></body></html>", cards.join("\n"))
}

pub fn no_results_page() -> String {
    r#"<html><body><div class="no-results">No properties match your search</div></body></html>"#
        .to_string()
}
