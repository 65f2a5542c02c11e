//! Sliding-window rate limiter
//!
//! Admissions are recorded in a window covering the trailing 60 seconds. Once
//! the window is full, `admit` sleeps until the oldest admission ages out.
//! The limiter blocks rather than rejects, so callers always proceed eventually.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Length of the sliding window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Bounds outbound requests to `capacity` per trailing minute
#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    /// Held across the whole prune, wait, append sequence
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests_per_minute` requests per window
    pub fn new(requests_per_minute: usize) -> Self {
        let capacity = requests_per_minute.max(1);
        Self {
            capacity,
            window: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Returns the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits until a request may be sent, then records it
    pub async fn admit(&self) {
        let mut window = self.window.lock().await;
        prune(&mut window, Instant::now());

        if window.len() >= self.capacity {
            if let Some(&oldest) = window.front() {
                let wait = (oldest + WINDOW).saturating_duration_since(Instant::now());
                if !wait.is_zero() {
                    tracing::debug!("Rate window full, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
            window.pop_front();
        }

        window.push_back(Instant::now());
    }

    /// Number of admissions inside the current window
    pub async fn in_window(&self) -> usize {
        let mut window = self.window.lock().await;
        prune(&mut window, Instant::now());
        window.len()
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&oldest) = window.front() {
        if now.duration_since(oldest) >= WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}
