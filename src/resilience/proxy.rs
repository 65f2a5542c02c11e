//! Least-recently-used proxy rotation with failure demotion

use crate::config::ProxyEntry;
use crate::resilience::FetchError;
use std::fmt;
use std::time::Instant;

/// One outbound proxy and its health
#[derive(Clone)]
pub struct ProxyDescriptor {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,

    /// Failures reported since the last reset
    pub failures: u32,

    /// When this proxy was last handed out (`None` if never)
    pub last_used: Option<Instant>,
}

impl ProxyDescriptor {
    /// Creates a fresh descriptor from a config entry
    pub fn from_entry(entry: &ProxyEntry) -> Self {
        Self {
            host: entry.host.clone(),
            port: entry.port,
            username: entry.username.clone(),
            password: entry.password.clone(),
            failures: 0,
            last_used: None,
        }
    }

    /// Proxy URL without credentials
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// Credentials stay out of logs
impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("failures", &self.failures)
            .field("last_used", &self.last_used)
            .finish()
    }
}

/// Connection parameters of the proxy picked for one attempt
#[derive(Clone)]
pub struct ProxyLease {
    /// Position in the rotator's pool
    pub index: usize,
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ProxyLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyLease")
            .field("index", &self.index)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Hands out the least-recently-used healthy proxy
///
/// A proxy whose failure count reaches the threshold is demoted: it stays in
/// the pool but is skipped by [`select`](Self::select) until its failures are
/// reset.
#[derive(Debug)]
pub struct ProxyRotator {
    pool: Vec<ProxyDescriptor>,
    failure_threshold: u32,
}

impl ProxyRotator {
    /// Creates a rotator over the given pool
    pub fn new(pool: Vec<ProxyDescriptor>, failure_threshold: u32) -> Self {
        Self {
            pool,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Creates a rotator from config entries
    pub fn from_entries(entries: &[ProxyEntry], failure_threshold: u32) -> Self {
        Self::new(
            entries.iter().map(ProxyDescriptor::from_entry).collect(),
            failure_threshold,
        )
    }

    fn is_healthy(&self, proxy: &ProxyDescriptor) -> bool {
        proxy.failures < self.failure_threshold
    }

    /// Picks the healthy proxy used longest ago and stamps it as used now
    ///
    /// Never-used proxies come first; ties keep pool order.
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyLease)` - The proxy to use for the next attempt
    /// * `Err(FetchError::NoHealthyProxy)` - Every proxy has been demoted
    pub fn select(&mut self) -> Result<ProxyLease, FetchError> {
        let index = self
            .pool
            .iter()
            .enumerate()
            .filter(|(_, proxy)| self.is_healthy(proxy))
            .min_by_key(|(_, proxy)| proxy.last_used)
            .map(|(index, _)| index)
            .ok_or(FetchError::NoHealthyProxy)?;

        let proxy = &mut self.pool[index];
        proxy.last_used = Some(Instant::now());

        Ok(ProxyLease {
            index,
            endpoint: proxy.endpoint(),
            username: proxy.username.clone(),
            password: proxy.password.clone(),
        })
    }

    /// Records a failed attempt through the leased proxy
    pub fn report_failure(&mut self, lease: &ProxyLease) {
        let threshold = self.failure_threshold;
        let Some(proxy) = self.pool.get_mut(lease.index) else {
            return;
        };

        proxy.failures += 1;
        if proxy.failures == threshold {
            tracing::warn!(
                "Proxy {}:{} exceeded failure threshold ({}), demoting",
                proxy.host,
                proxy.port,
                threshold
            );
        } else {
            tracing::debug!(
                "Proxy {}:{} failure {}/{}",
                proxy.host,
                proxy.port,
                proxy.failures,
                threshold
            );
        }
    }

    /// Clears the failure count of one proxy, making it eligible again
    pub fn reset_failures(&mut self, index: usize) {
        if let Some(proxy) = self.pool.get_mut(index) {
            proxy.failures = 0;
        }
    }

    /// Failure count of the proxy at `index`
    pub fn failures(&self, index: usize) -> Option<u32> {
        self.pool.get(index).map(|proxy| proxy.failures)
    }

    /// Sum of failures across the pool
    pub fn total_failures(&self) -> u32 {
        self.pool.iter().map(|proxy| proxy.failures).sum()
    }

    /// Number of proxies still eligible for selection
    pub fn healthy_count(&self) -> usize {
        self.pool.iter().filter(|proxy| self.is_healthy(proxy)).count()
    }

    /// Total pool size, demoted proxies included
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns true if the pool has no proxies at all
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
