//! Live lookups with rate limiting, retries and caching.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
    cache::*,
    entities::{address::*, geo::*},
    gateways::geocode::*,
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Enforces a minimum interval between consecutive external requests.
///
/// The lock is held while waiting, so concurrent callers line up behind
/// each other.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until the next request may be sent.
    pub fn wait(&self) {
        let mut last_request = self.last_request.lock();
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                log::trace!("Rate limiting: waiting {wait:?}");
                thread::sleep(wait);
            }
        }
        *last_request = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (starting at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientStats {
    pub external_calls: usize,
    pub cache_hits: usize,
    pub retries: usize,
    pub widened: usize,
}

#[derive(Debug, Default)]
struct Counters {
    external_calls: AtomicUsize,
    cache_hits: AtomicUsize,
    retries: AtomicUsize,
    widened: AtomicUsize,
}

fn inc(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub min_request_interval: Duration,
    pub retry: RetryPolicy,
    /// Look up the street alone if a house could not be found.
    pub widen_to_street: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            retry: RetryPolicy::default(),
            widen_to_street: true,
        }
    }
}

#[derive(Debug)]
pub struct GeocodeClient<G> {
    gateway: G,
    limiter: RateLimiter,
    retry: RetryPolicy,
    widen_to_street: bool,
    counters: Counters,
}

impl<G> GeocodeClient<G>
where
    G: GeoCodingGateway,
{
    pub fn new(gateway: G, config: ClientConfig) -> Self {
        let ClientConfig {
            min_request_interval,
            retry,
            widen_to_street,
        } = config;
        Self {
            gateway,
            limiter: RateLimiter::new(min_request_interval),
            retry,
            widen_to_street,
            counters: Default::default(),
        }
    }

    pub fn stats(&self) -> ClientStats {
        let Counters {
            external_calls,
            cache_hits,
            retries,
            widened,
        } = &self.counters;
        ClientStats {
            external_calls: external_calls.load(Ordering::Relaxed),
            cache_hits: cache_hits.load(Ordering::Relaxed),
            retries: retries.load(Ordering::Relaxed),
            widened: widened.load(Ordering::Relaxed),
        }
    }

    /// Resolves an address, widening to the street if the house is not found.
    ///
    /// The final outcome is cached under the full query.
    pub fn resolve(&self, cache: &GeocodeCache, addr: &NormalizedAddress) -> Option<Coordinate> {
        let query = addr.query();
        if let Some(entry) = self.cached(cache, &query) {
            return entry.coordinate();
        }
        let mut outcome = self.fetch(&query);
        if outcome.is_miss()
            && self.widen_to_street
            && addr.has_house_number()
            && !addr.is_unknown_street()
        {
            outcome = self.widen_entry(cache, &addr.street_key);
        }
        cache.insert(&query, outcome).coordinate()
    }

    /// Resolves a query as is.
    pub fn lookup(&self, cache: &GeocodeCache, query: &str) -> Option<Coordinate> {
        self.lookup_entry(cache, query).coordinate()
    }

    /// Looks up the street alone, if widening is enabled.
    pub fn widen(&self, cache: &GeocodeCache, street_key: &str) -> Option<Coordinate> {
        if !self.widen_to_street {
            return None;
        }
        self.widen_entry(cache, street_key).coordinate()
    }

    fn widen_entry(&self, cache: &GeocodeCache, street_key: &str) -> CacheEntry {
        log::debug!("Widening to '{street_key}'");
        let entry = self.lookup_entry(cache, street_key);
        if entry.coordinate().is_some() {
            inc(&self.counters.widened);
        }
        entry
    }

    fn lookup_entry(&self, cache: &GeocodeCache, query: &str) -> CacheEntry {
        if let Some(entry) = self.cached(cache, query) {
            return entry;
        }
        let outcome = self.fetch(query);
        cache.insert(query, outcome)
    }

    fn cached(&self, cache: &GeocodeCache, query: &str) -> Option<CacheEntry> {
        let entry = cache.get(query)?;
        log::trace!("Cache hit for '{query}'");
        inc(&self.counters.cache_hits);
        Some(entry)
    }

    /// One external lookup including retries.
    ///
    /// Returns [`CacheEntry::Unavailable`] if the service could not be
    /// reached within the allowed attempts.
    fn fetch(&self, query: &str) -> CacheEntry {
        let max_attempts = self.retry.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            self.limiter.wait();
            inc(&self.counters.external_calls);
            log::debug!("Looking up '{query}' (attempt {attempt}/{max_attempts})");
            match self.gateway.forward(query) {
                Ok(Some(pos)) => return CacheEntry::Found(pos),
                Ok(None) => {
                    log::debug!("No result for '{query}'");
                    return CacheEntry::Miss;
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    log::warn!("Lookup of '{query}' failed: {err}, retrying in {delay:?}");
                    inc(&self.counters.retries);
                    thread::sleep(delay);
                }
                Err(err) if err.is_transient() => {
                    log::warn!("Giving up on '{query}' for this run: {err}");
                    return CacheEntry::Unavailable;
                }
                Err(err) => {
                    log::warn!("Giving up on '{query}': {err}");
                    return CacheEntry::Miss;
                }
            }
        }
        CacheEntry::Unavailable
    }
}
