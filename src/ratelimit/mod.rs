//! Rate-limiting primitives: sliding-window counters and penalty boxes.
//!
//! Both structures back a named declaration and persist for the process
//! lifetime of that declaration — the only engine-owned state that outlives
//! a single evaluation. Queries align to 10-second buckets; increments are
//! deliberately back-dated by the window so they land in the current bucket
//! of the very next query. Entries are never evicted: per-client growth is
//! unbounded, a known scaling limit that must not be "fixed" by changing the
//! bucket arithmetic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::decl::{PenaltyboxDecl, RatecounterDecl};

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Debug, Clone, Copy)]
struct RateEntry {
    count: i64,
    /// Unix seconds, already back-dated by the increment's window.
    timestamp: i64,
}

/// A named `ratecounter`: per-client append-only access entries plus one
/// counter-wide accessibility gate. Until the first increment every query
/// answers zero, no matter the client.
#[derive(Debug)]
pub struct Ratecounter {
    pub decl: Arc<RatecounterDecl>,
    clients: Mutex<HashMap<String, Vec<RateEntry>>>,
    accessible: AtomicBool,
}

impl Ratecounter {
    pub fn new(decl: Arc<RatecounterDecl>) -> Self {
        Self {
            decl,
            clients: Mutex::new(HashMap::new()),
            accessible: AtomicBool::new(false),
        }
    }

    /// Record `delta` accesses for a client. The entry is stamped at
    /// `now - window` so the sliding-window sums below count it in the
    /// current bucket immediately.
    pub fn increment(&self, client: &str, delta: i64, window: Duration) {
        self.increment_at(now_unix_secs(), client, delta, window);
    }

    fn increment_at(&self, now: i64, client: &str, delta: i64, window: Duration) {
        let mut clients = self.clients.lock().expect("ratecounter lock");
        clients.entry(client.to_string()).or_default().push(RateEntry {
            count: delta,
            timestamp: now - window.as_secs() as i64,
        });
        self.accessible.store(true, Ordering::SeqCst);
    }

    /// Access count for the window, e.g. `ratecounter.{NAME}.bucket.10s`.
    pub fn bucket(&self, client: &str, window: Duration) -> i64 {
        self.bucket_at(now_unix_secs(), client, window)
    }

    fn bucket_at(&self, now: i64, client: &str, window: Duration) -> i64 {
        if !self.accessible.load(Ordering::SeqCst) {
            return 0;
        }
        let window_secs = window.as_secs() as i64;
        let to = now - now.rem_euclid(10);
        let clients = self.clients.lock().expect("ratecounter lock");
        let Some(entries) = clients.get(client) else {
            return 0;
        };
        entries
            .iter()
            .filter(|e| e.timestamp >= to - window_secs && e.timestamp < to + 10)
            .map(|e| e.count)
            .sum()
    }

    /// Access rate for the window, e.g. `ratecounter.{NAME}.rate.1s`. Only
    /// completed windows count, so a fresh increment reads as rate zero
    /// while already showing up in `bucket`.
    pub fn rate(&self, client: &str, window: Duration) -> f64 {
        self.rate_at(now_unix_secs(), client, window)
    }

    fn rate_at(&self, now: i64, client: &str, window: Duration) -> f64 {
        if !self.accessible.load(Ordering::SeqCst) {
            return 0.0;
        }
        let window_secs = window.as_secs() as i64;
        let to = now - now.rem_euclid(10) + 1;
        let clients = self.clients.lock().expect("ratecounter lock");
        let Some(entries) = clients.get(client) else {
            return 0.0;
        };
        let total: i64 = entries
            .iter()
            .filter(|e| e.timestamp >= to - window_secs && e.timestamp < to)
            .map(|e| e.count)
            .sum();
        if total == 0 {
            return 0.0;
        }
        (total as f64 / window_secs as f64).floor()
    }
}

/// A named `penaltybox`: client identity mapped to an absolute expiry.
/// Expired entries clean themselves up on the next `has` — there is no
/// background sweep.
#[derive(Debug)]
pub struct Penaltybox {
    pub decl: Arc<PenaltyboxDecl>,
    clients: Mutex<HashMap<String, i64>>,
}

impl Penaltybox {
    pub fn new(decl: Arc<PenaltyboxDecl>) -> Self {
        Self {
            decl,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Put a client in the box for `ttl`, overwriting any earlier expiry.
    pub fn add(&self, client: &str, ttl: Duration) {
        self.add_at(now_unix_millis(), client, ttl);
    }

    fn add_at(&self, now: i64, client: &str, ttl: Duration) {
        let expiry = now + ttl.as_millis() as i64;
        self.clients
            .lock()
            .expect("penaltybox lock")
            .insert(client.to_string(), expiry);
    }

    /// Whether the client is currently boxed.
    pub fn has(&self, client: &str) -> bool {
        self.has_at(now_unix_millis(), client)
    }

    fn has_at(&self, now: i64, client: &str) -> bool {
        let mut clients = self.clients.lock().expect("penaltybox lock");
        match clients.get(client) {
            None => false,
            Some(&expiry) if expiry <= now => {
                clients.remove(client);
                false
            }
            Some(_) => true,
        }
    }
}
