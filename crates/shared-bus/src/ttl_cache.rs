//! # Expiring Map
//!
//! A concurrent map whose entries carry their own time-to-live.
//!
//! ## Design
//!
//! - Reads check the deadline, so an expired entry is never observed even if
//!   the sweeper has not run yet.
//! - Memory is reclaimed by [`ExpiringMap::purge_expired`], usually driven by
//!   a background [`Sweeper`] task.
//! - The sweeper holds only a weak reference: dropping the map ends it, and
//!   dropping the [`Sweeper`] handle aborts it.
//!
//! Used for per-connection message de-duplication and for rate-limit buckets.

use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::trace;

struct Entry<V> {
    value: V,
    ttl: Duration,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            ttl,
            expires_at: now + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    fn touch(&mut self, now: Instant) {
        self.expires_at = now + self.ttl;
    }
}

/// Map with per-entry expiry. Cloning shares the underlying storage.
pub struct ExpiringMap<K, V> {
    entries: Arc<Mutex<HashMap<K, Entry<V>>>>,
}

impl<K, V> Clone for ExpiringMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for ExpiringMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, expiring `ttl` from now.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        self.entries.lock().insert(key, Entry::new(value, ttl, now));
    }

    /// Insert only if no live entry exists.
    ///
    /// Returns `true` when the value was inserted. An existing live entry keeps
    /// its original deadline.
    pub fn insert_if_absent(&self, key: K, value: V, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if entry.is_live(now) => false,
            _ => {
                entries.insert(key, Entry::new(value, ttl, now));
                true
            }
        }
    }

    /// Whether a live entry exists. Does not extend its deadline.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Remove `key`, returning its value if it was still live.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        self.entries
            .lock()
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries, Instant::now())
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the map stores no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Get a live value and push its deadline out by its TTL.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        if !entry.is_live(now) {
            return None;
        }
        entry.touch(now);
        Some(entry.value.clone())
    }

    /// Get the live value for `key` (extending its deadline) or insert the one
    /// produced by `make`. Lookup and insert happen under one lock, so
    /// concurrent callers for the same key observe the same value.
    pub fn get_or_insert_with<F>(&self, key: K, ttl: Duration, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&key) {
            if entry.is_live(now) {
                entry.touch(now);
                return entry.value.clone();
            }
        }
        let value = make();
        entries.insert(key, Entry::new(value.clone(), ttl, now));
        value
    }
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    /// Start a background task purging expired entries every `interval`.
    ///
    /// Must be called from within a Tokio runtime. The task stops when the
    /// returned [`Sweeper`] is stopped or dropped, or when every clone of the
    /// map is gone.
    pub fn spawn_sweeper(&self, interval: Duration) -> Sweeper {
        let entries: Weak<Mutex<HashMap<K, Entry<V>>>> = Arc::downgrade(&self.entries);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let removed = purge(&entries, Instant::now());
                if removed > 0 {
                    trace!(removed, "Swept expired entries");
                }
            }
        });
        Sweeper {
            handle: Some(handle),
        }
    }
}

/// Remove entries that are no longer live at `now`. Returns how many went.
fn purge<K: Eq + Hash, V>(entries: &Mutex<HashMap<K, Entry<V>>>, now: Instant) -> usize {
    let mut entries = entries.lock();
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now));
    before - entries.len()
}

/// Handle to a running sweep task. Aborts the task when stopped or dropped.
#[derive(Debug)]
pub struct Sweeper {
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Stop the sweep task. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the sweep task is still scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
