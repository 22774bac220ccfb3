use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use std::time::{Duration, Instant};

/// A batching, deduplicating lookup queue for reference and asset
/// rendering.
///
/// The form and flow editors request items by id as they render; this
/// queue coalesces requests within a short window into one batch, keeps
/// a cache of fulfilled items, and never requests the same id twice
/// while a lookup is in flight. The actual transport lives outside the
/// engine: the embedder drains due batches and feeds results back.
#[derive(Debug)]
pub struct ResolverQueue {
    window: Duration,
    cache: AHashMap<String, Value>,
    in_flight: AHashSet<String>,
    pending: Vec<String>,
    window_started: Option<Instant>,
}

impl ResolverQueue {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            cache: AHashMap::new(),
            in_flight: AHashSet::new(),
            pending: Vec::new(),
            window_started: None,
        }
    }

    /// Queues lookups for any ids not already cached, pending or in
    /// flight. The coalescing window starts at the first queued id.
    pub fn request<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>, now: Instant) {
        for id in ids {
            if self.cache.contains_key(id)
                || self.in_flight.contains(id)
                || self.pending.iter().any(|p| p == id)
            {
                continue;
            }
            self.pending.push(id.to_string());
            self.window_started.get_or_insert(now);
        }
    }

    /// The pending batch, once the coalescing window has elapsed. Ids
    /// move to the in-flight set until fulfilled.
    pub fn take_batch(&mut self, now: Instant) -> Option<Vec<String>> {
        let started = self.window_started?;
        if now.duration_since(started) < self.window {
            return None;
        }
        self.window_started = None;
        let batch: Vec<String> = std::mem::take(&mut self.pending);
        self.in_flight.extend(batch.iter().cloned());
        Some(batch)
    }

    /// Feeds looked-up items back. Unknown ids resolve to nothing and
    /// simply leave the in-flight set.
    pub fn fulfill(&mut self, items: impl IntoIterator<Item = (String, Value)>) {
        for (id, item) in items {
            self.in_flight.remove(&id);
            self.cache.insert(id, item);
        }
    }

    /// Marks ids as failed so a later request may retry them.
    pub fn fail<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.in_flight.remove(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.cache.get(id)
    }
}
