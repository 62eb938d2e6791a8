use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;

/// In-memory memo of `(value, stored_at)` per key.
///
/// Slots are replaced whole under the lock, and the lock is never held while
/// the producer runs, so concurrent callers for one key may both fetch but
/// never observe a torn entry.
#[derive(Debug)]
pub struct TtlCache<V> {
    slots: Mutex<HashMap<String, (V, Instant)>>,
    enabled: bool,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            enabled: true,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            enabled: false,
        }
    }

    /// Fresh value for `key`, if one was stored less than `ttl` ago.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots
            .get(key)
            .filter(|(_, stored_at)| stored_at.elapsed() < ttl)
            .map(|(value, _)| value.clone())
    }

    pub fn insert(&self, key: &str, value: V) {
        if !self.enabled {
            return;
        }
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.insert(key.to_string(), (value, Instant::now()));
    }

    /// Return the cached value or run `producer` and store its success.
    /// Errors are passed through and never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key, ttl) {
            debug!("cache hit for {}", key);
            return Ok(hit);
        }
        let value = producer().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
