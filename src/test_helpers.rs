//! Shared test doubles.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::store::KeyValueStore;
use crate::{Error, Result};

/// In-memory stand-in for the authority's store. Records published messages
/// and counts fetches so tests can assert re-fetch behavior; can be flipped
/// into a failing state to exercise the degradation paths.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, String>,
    published: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: String, value: String) {
        self.records.insert(key, value);
    }

    pub fn remove(&self, key: &str) {
        self.records.remove(key);
    }

    /// Make every store operation fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }

    /// Total number of `get` calls observed.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Messages published so far, as `(channel, payload)` pairs.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::Internal("simulated store failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        Ok(self.records.get(key).map(|v| v.value().clone()))
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check_failure()?;
        // Trailing-* globs are the only pattern shape this crate uses.
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        Ok(self
            .records
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        self.check_failure()?;
        if let Ok(mut published) = self.published.lock() {
            published.push((channel.to_string(), payload.to_string()));
        }
        Ok(())
    }
}
