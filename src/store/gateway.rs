//! Read-through fetch layer between the caches and the external store.
//!
//! Every fetch is total from the caller's perspective: store misses,
//! malformed records, backend errors, and timeouts all log and degrade to
//! the type's least-privileged fallback value. Game-facing callers are
//! never blocked on a transient backend failure.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{KeyBuilder, TtlCache};
use crate::models::{Profile, Rank};
use crate::store::KeyValueStore;
use crate::{Error, Result};

pub struct StoreGateway {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
    fetch_timeout: Duration,
}

impl StoreGateway {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder, fetch_timeout: Duration) -> Self {
        Self {
            store,
            keys,
            fetch_timeout,
        }
    }

    /// Fetch and decode the profile record for `id`.
    ///
    /// Absent, malformed, or unreachable records all resolve to
    /// `Profile::fallback(id)`.
    pub async fn fetch_profile(&self, id: Uuid) -> Profile {
        let key = self.keys.profile(id);

        match self.fetch_raw(&key).await {
            Ok(Some(raw)) => match Profile::decode(&raw) {
                Ok(profile) => {
                    debug!(player_id = %id, "Fetched profile from store");
                    profile
                }
                Err(e) => {
                    warn!(player_id = %id, error = %e, "Malformed profile record, using fallback");
                    Profile::fallback(id)
                }
            },
            Ok(None) => {
                debug!(player_id = %id, "No profile record in store, using fallback");
                Profile::fallback(id)
            }
            Err(e) => {
                warn!(player_id = %id, error = %e, "Profile fetch failed, using fallback");
                Profile::fallback(id)
            }
        }
    }

    /// Fetch and decode the rank record for `name` (case-insensitive).
    ///
    /// Unknown or unreadable ranks resolve to `Rank::fallback()`.
    pub async fn fetch_rank(&self, name: &str) -> Rank {
        let key = self.keys.rank(name);

        match self.fetch_raw(&key).await {
            Ok(Some(raw)) => match Rank::decode(&raw) {
                Ok(rank) => {
                    debug!(rank = %name, "Fetched rank from store");
                    rank
                }
                Err(e) => {
                    warn!(rank = %name, error = %e, "Malformed rank record, using fallback");
                    Rank::fallback()
                }
            },
            Ok(None) => {
                debug!(rank = %name, "No rank record in store, using fallback");
                Rank::fallback()
            }
            Err(e) => {
                warn!(rank = %name, error = %e, "Rank fetch failed, using fallback");
                Rank::fallback()
            }
        }
    }

    /// Scan the store's rank key space and populate `cache` in one pass.
    ///
    /// Called once at startup. A failed scan logs and returns 0; individual
    /// unreadable records are skipped. Either way the system keeps running,
    /// resolving not-yet-loaded ranks through the normal read-through path.
    pub async fn preload_ranks(&self, cache: &TtlCache<String, Rank>) -> usize {
        let pattern = self.keys.rank_pattern();

        let rank_keys = match timeout(self.fetch_timeout, self.store.scan_keys(&pattern)).await {
            Ok(Ok(keys)) => keys,
            Ok(Err(e)) => {
                error!(error = %e, "Rank preload scan failed, continuing without preloaded ranks");
                return 0;
            }
            Err(_) => {
                error!("Rank preload scan timed out, continuing without preloaded ranks");
                return 0;
            }
        };

        let mut loaded = 0;
        for key in rank_keys {
            let Some(name) = self.keys.rank_name_from_key(&key) else {
                continue;
            };
            let name = name.to_lowercase();

            match self.fetch_raw(&key).await {
                Ok(Some(raw)) => match Rank::decode(&raw) {
                    Ok(rank) => {
                        cache.put(name, rank);
                        loaded += 1;
                    }
                    Err(e) => {
                        warn!(rank = %name, error = %e, "Skipping malformed rank record during preload");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    warn!(rank = %name, error = %e, "Skipping unreadable rank during preload");
                }
            }
        }

        info!(count = loaded, "Preloaded ranks from store");
        loaded
    }

    async fn fetch_raw(&self, key: &str) -> Result<Option<String>> {
        timeout(self.fetch_timeout, self.store.get(key))
            .await
            .map_err(|_| Error::Timeout(format!("fetch of {key} timed out")))?
    }
}

impl std::fmt::Debug for StoreGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreGateway")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
