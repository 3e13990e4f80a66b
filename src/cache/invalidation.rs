//! Invalidation listener: evicts cache entries ahead of TTL expiry when the
//! authority broadcasts an update.
//!
//! Two channels are consumed. `profile:updated` carries a player id and
//! evicts that one profile. `rank:updated` carries a rank name and evicts
//! that rank *plus* the entire profile cache: any profile's resolved
//! highest-rank or permission state may depend on any rank definition, and
//! there is no reverse index from ranks to the profiles holding them. Ranks
//! change rarely, so the flush-then-refetch burst is the cheap side of that
//! trade.

use futures::StreamExt;
use redis::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::KeyBuilder;
use crate::resolver::Resolver;
use crate::{Error, Result};

/// Long-lived subscription over the authority's broadcast channels.
pub struct InvalidationListener {
    redis_client: Client,
    resolver: Arc<Resolver>,
    keys: KeyBuilder,
    shutdown: Arc<AtomicBool>,
}

impl InvalidationListener {
    pub fn new(redis_client: Client, resolver: Arc<Resolver>, keys: KeyBuilder) -> Self {
        Self {
            redis_client,
            resolver,
            keys,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the background subscriber task.
    ///
    /// Subscription failures are never fatal: the task logs, sleeps, and
    /// reconnects, while the caches keep serving under TTL discipline in
    /// the interim (more re-fetching, never stale-forever).
    pub fn start(&self) {
        let client = self.redis_client.clone();
        let resolver = self.resolver.clone();
        let keys = self.keys.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    debug!("Invalidation listener shutting down");
                    break;
                }

                match Self::run_subscriber(&client, &resolver, &keys, &shutdown).await {
                    Ok(()) => break,
                    Err(e) => {
                        error!(
                            error = %e,
                            "Invalidation subscriber error, reconnecting in 5 seconds..."
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
            info!("Invalidation listener stopped");
        });
    }

    /// Signal the subscriber task to stop after its current poll.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn run_subscriber(
        client: &Client,
        resolver: &Resolver,
        keys: &KeyBuilder,
        shutdown: &AtomicBool,
    ) -> Result<()> {
        let mut pubsub = client.get_async_pubsub().await?;

        let profile_channel = keys.profile_updated_channel();
        let rank_channel = keys.rank_updated_channel();
        pubsub.subscribe(&profile_channel).await?;
        pubsub.subscribe(&rank_channel).await?;

        info!(
            profile_channel = %profile_channel,
            rank_channel = %rank_channel,
            "Subscribed to invalidation channels"
        );

        let mut message_stream = pubsub.on_message();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Poll with a timeout so the shutdown flag is observed even on
            // a quiet channel.
            match tokio::time::timeout(std::time::Duration::from_secs(1), message_stream.next())
                .await
            {
                Ok(Some(msg)) => {
                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            warn!(error = %e, "Invalid payload in invalidation message");
                            continue;
                        }
                    };
                    // Eviction for this message completes before the next
                    // message is taken off the stream.
                    apply(resolver, keys, msg.get_channel_name(), &payload);
                }
                Ok(None) => {
                    return Err(Error::Internal(
                        "invalidation pub/sub stream ended".to_string(),
                    ));
                }
                Err(_) => continue,
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for InvalidationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationListener")
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Dispatch one invalidation notification onto the caches.
pub(crate) fn apply(resolver: &Resolver, keys: &KeyBuilder, channel: &str, payload: &str) {
    if channel == keys.profile_updated_channel() {
        match payload.parse::<Uuid>() {
            Ok(id) => {
                debug!(player_id = %id, "Profile update notification");
                resolver.clear_profile(id);
            }
            Err(e) => {
                warn!(payload = %payload, error = %e, "Unparseable profile update payload");
            }
        }
    } else if channel == keys.rank_updated_channel() {
        debug!(rank = %payload, "Rank update notification");
        resolver.clear_rank(payload);
        resolver.clear_all_profiles();
    } else {
        debug!(channel = %channel, "Ignoring message on unexpected channel");
    }
}
