//! Composition root: wires the store, caches, resolver, forwarder, and
//! invalidation listener together with an explicit lifecycle.

use std::sync::Arc;
use tracing::info;

use crate::cache::{InvalidationListener, KeyBuilder};
use crate::config::Config;
use crate::forwarder::CommandForwarder;
use crate::resolver::Resolver;
use crate::store::{RedisStore, StoreGateway};
use crate::Result;

/// Handle to the authority-delegation cache.
///
/// Constructed once at startup and shared by reference with every caller;
/// there is no global instance. `connect` is the only fallible step —
/// after that, every query degrades to safe defaults instead of erroring.
pub struct RadiumClient {
    resolver: Arc<Resolver>,
    forwarder: CommandForwarder,
    listener: InvalidationListener,
}

impl RadiumClient {
    /// Open the store connection and build all components.
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = Arc::new(RedisStore::connect(&config.redis).await?);
        info!(url = %config.redis.url, "Connected to authority store");

        let keys = KeyBuilder::from_config(config);
        let gateway = StoreGateway::new(store.clone(), keys.clone(), config.operation_timeout());
        let resolver = Arc::new(Resolver::new(gateway, &config.cache, &config.auth));
        let forwarder = CommandForwarder::new(store, keys.clone());

        // Pub/sub needs its own connection; the listener owns it.
        let pubsub_client = redis::Client::open(config.redis.url.as_str())?;
        let listener = InvalidationListener::new(pubsub_client, resolver.clone(), keys);

        Ok(Self {
            resolver,
            forwarder,
            listener,
        })
    }

    /// Preload the rank cache and start the invalidation listener.
    ///
    /// Neither step can fail startup: an unreachable store leaves the rank
    /// cache empty (read-through fills it later) and the listener keeps
    /// retrying its subscription in the background.
    pub async fn init(&self) {
        let loaded = self.resolver.preload_ranks().await;
        info!(ranks = loaded, "Rank preload complete");

        self.listener.start();
        info!("Invalidation listener started");
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    #[must_use]
    pub fn forwarder(&self) -> &CommandForwarder {
        &self.forwarder
    }

    /// Stop the invalidation listener and drop all cached state.
    pub fn shutdown(&self) {
        self.listener.stop();
        self.resolver.clear_all();
        info!("Radium client shut down");
    }
}

impl std::fmt::Debug for RadiumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadiumClient")
            .field("cache_stats", &self.resolver.cache_stats())
            .finish_non_exhaustive()
    }
}
