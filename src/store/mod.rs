//! Collaborator seam for the authority's shared key/value store and
//! pub/sub bus.

pub mod gateway;
pub mod redis_store;

pub use gateway::StoreGateway;
pub use redis_store::RedisStore;

use async_trait::async_trait;

use crate::Result;

/// Read-only key/value access plus fire-and-forget publish.
///
/// The authority owns the data; this crate never writes records back. The
/// trait exists so the gateway and forwarder can be exercised against an
/// in-memory store in tests.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw record stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Enumerate every key matching `pattern` (glob syntax).
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Publish `payload` on a broadcast channel. Delivery is best-effort;
    /// success means the broker accepted the message, nothing more.
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;
}
