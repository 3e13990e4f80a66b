//! Store key and channel name construction.
//!
//! All keys and channel names go through this builder so a deployment can
//! isolate environments with a key prefix (e.g. "radium:") without touching
//! call sites. The default prefix is empty, matching the authority's wire
//! layout as published.

use uuid::Uuid;

use crate::config::Config;

/// Builds every store key and pub/sub channel name used by this crate.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.redis.key_prefix.clone())
    }

    // ==================== Entity records ====================

    /// Profile record.
    ///
    /// Type: String (JSON)
    /// Fields: uuid, username, ranks, permissions, lastSeen
    #[must_use]
    pub fn profile(&self, id: Uuid) -> String {
        format!("{}profile:{}", self.prefix, id)
    }

    /// Rank record, keyed case-insensitively.
    ///
    /// Type: String (JSON)
    /// Fields: name, prefix, weight, color, permissions, inherits
    #[must_use]
    pub fn rank(&self, name: &str) -> String {
        format!("{}rank:{}", self.prefix, name.to_lowercase())
    }

    /// Pattern enumerating every rank record, for the startup preload scan.
    #[must_use]
    pub fn rank_pattern(&self) -> String {
        format!("{}rank:*", self.prefix)
    }

    /// Rank name component of a scanned rank key, if it is one.
    #[must_use]
    pub fn rank_name_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.prefix)?.strip_prefix("rank:")
    }

    // ==================== Broadcast channels ====================

    /// Profile invalidation channel. Payload: player id string.
    #[must_use]
    pub fn profile_updated_channel(&self) -> String {
        format!("{}profile:updated", self.prefix)
    }

    /// Rank invalidation channel. Payload: rank name string.
    #[must_use]
    pub fn rank_updated_channel(&self) -> String {
        format!("{}rank:updated", self.prefix)
    }

    /// Command execution channel. Payload: JSON `{player, command, requestId}`.
    #[must_use]
    pub fn command_execute_channel(&self) -> String {
        format!("{}command:execute", self.prefix)
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("")
    }
}
