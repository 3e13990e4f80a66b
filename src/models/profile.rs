//! Player profile as resolved from the authority's store.

use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{Error, Result};

use super::{now_millis, DEFAULT_RANK_NAME};

/// Cached per-player record of ranks, direct permission grants, and metadata.
///
/// Profiles are owned by the external authority; this crate only ever reads
/// them. The `username` may lag behind the authoritative value until the
/// next invalidation or TTL expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    /// Rank names in the authority's insertion order. Never empty: a player
    /// with no explicit ranks holds the implicit "Member" rank.
    pub ranks: Vec<String>,
    /// Explicit per-player grants, permission string -> granted.
    pub permissions: HashMap<String, bool>,
    /// Epoch millis, informational only.
    pub last_seen: i64,
}

/// Raw store record at `profile:{id}`.
///
/// `ranks` and `permissions` entries carry grant metadata on the wire as
/// `"name|granter|grantedAt|expiresAt"`; only the leading name component is
/// meaningful to this subsystem.
#[derive(Debug, Deserialize)]
struct ProfileRecord {
    #[serde(alias = "_id")]
    uuid: Uuid,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    ranks: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default, rename = "lastSeen")]
    last_seen: Option<i64>,
}

impl Profile {
    /// Least-privileged profile substituted when the store has no readable
    /// record for `id`: implicit "Member" rank, no direct grants.
    #[must_use]
    pub fn fallback(id: Uuid) -> Self {
        Self {
            id,
            username: "Unknown".to_string(),
            ranks: vec![DEFAULT_RANK_NAME.to_string()],
            permissions: HashMap::new(),
            last_seen: now_millis(),
        }
    }

    /// Decode a profile from its raw store record.
    ///
    /// Tolerates missing optional fields; fails only when the record is not
    /// valid JSON or carries no player id.
    pub fn decode(raw: &str) -> Result<Self> {
        let record: ProfileRecord =
            serde_json::from_str(raw).map_err(|e| Error::Deserialization {
                context: format!("profile record: {e}"),
            })?;

        let mut ranks = Vec::new();
        for entry in &record.ranks {
            let name = leading_component(entry);
            if !name.is_empty() && !ranks.iter().any(|r| r == name) {
                ranks.push(name.to_string());
            }
        }
        if ranks.is_empty() {
            ranks.push(DEFAULT_RANK_NAME.to_string());
        }

        let mut permissions = HashMap::new();
        for entry in &record.permissions {
            let perm = leading_component(entry);
            if !perm.is_empty() {
                permissions.insert(perm.to_string(), true);
            }
        }

        Ok(Self {
            id: record.uuid,
            username: record.username.unwrap_or_else(|| "Unknown".to_string()),
            ranks,
            permissions,
            last_seen: record.last_seen.unwrap_or_else(now_millis),
        })
    }

    /// Whether this profile carries an explicit grant for `permission`.
    /// Rank-derived permissions are the resolver's concern.
    #[must_use]
    pub fn has_direct_permission(&self, permission: &str) -> bool {
        self.permissions.get(permission).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn has_rank(&self, rank_name: &str) -> bool {
        self.ranks.iter().any(|r| r.eq_ignore_ascii_case(rank_name))
    }
}

/// Strip grant metadata from a wire-encoded field: `"VIP|console|0|0"` -> `"VIP"`.
fn leading_component(encoded: &str) -> &str {
    encoded.split('|').next().unwrap_or("")
}
