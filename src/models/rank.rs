//! Rank definitions as published by the authority.

use serde::Deserialize;
use std::collections::HashSet;

use crate::{Error, Result};

use super::DEFAULT_RANK_NAME;

/// Named priority level with a weight, display attributes, and a permission
/// set. Keyed case-insensitively in the store (`rank:{name-lowercased}`).
#[derive(Debug, Clone, PartialEq)]
pub struct Rank {
    pub name: String,
    /// Display prefix, legacy color codes included.
    pub prefix: String,
    pub color: String,
    /// Higher weight = more senior.
    pub weight: i32,
    /// Permission strings. A trailing `*` marks a wildcard prefix match;
    /// the literal `*` matches every permission.
    pub permissions: HashSet<String>,
    /// Parent rank names; resolution walks these transitively.
    pub inherits: Vec<String>,
}

/// Raw store record at `rank:{name-lowercased}`.
#[derive(Debug, Deserialize)]
struct RankRecord {
    name: String,
    #[serde(default)]
    prefix: String,
    weight: i32,
    #[serde(default = "default_color")]
    color: String,
    #[serde(default)]
    permissions: HashSet<String>,
    #[serde(default)]
    inherits: Vec<String>,
}

fn default_color() -> String {
    "&f".to_string()
}

impl Rank {
    /// Built-in rank substituted when a rank name cannot be resolved:
    /// weight 10, no permissions, generic display.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            name: DEFAULT_RANK_NAME.to_string(),
            prefix: "&a[Member] ".to_string(),
            color: "&f".to_string(),
            weight: 10,
            permissions: HashSet::new(),
            inherits: Vec::new(),
        }
    }

    /// Decode a rank from its raw store record.
    pub fn decode(raw: &str) -> Result<Self> {
        let record: RankRecord = serde_json::from_str(raw).map_err(|e| Error::Deserialization {
            context: format!("rank record: {e}"),
        })?;

        Ok(Self {
            name: record.name,
            prefix: record.prefix,
            color: record.color,
            weight: record.weight,
            permissions: record.permissions,
            inherits: record.inherits,
        })
    }

    /// Whether this rank's own permission set covers `permission`.
    ///
    /// Matches the literal `*`, an exact entry, or any `*`-suffixed entry
    /// whose prefix `permission` starts with. Inherited ranks are not
    /// consulted here; the resolver walks `inherits`.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.permissions.contains("*") {
            return true;
        }

        if self.permissions.contains(permission) {
            return true;
        }

        self.permissions.iter().any(|p| {
            p.strip_suffix('*')
                .is_some_and(|prefix| permission.starts_with(prefix))
        })
    }
}
