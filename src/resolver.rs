//! Rank and permission resolution over the cached entity state.
//!
//! The resolver is the crate's main query surface. Every public query is
//! total: failures underneath degrade to fallback values, so callers in the
//! game loop never see an error from here.

use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::{AuthConfig, CacheConfig};
use crate::models::{Profile, Rank, DEFAULT_RANK_NAME};
use crate::store::StoreGateway;

/// Entry counts for both caches, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub profiles: usize,
    pub ranks: usize,
}

pub struct Resolver {
    gateway: StoreGateway,
    profiles: TtlCache<Uuid, Profile>,
    ranks: TtlCache<String, Rank>,
    super_admins: Vec<String>,
}

impl Resolver {
    pub fn new(gateway: StoreGateway, cache: &CacheConfig, auth: &AuthConfig) -> Self {
        Self {
            gateway,
            profiles: TtlCache::new(cache.profile_ttl()),
            ranks: TtlCache::new(cache.rank_ttl()),
            super_admins: auth.super_admins.clone(),
        }
    }

    /// Resolve a player's profile: cached copy if fresh, otherwise a store
    /// fetch (falling back to the default profile) which is then cached.
    pub async fn get_profile(&self, id: Uuid) -> Profile {
        if let Some(profile) = self.profiles.get(&id) {
            debug!(player_id = %id, "Profile cache hit");
            return profile;
        }

        let profile = self.gateway.fetch_profile(id).await;
        self.profiles.put(id, profile.clone());
        profile
    }

    /// Resolve a rank definition by name, case-insensitively.
    pub async fn get_rank(&self, name: &str) -> Rank {
        let key = name.to_lowercase();

        if let Some(rank) = self.ranks.get(&key) {
            debug!(rank = %name, "Rank cache hit");
            return rank;
        }

        let rank = self.gateway.fetch_rank(&key).await;
        self.ranks.put(key, rank.clone());
        rank
    }

    /// The most senior rank a profile holds.
    ///
    /// Ties on weight go to the first-listed rank: the strict `>` below
    /// never lets a later rank displace an earlier one of equal weight, so
    /// repeated calls with unchanged input pick the same rank.
    pub async fn get_highest_rank(&self, profile: &Profile) -> Rank {
        if profile.ranks.is_empty() {
            return self.get_rank(DEFAULT_RANK_NAME).await;
        }

        let mut highest: Option<Rank> = None;
        for name in &profile.ranks {
            let rank = self.get_rank(name).await;
            if highest.as_ref().is_none_or(|h| rank.weight > h.weight) {
                highest = Some(rank);
            }
        }

        match highest {
            Some(rank) => rank,
            None => self.get_rank(DEFAULT_RANK_NAME).await,
        }
    }

    /// Whether the player holds `permission`, from any source:
    /// super-admin allow-list, direct profile grant, or any held rank
    /// (including inherited ranks). Never errors; unknown players resolve
    /// through the fallback profile and get `false` unless "Member" grants.
    pub async fn has_permission(&self, id: Uuid, permission: &str) -> bool {
        let profile = self.get_profile(id).await;

        if self.is_super_admin(&profile.username) {
            debug!(player_id = %id, "Super-admin bypass");
            return true;
        }

        // An explicit false entry is not a veto; the authority only writes
        // positive grants here, so resolution falls through to ranks.
        if profile.has_direct_permission(permission) {
            return true;
        }

        for rank_name in &profile.ranks {
            let rank = self.get_rank(rank_name).await;
            if self.rank_grants(&rank, permission).await {
                return true;
            }
        }

        false
    }

    /// Whether `rank` grants `permission`, walking the `inherits` graph
    /// transitively. The visited set is keyed on lowercased names so cyclic
    /// graphs terminate.
    pub async fn rank_grants(&self, rank: &Rank, permission: &str) -> bool {
        if rank.has_permission(permission) {
            return true;
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(rank.name.to_lowercase());
        let mut pending: Vec<String> = rank.inherits.iter().map(|p| p.to_lowercase()).collect();

        while let Some(parent_name) = pending.pop() {
            if !visited.insert(parent_name.clone()) {
                continue;
            }

            let parent = self.get_rank(&parent_name).await;
            if parent.has_permission(permission) {
                return true;
            }
            pending.extend(parent.inherits.iter().map(|p| p.to_lowercase()));
        }

        false
    }

    /// Bulk-load every rank definition from the store into the rank cache.
    /// Called once at startup; failures are logged inside the gateway and
    /// leave the resolver in miss-always mode for unloaded ranks.
    pub async fn preload_ranks(&self) -> usize {
        self.gateway.preload_ranks(&self.ranks).await
    }

    fn is_super_admin(&self, username: &str) -> bool {
        self.super_admins
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(username))
    }

    // ==================== Eviction (invalidation listener) ====================

    /// Evict one player's cached profile.
    pub fn clear_profile(&self, id: Uuid) {
        if self.profiles.evict(&id) {
            debug!(player_id = %id, "Evicted cached profile");
        }
    }

    /// Evict one cached rank definition.
    pub fn clear_rank(&self, name: &str) {
        if self.ranks.evict(&name.to_lowercase()) {
            debug!(rank = %name, "Evicted cached rank");
        }
    }

    /// Flush every cached profile. Used when a rank definition changes:
    /// any profile's resolved state may depend on any rank, and there is no
    /// reverse index from ranks to the profiles holding them.
    pub fn clear_all_profiles(&self) {
        let count = self.profiles.len();
        self.profiles.clear();
        debug!(count, "Flushed profile cache after rank change");
    }

    /// Drop everything from both caches.
    pub fn clear_all(&self) {
        self.profiles.clear();
        self.ranks.clear();
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            profiles: self.profiles.len(),
            ranks: self.ranks.len(),
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("profiles_cached", &self.profiles.len())
            .field("ranks_cached", &self.ranks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyBuilder;
    use crate::test_helpers::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn resolver(store: Arc<MemoryStore>) -> Resolver {
        resolver_with_auth(store, AuthConfig::default())
    }

    fn resolver_with_auth(store: Arc<MemoryStore>, auth: AuthConfig) -> Resolver {
        let gateway = StoreGateway::new(store, KeyBuilder::default(), Duration::from_secs(1));
        Resolver::new(gateway, &CacheConfig::default(), &auth)
    }

    fn put_profile(store: &MemoryStore, id: Uuid, username: &str, ranks: &[&str], perms: &[&str]) {
        let ranks: Vec<String> = ranks.iter().map(|r| format!("\"{r}|console|0|0\"")).collect();
        let perms: Vec<String> = perms.iter().map(|p| format!("\"{p}|console|0|0\"")).collect();
        store.insert(
            format!("profile:{id}"),
            format!(
                r#"{{"uuid": "{id}", "username": "{username}", "ranks": [{}], "permissions": [{}]}}"#,
                ranks.join(","),
                perms.join(","),
            ),
        );
    }

    fn put_rank(store: &MemoryStore, name: &str, weight: i32, perms: &[&str], inherits: &[&str]) {
        let perms: Vec<String> = perms.iter().map(|p| format!("\"{p}\"")).collect();
        let inherits: Vec<String> = inherits.iter().map(|p| format!("\"{p}\"")).collect();
        store.insert(
            format!("rank:{}", name.to_lowercase()),
            format!(
                r#"{{"name": "{name}", "weight": {weight}, "permissions": [{}], "inherits": [{}]}}"#,
                perms.join(","),
                inherits.join(","),
            ),
        );
    }

    #[tokio::test]
    async fn test_profile_read_through_caches() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["VIP"], &[]);

        let resolver = resolver(store.clone());
        let first = resolver.get_profile(id).await;
        let fetches = store.fetch_count();
        let second = resolver.get_profile(id).await;

        assert_eq!(first, second);
        assert_eq!(store.fetch_count(), fetches, "second read must be served from cache");
    }

    #[tokio::test]
    async fn test_owner_wildcard_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["Owner"], &[]);
        put_rank(&store, "Owner", 1000, &["*"], &[]);

        let resolver = resolver(store);
        assert!(resolver.has_permission(id, "anything.at.all").await);
    }

    #[tokio::test]
    async fn test_direct_grant() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &[], &["mythic.fly"]);

        let resolver = resolver(store);
        assert!(resolver.has_permission(id, "mythic.fly").await);
        assert!(!resolver.has_permission(id, "mythic.build").await);
    }

    #[tokio::test]
    async fn test_rank_wildcard_grant() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["Mod"], &[]);
        put_rank(&store, "Mod", 500, &["mythic.*"], &[]);

        let resolver = resolver(store);
        assert!(resolver.has_permission(id, "mythic.staff").await);
        assert!(!resolver.has_permission(id, "other.mythic").await);
    }

    #[tokio::test]
    async fn test_unknown_player_fails_safe() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let id = Uuid::new_v4();

        let resolver = resolver(store);
        let profile = resolver.get_profile(id).await;

        assert_eq!(profile.ranks, vec![DEFAULT_RANK_NAME]);
        assert!(profile.permissions.is_empty());
        assert!(!resolver.has_permission(id, "mythic.staff").await);
    }

    #[tokio::test]
    async fn test_super_admin_allow_list() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "RootAdmin", &[], &[]);

        let resolver = resolver_with_auth(
            store,
            AuthConfig {
                super_admins: vec!["rootadmin".to_string()],
            },
        );
        assert!(resolver.has_permission(id, "anything.at.all").await);
    }

    #[tokio::test]
    async fn test_no_super_admin_by_default() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "RootAdmin", &[], &[]);

        let resolver = resolver(store);
        assert!(!resolver.has_permission(id, "anything.at.all").await);
    }

    #[tokio::test]
    async fn test_highest_rank_by_weight() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["VIP", "Owner", "Mod"], &[]);
        put_rank(&store, "VIP", 100, &[], &[]);
        put_rank(&store, "Owner", 1000, &[], &[]);
        put_rank(&store, "Mod", 500, &[], &[]);

        let resolver = resolver(store);
        let profile = resolver.get_profile(id).await;
        assert_eq!(resolver.get_highest_rank(&profile).await.name, "Owner");
    }

    #[tokio::test]
    async fn test_highest_rank_tie_goes_to_first_listed() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["A", "B"], &[]);
        put_rank(&store, "A", 500, &[], &[]);
        put_rank(&store, "B", 500, &[], &[]);

        let resolver = resolver(store);
        let profile = resolver.get_profile(id).await;
        for _ in 0..5 {
            assert_eq!(resolver.get_highest_rank(&profile).await.name, "A");
        }
    }

    #[tokio::test]
    async fn test_highest_rank_of_unknown_ranks_is_fallback() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["Ghost"], &[]);

        let resolver = resolver(store);
        let profile = resolver.get_profile(id).await;
        let rank = resolver.get_highest_rank(&profile).await;

        assert_eq!(rank.name, DEFAULT_RANK_NAME);
        assert_eq!(rank.weight, 10);
    }

    #[tokio::test]
    async fn test_inherited_permission() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["Admin"], &[]);
        put_rank(&store, "Admin", 800, &["mythic.admin.*"], &["Mod"]);
        put_rank(&store, "Mod", 500, &["mythic.staff"], &["Helper"]);
        put_rank(&store, "Helper", 200, &["mythic.helper"], &[]);

        let resolver = resolver(store);
        assert!(resolver.has_permission(id, "mythic.admin.ban").await);
        assert!(resolver.has_permission(id, "mythic.staff").await);
        assert!(resolver.has_permission(id, "mythic.helper").await);
        assert!(!resolver.has_permission(id, "mythic.owner").await);
    }

    #[tokio::test]
    async fn test_cyclic_inheritance_terminates() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["A"], &[]);
        put_rank(&store, "A", 100, &[], &["B"]);
        put_rank(&store, "B", 100, &[], &["A"]);

        let resolver = resolver(store);
        assert!(!resolver.has_permission(id, "mythic.staff").await);
    }

    #[tokio::test]
    async fn test_eviction_forces_refetch() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["VIP"], &[]);

        let resolver = resolver(store.clone());
        resolver.get_profile(id).await;

        put_profile(&store, id, "Steve", &["Owner"], &[]);
        // Still served from cache until evicted.
        assert_eq!(resolver.get_profile(id).await.ranks, vec!["VIP"]);

        resolver.clear_profile(id);
        assert_eq!(resolver.get_profile(id).await.ranks, vec!["Owner"]);
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        put_profile(&store, id, "Steve", &["VIP"], &[]);
        put_rank(&store, "VIP", 100, &[], &[]);

        let resolver = resolver(store);
        resolver.get_profile(id).await;
        resolver.get_rank("VIP").await;

        assert_eq!(resolver.cache_stats(), CacheStats { profiles: 1, ranks: 1 });

        resolver.clear_all();
        assert_eq!(resolver.cache_stats(), CacheStats { profiles: 0, ranks: 0 });
    }
}
