//! Memoized per-user resolution inputs.
//!
//! Entries are tagged with the versions that were current *before* the stores
//! were read. Any write bumps a version synchronously before it returns, so a
//! reader that computed from pre-write state stores a tag that is already
//! stale and the entry is never served.
//!
//! Role grant writes bump one global epoch: the cache does not know which
//! users hold a role, and a global bump cannot miss one. Override writes bump
//! the generation slot the affected user hashes to. Slots are fixed in number
//! and never reset, so users sharing a slot only cost each other extra misses.
//!
//! Role membership is not versioned here; the resolver compares the roles a
//! hit was computed for with the user's current roles.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use maintly_domain::{Role, UserId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::UserResolution;

/// Versions an entry was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionTag {
    role_epoch: u64,
    user_generation: u64,
}

impl VersionTag {
    /// Global role-grant epoch component.
    #[must_use]
    pub fn role_epoch(&self) -> u64 {
        self.role_epoch
    }

    /// Per-user generation component.
    #[must_use]
    pub fn user_generation(&self) -> u64 {
        self.user_generation
    }
}

#[derive(Debug, Clone)]
struct CachedResolution {
    resolution: Arc<UserResolution>,
    tag: VersionTag,
}

/// Cache of resolved permissions keyed by user.
#[derive(Debug)]
pub struct ResolutionCache {
    role_epoch: AtomicU64,
    user_generations: Box<[AtomicU64]>,
    entries: RwLock<HashMap<UserId, CachedResolution>>,
    max_entries: usize,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    /// Default entry limit.
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    /// Number of per-user generation slots.
    pub const GENERATION_SLOTS: usize = 4_096;

    /// Creates an empty cache with the default entry limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    /// Creates an empty cache holding at most `max_entries` users.
    #[must_use]
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            role_epoch: AtomicU64::new(0),
            user_generations: (0..Self::GENERATION_SLOTS)
                .map(|_| AtomicU64::new(0))
                .collect(),
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the versions a fresh computation for `user_id` must be tagged with.
    ///
    /// Read this before reading the stores.
    #[must_use]
    pub fn current_tag(&self, user_id: UserId) -> VersionTag {
        VersionTag {
            role_epoch: self.role_epoch.load(Ordering::SeqCst),
            user_generation: self.user_generation(user_id),
        }
    }

    /// Returns the cached resolution when it is still current.
    pub async fn get(&self, user_id: UserId) -> Option<Arc<UserResolution>> {
        let current = self.current_tag(user_id);
        let entries = self.entries.read().await;
        let entry = entries.get(&user_id)?;

        if entry.tag == current {
            debug!(user_id = %user_id, "resolution cache hit");
            Some(entry.resolution.clone())
        } else {
            debug!(user_id = %user_id, "resolution cache entry is stale");
            None
        }
    }

    /// Stores a resolution computed against `tag`.
    ///
    /// Entries computed against versions that have since advanced are dropped.
    pub async fn put(&self, user_id: UserId, resolution: Arc<UserResolution>, tag: VersionTag) {
        if tag != self.current_tag(user_id) {
            debug!(user_id = %user_id, "discarding resolution computed against stale versions");
            return;
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries && !entries.contains_key(&user_id) {
            self.evict(&mut entries);
        }
        entries.insert(user_id, CachedResolution { resolution, tag });
    }

    /// Invalidates the cached resolution of one user.
    pub fn invalidate(&self, user_id: UserId) {
        let generation = self
            .generation_slot(user_id)
            .fetch_add(1, Ordering::SeqCst)
            .wrapping_add(1);
        debug!(user_id = %user_id, generation, "invalidated user resolution");
    }

    /// Invalidates every user holding `role` by advancing the global epoch.
    pub fn invalidate_role(&self, role: Role) {
        let epoch = self.role_epoch.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        debug!(role = %role, epoch, "advanced role grant epoch");
    }

    /// Returns the number of stored entries, current or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn user_generation(&self, user_id: UserId) -> u64 {
        self.generation_slot(user_id).load(Ordering::SeqCst)
    }

    fn generation_slot(&self, user_id: UserId) -> &AtomicU64 {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        let index = hasher.finish() % self.user_generations.len() as u64;
        &self.user_generations[index as usize]
    }

    fn evict(&self, entries: &mut HashMap<UserId, CachedResolution>) {
        let epoch = self.role_epoch.load(Ordering::SeqCst);
        entries.retain(|_, entry| entry.tag.role_epoch == epoch);

        if entries.len() >= self.max_entries {
            let victim = entries.keys().next().copied();
            if let Some(victim) = victim {
                entries.remove(&victim);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use maintly_domain::{Role, UserId};

    use super::ResolutionCache;
    use crate::UserResolution;

    fn resolution(user_id: UserId) -> Arc<UserResolution> {
        Arc::new(UserResolution::empty(user_id))
    }

    #[tokio::test]
    async fn put_then_get_hits() {
        let cache = ResolutionCache::new();
        let user_id = UserId::new();
        let tag = cache.current_tag(user_id);

        cache.put(user_id, resolution(user_id), tag).await;

        assert!(cache.get(user_id).await.is_some());
    }

    #[tokio::test]
    async fn role_invalidation_makes_every_entry_stale() {
        let cache = ResolutionCache::new();
        let [alice, bob] = [UserId::new(), UserId::new()];
        for user_id in [alice, bob] {
            let tag = cache.current_tag(user_id);
            cache.put(user_id, resolution(user_id), tag).await;
        }

        cache.invalidate_role(Role::Contractor);

        assert!(cache.get(alice).await.is_none());
        assert!(cache.get(bob).await.is_none());
    }

    #[tokio::test]
    async fn user_invalidation_only_touches_that_user() {
        let cache = ResolutionCache::new();
        let [alice, bob] = [UserId::new(), UserId::new()];
        for user_id in [alice, bob] {
            let tag = cache.current_tag(user_id);
            cache.put(user_id, resolution(user_id), tag).await;
        }

        cache.invalidate(alice);

        assert!(cache.get(alice).await.is_none());
        assert!(cache.get(bob).await.is_some());
    }

    #[tokio::test]
    async fn put_with_tag_taken_before_a_write_is_discarded() {
        let cache = ResolutionCache::new();
        let user_id = UserId::new();
        let tag_before_write = cache.current_tag(user_id);

        cache.invalidate(user_id);
        cache
            .put(user_id, resolution(user_id), tag_before_write)
            .await;

        assert!(cache.get(user_id).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn entry_limit_is_enforced() {
        let cache = ResolutionCache::with_max_entries(2);
        for _ in 0..5 {
            let user_id = UserId::new();
            let tag = cache.current_tag(user_id);
            cache.put(user_id, resolution(user_id), tag).await;
        }

        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn invalidating_many_users_keeps_generation_state_fixed() {
        let cache = ResolutionCache::with_max_entries(2);
        let users: Vec<UserId> = (0..ResolutionCache::GENERATION_SLOTS * 2)
            .map(|_| UserId::new())
            .collect();
        let tags: Vec<_> = users.iter().map(|user_id| cache.current_tag(*user_id)).collect();

        for user_id in &users {
            cache.invalidate(*user_id);
        }

        assert_eq!(cache.user_generations.len(), ResolutionCache::GENERATION_SLOTS);
        for (user_id, tag) in users.iter().zip(tags) {
            assert!(cache.current_tag(*user_id).user_generation() > tag.user_generation());
        }
    }
}
