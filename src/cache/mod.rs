//! Persistent TTL cache of goal replay links.
//!
//! Entries are keyed by [`GoalLinkKey`]. A found link and a "not found" marker share
//! one representation but expire on different schedules, so a failed search is
//! retried sooner than a found link is refreshed.

pub mod storage;

pub use storage::{JsonFileStorage, LinkStorage, MemoryStorage};

use crate::constants::cache::{LINK_TTL_HOURS, NOT_FOUND_TTL_HOURS};
use crate::models::{GoalLink, GoalLinkKey};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to persist goal link cache to {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Goal link cache at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize goal link cache: {0}")]
    Serialize(serde_json::Error),
}

/// Expiry policy per entry class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub link: Duration,
    pub not_found: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            link: Duration::hours(LINK_TTL_HOURS),
            not_found: Duration::hours(NOT_FOUND_TTL_HOURS),
        }
    }
}

impl CacheTtl {
    #[must_use]
    pub fn for_link(&self, link: &GoalLink) -> Duration {
        if link.is_not_found() {
            self.not_found
        } else {
            self.link
        }
    }

    #[must_use]
    pub fn is_expired(&self, link: &GoalLink, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(link.fetched_at) > self.for_link(link)
    }
}

pub struct GoalLinkCache {
    links: RwLock<HashMap<GoalLinkKey, GoalLink>>,
    storage: Box<dyn LinkStorage>,
    ttl: CacheTtl,
}

impl std::fmt::Debug for GoalLinkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalLinkCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl GoalLinkCache {
    /// Loads persisted entries and sweeps the expired ones.
    ///
    /// Unreadable or corrupt state starts the cache empty; it is overwritten by the
    /// next successful write.
    pub fn open(storage: impl LinkStorage + 'static, ttl: CacheTtl) -> Self {
        let links = match storage.load() {
            Ok(links) => links.into_iter().map(|l| (l.key(), l)).collect(),
            Err(e) => {
                warn!(error = %e, "Starting with an empty goal link cache");
                HashMap::new()
            }
        };

        let cache = Self {
            links: RwLock::new(links),
            storage: Box::new(storage),
            ttl,
        };

        if let Err(e) = cache.clean_expired() {
            warn!(error = %e, "Failed to persist expired goal link cleanup");
        }

        cache
    }

    #[must_use]
    pub const fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Returns the entry for `key` if it has not expired. "Not found" markers are
    /// returned too; check [`GoalLink::is_not_found`].
    #[must_use]
    pub fn get(&self, key: GoalLinkKey) -> Option<GoalLink> {
        let now = Utc::now();
        let links = self.links.read().unwrap_or_else(PoisonError::into_inner);
        links
            .get(&key)
            .filter(|link| !self.ttl.is_expired(link, now))
            .cloned()
    }

    /// Upserts `link` and persists the whole cache. The in-memory entry is kept even
    /// if persisting fails.
    pub fn set(&self, link: GoalLink) -> Result<(), CacheError> {
        let mut links = self.links.write().unwrap_or_else(PoisonError::into_inner);
        links.insert(link.key(), link);
        self.save_locked(&links)
    }

    pub fn set_not_found(&self, match_id: i64, minute: u32) -> Result<(), CacheError> {
        self.set(GoalLink::not_found(match_id, minute))
    }

    /// Unexpired found links for a match, ordered by minute.
    #[must_use]
    pub fn get_all(&self, match_id: i64) -> Vec<GoalLink> {
        let now = Utc::now();
        let links = self.links.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<GoalLink> = links
            .values()
            .filter(|l| l.match_id == match_id)
            .filter(|l| !l.is_not_found() && !self.ttl.is_expired(l, now))
            .cloned()
            .collect();
        result.sort_by_key(|l| l.minute);
        result
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        let mut links = self.links.write().unwrap_or_else(PoisonError::into_inner);
        links.clear();
        self.save_locked(&links)
    }

    /// Drops expired entries, persisting only when something was removed.
    /// Returns the number of entries removed.
    pub fn clean_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut links = self.links.write().unwrap_or_else(PoisonError::into_inner);
        let before = links.len();
        links.retain(|_, link| !self.ttl.is_expired(link, now));
        let removed = before - links.len();

        if removed == 0 {
            return Ok(0);
        }

        debug!(removed, "Removed expired goal links");
        self.save_locked(&links)?;
        Ok(removed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Caller holds the write lock.
    fn save_locked(&self, links: &HashMap<GoalLinkKey, GoalLink>) -> Result<(), CacheError> {
        let mut snapshot: Vec<GoalLink> = links.values().cloned().collect();
        snapshot.sort_by_key(GoalLink::key);
        self.storage.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn link(match_id: i64, minute: u32, age: Duration) -> GoalLink {
        GoalLink {
            match_id,
            minute,
            url: format!("https://v.redd.it/{match_id}-{minute}"),
            title: "Wolves [1] - 0 West Ham - Mane 41'".to_string(),
            post_url: "https://www.reddit.com/r/soccer/comments/abc".to_string(),
            fetched_at: Utc::now() - age,
        }
    }

    fn marker(match_id: i64, minute: u32, age: Duration) -> GoalLink {
        GoalLink {
            fetched_at: Utc::now() - age,
            ..GoalLink::not_found(match_id, minute)
        }
    }

    fn empty_cache() -> GoalLinkCache {
        GoalLinkCache::open(MemoryStorage::new(), CacheTtl::default())
    }

    #[test]
    fn test_set_then_get() {
        let cache = empty_cache();
        cache.set(link(1, 41, Duration::zero())).unwrap();

        let hit = cache.get(GoalLinkKey::new(1, 41)).unwrap();
        assert_eq!(hit.url, "https://v.redd.it/1-41");
        assert!(cache.get(GoalLinkKey::new(1, 42)).is_none());
    }

    #[test]
    fn test_set_is_upsert() {
        let cache = empty_cache();
        cache.set_not_found(1, 41).unwrap();
        cache.set(link(1, 41, Duration::zero())).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(!cache.get(GoalLinkKey::new(1, 41)).unwrap().is_not_found());
    }

    #[test]
    fn test_link_ttl_boundary() {
        let ttl = CacheTtl::default();
        let margin = Duration::minutes(1);
        let cache = empty_cache();

        cache.set(link(1, 10, ttl.link + margin)).unwrap();
        cache.set(link(1, 20, ttl.link - margin)).unwrap();

        assert!(cache.get(GoalLinkKey::new(1, 10)).is_none());
        assert!(cache.get(GoalLinkKey::new(1, 20)).is_some());
    }

    #[test]
    fn test_not_found_ttl_is_shorter() {
        let cache = empty_cache();
        cache.set(marker(1, 10, Duration::hours(2))).unwrap();
        cache.set(marker(1, 20, Duration::hours(25))).unwrap();
        cache.set(link(1, 30, Duration::hours(25))).unwrap();

        assert!(cache.get(GoalLinkKey::new(1, 10)).unwrap().is_not_found());
        assert!(cache.get(GoalLinkKey::new(1, 20)).is_none());
        assert!(cache.get(GoalLinkKey::new(1, 30)).is_some());
    }

    #[test]
    fn test_expired_entry_not_deleted_on_read() {
        let cache = empty_cache();
        cache.set(marker(1, 10, Duration::hours(30))).unwrap();

        assert!(cache.get(GoalLinkKey::new(1, 10)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_all_excludes_markers_and_other_matches() {
        let cache = empty_cache();
        cache.set(link(1, 60, Duration::zero())).unwrap();
        cache.set(link(1, 5, Duration::zero())).unwrap();
        cache.set_not_found(1, 80).unwrap();
        cache.set(link(2, 5, Duration::zero())).unwrap();
        cache.set(link(1, 90, Duration::days(8))).unwrap();

        let minutes: Vec<u32> = cache.get_all(1).iter().map(|l| l.minute).collect();
        assert_eq!(minutes, vec![5, 60]);
    }

    #[test]
    fn test_open_cleans_expired_and_persists() {
        let storage = MemoryStorage::with_links(vec![
            link(1, 10, Duration::days(8)),
            marker(1, 20, Duration::days(2)),
            link(1, 30, Duration::hours(1)),
        ]);
        let cache = GoalLinkCache::open(storage, CacheTtl::default());

        assert_eq!(cache.len(), 1);
        assert!(cache.get(GoalLinkKey::new(1, 30)).is_some());
    }

    #[test]
    fn test_clean_expired_without_removals_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goal_links.json");
        let cache = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());

        assert_eq!(cache.clean_expired().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_persists_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goal_links.json");
        let cache = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());
        cache.set(link(1, 10, Duration::zero())).unwrap();

        cache.clear().unwrap();

        assert!(cache.is_empty());
        let saved: Vec<GoalLink> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(saved.is_empty());
    }

    #[test]
    fn test_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goal_links.json");
        {
            let cache = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());
            cache.set(link(3, 77, Duration::zero())).unwrap();
            cache.set_not_found(3, 78).unwrap();
        }

        let reopened = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get(GoalLinkKey::new(3, 78)).unwrap().is_not_found());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goal_links.json");
        std::fs::write(&path, "<<garbage>>").unwrap();

        let cache = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());
        assert!(cache.is_empty());

        cache.set(link(1, 1, Duration::zero())).unwrap();
        let reopened = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_persistence_error_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail.
        let path = dir.path().join("goal_links.json");
        std::fs::create_dir(&path).unwrap();

        let cache = GoalLinkCache::open(JsonFileStorage::new(&path), CacheTtl::default());
        let err = cache.set(link(1, 10, Duration::zero())).unwrap_err();

        assert!(matches!(err, CacheError::Persistence { .. }));
        assert!(cache.get(GoalLinkKey::new(1, 10)).is_some());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let cache = Arc::new(empty_cache());
        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for minute in 0..50 {
                    cache.set(link(9, minute, Duration::zero())).unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let _ = cache.get_all(9);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cache.get_all(9).len(), 50);
    }
}
