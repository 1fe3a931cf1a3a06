//! Process-wide tile cache.
//!
//! A [`TileCache`] is created once and handed to every
//! [`TileStore`](crate::TileStore) as an `Arc`, so stores for the same
//! dataset share decoded tiles. Tiles are loaded outside of the cache, so two
//! threads missing on the same key may both load it and the last insert wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use tracing::debug;

use crate::tile::ElevationTile;
use crate::tilename::TileKey;

/// How many tiles a [`TileCache`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Never evict. Suited to a single track touching a few tiles.
    #[default]
    KeepAll,
    /// Keep only the most recently inserted tile. Bounds memory for batch
    /// runs over many widely separated tracks.
    SingleSlot,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of tiles currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (requests served from cache).
    pub hit_count: u64,
    /// Number of cache misses.
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Shared map from [`TileKey`] to decoded tile.
pub struct TileCache {
    policy: EvictionPolicy,
    tiles: Cache<TileKey, Arc<ElevationTile>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("policy", &self.policy)
            .field("entry_count", &self.tiles.entry_count())
            .finish()
    }
}

impl TileCache {
    /// Create an empty cache.
    pub fn new(policy: EvictionPolicy) -> Self {
        let tiles = match policy {
            EvictionPolicy::KeepAll => Cache::builder().build(),
            EvictionPolicy::SingleSlot => Cache::builder().max_capacity(1).build(),
        };
        Self {
            policy,
            tiles,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Create an empty cache ready to be shared between stores.
    pub fn shared(policy: EvictionPolicy) -> Arc<Self> {
        Arc::new(Self::new(policy))
    }

    /// Eviction policy of this cache.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Look a tile up, counting the hit or miss.
    pub fn get(&self, key: &TileKey) -> Option<Arc<ElevationTile>> {
        let tile = self.tiles.get(key);
        match tile {
            Some(_) => self.hit_count.fetch_add(1, Ordering::Relaxed),
            None => self.miss_count.fetch_add(1, Ordering::Relaxed),
        };
        tile
    }

    #[cfg(test)]
    fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    /// Insert a tile according to the eviction policy.
    pub fn insert(&self, key: TileKey, tile: Arc<ElevationTile>) {
        if self.policy == EvictionPolicy::SingleSlot && !self.tiles.contains_key(&key) {
            let evicted = self.tiles.entry_count();
            if evicted > 0 {
                debug!(evicted, "single-slot cache eviction");
            }
            // Empty the slot first so the new tile is always admitted
            self.tiles.invalidate_all();
            self.tiles.run_pending_tasks();
        }
        self.tiles.insert(key, tile);
        self.tiles.run_pending_tasks();
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.tiles.entry_count() as usize
    }

    /// Whether the cache holds no tile.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.tiles.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> Arc<ElevationTile> {
        Arc::new(ElevationTile::from_bytes(vec![0u8; 2 * 3 * 3], 0, 0).unwrap())
    }

    fn key(lat: f64, lon: f64) -> TileKey {
        TileKey::new(lat, lon, "SRTMGL1v3")
    }

    #[test]
    fn test_keep_all() {
        let cache = TileCache::new(EvictionPolicy::KeepAll);
        for lat in 0..5 {
            cache.insert(key(lat as f64, 0.0), tile());
        }
        assert_eq!(cache.len(), 5);
        assert!(cache.contains(&key(0.5, 0.5)));
    }

    #[test]
    fn test_single_slot() {
        let cache = TileCache::new(EvictionPolicy::SingleSlot);
        cache.insert(key(0.0, 0.0), tile());
        cache.insert(key(1.0, 0.0), tile());
        cache.insert(key(2.0, 0.0), tile());

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key(2.0, 0.0)));
        assert!(!cache.contains(&key(0.0, 0.0)));

        // Re-inserting the held key keeps one entry
        cache.insert(key(2.0, 0.0), tile());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_miss_counts() {
        let cache = TileCache::default();
        assert!(cache.get(&key(0.0, 0.0)).is_none());
        cache.insert(key(0.0, 0.0), tile());
        assert!(cache.get(&key(0.5, 0.5)).is_some());
        assert!(cache.get(&key(0.9, 0.1)).is_some());

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_cache_stats() {
        let stats = CacheStats {
            entry_count: 5,
            hit_count: 80,
            miss_count: 20,
        };
        assert_eq!(stats.hit_rate(), 0.8);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_versions_are_distinct() {
        let cache = TileCache::default();
        cache.insert(TileKey::new(0.0, 0.0, "SRTMGL1v3"), tile());
        assert!(!cache.contains(&TileKey::new(0.0, 0.0, "JdF1")));
    }

    #[test]
    fn test_single_slot_alternating_keys() {
        let cache = TileCache::new(EvictionPolicy::SingleSlot);
        for round in 0..10 {
            let lat = (round % 2) as f64;
            cache.insert(key(lat, 0.0), tile());
            assert_eq!(cache.stats().entry_count, 1);
            assert!(cache.get(&key(lat, 0.0)).is_some());
            assert!(cache.get(&key(1.0 - lat, 0.0)).is_none());
        }
    }
}
