//! # Shard Manager
//!
//! Partitions the key space across K independent [`MemoryEngine`]s and
//! supports online re-sharding while preserving every entry. Grounded
//! on `original_source/src/sharding.{h,cpp}`'s `ShardManager`/
//! `getShardIndex`/`rebalance`, using the same `parking_lot` lock idiom
//! one level up from its per-shard use in `memory.rs`.

use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::RwLock;

use lunarkv_common::{HkvError, HkvResult};

use crate::engine::KVEngine;
use crate::memory::MemoryEngine;

/// Owns an ordered vector of engines and routes every key operation to
/// `h(key) mod K`. Reads and writes against different shards proceed
/// independently; `rebalance` is the only operation requiring
/// exclusive access to the shard vector itself.
pub struct ShardManager {
    shards: RwLock<Vec<Arc<MemoryEngine>>>,
    hash_state: RandomState,
    capacity_per_shard: usize,
}

impl ShardManager {
    pub fn new(shard_count: usize, capacity_per_shard: usize) -> HkvResult<Self> {
        if shard_count == 0 {
            return Err(HkvError::InvalidShardCount);
        }

        let hash_state = RandomState::new();
        let shards = (0..shard_count)
            .map(|_| Arc::new(MemoryEngine::new(capacity_per_shard)))
            .collect();

        Ok(ShardManager {
            shards: RwLock::new(shards),
            hash_state,
            capacity_per_shard,
        })
    }

    fn hash(&self, key: &[u8]) -> u64 {
        let mut hasher = self.hash_state.build_hasher();
        hasher.write(key);
        hasher.finish()
    }

    pub fn get_shard_count(&self) -> usize {
        self.shards.read().len()
    }

    pub fn get_shard_index(&self, key: &[u8]) -> usize {
        let len = self.get_shard_count();
        (self.hash(key) as usize) % len
    }

    pub fn get_total_key_count(&self) -> usize {
        self.shards.read().iter().map(|engine| engine.size()).sum()
    }

    /// Returns the engine that owns `key` under the current shard count.
    fn engine_for(&self, key: &[u8]) -> Arc<MemoryEngine> {
        let shards = self.shards.read();
        let idx = (self.hash(key) as usize) % shards.len();
        Arc::clone(&shards[idx])
    }

    /// Atomically transitions to `new_shard_count` engines: drain every
    /// entry from the current shards, install fresh empty engines, then
    /// reinsert each entry through `set` so it lands in its new hashed
    /// home. No other operation may observe a torn shard vector during
    /// this call because it holds the write lock throughout.
    pub fn rebalance(&self, new_shard_count: usize) -> HkvResult<()> {
        if new_shard_count == 0 {
            return Err(HkvError::InvalidShardCount);
        }

        let mut shards = self.shards.write();

        let mut drained = Vec::new();
        for engine in shards.iter() {
            for key in engine.keys() {
                if let Some(entry) = engine.raw_entry(&key) {
                    drained.push((key, entry));
                }
            }
        }

        let new_shards: Vec<Arc<MemoryEngine>> = (0..new_shard_count)
            .map(|_| Arc::new(MemoryEngine::new(self.capacity_per_shard)))
            .collect();

        for (key, entry) in drained {
            let idx = (self.hash(&key) as usize) % new_shards.len();
            new_shards[idx].raw_insert(key, entry);
        }

        *shards = new_shards;
        Ok(())
    }

    pub fn set(&self, key: Vec<u8>, value: Vec<u8>, ttl_seconds: u64) -> HkvResult<()> {
        self.engine_for(&key).set(key, value, ttl_seconds)
    }

    pub fn get(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        self.engine_for(key).get(key)
    }

    pub fn del(&self, key: &[u8]) -> HkvResult<bool> {
        self.engine_for(key).del(key)
    }

    pub fn clear(&self) {
        for engine in self.shards.read().iter() {
            engine.clear();
        }
    }

    pub fn size(&self) -> usize {
        self.get_total_key_count()
    }

    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.shards.read().iter().flat_map(|e| e.keys()).collect()
    }

    pub fn mset(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> HkvResult<()> {
        for (key, value) in pairs {
            self.set(key, value, 0)?;
        }
        Ok(())
    }

    pub fn mget(&self, keys: &[Vec<u8>]) -> HkvResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    pub fn lpush(&self, key: Vec<u8>, value: Vec<u8>) -> HkvResult<()> {
        self.engine_for(&key).lpush(key, value)
    }

    pub fn rpush(&self, key: Vec<u8>, value: Vec<u8>) -> HkvResult<()> {
        self.engine_for(&key).rpush(key, value)
    }

    pub fn lpop(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        self.engine_for(key).lpop(key)
    }

    pub fn rpop(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        self.engine_for(key).rpop(key)
    }

    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> HkvResult<Vec<Vec<u8>>> {
        self.engine_for(key).lrange(key, start, stop)
    }

    pub fn llen(&self, key: &[u8]) -> HkvResult<usize> {
        self.engine_for(key).llen(key)
    }

    pub fn cleanup_expired(&self) -> usize {
        self.shards.read().iter().map(|e| e.cleanup_expired()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_and_counts_keys() {
        let manager = ShardManager::new(4, 1000).unwrap();
        for i in 0..100 {
            manager
                .set(format!("key{i}").into_bytes(), b"v".to_vec(), 0)
                .unwrap();
        }
        assert_eq!(manager.get_total_key_count(), 100);
    }

    #[test]
    fn rebalance_preserves_all_data() {
        let manager = ShardManager::new(4, 10_000).unwrap();
        for i in 0..1000 {
            manager
                .set(format!("key{i}").into_bytes(), format!("v{i}").into_bytes(), 0)
                .unwrap();
        }

        let before = manager.get_total_key_count();
        manager.rebalance(16).unwrap();
        let after = manager.get_total_key_count();

        assert_eq!(before, after);
        assert_eq!(manager.get_shard_count(), 16);

        for i in 0..1000 {
            let value = manager.get(format!("key{i}").as_bytes()).unwrap().unwrap();
            assert_eq!(value, format!("v{i}").into_bytes());
        }
    }

    #[test]
    fn rebalance_preserves_lists_and_ttls() {
        let manager = ShardManager::new(4, 1000).unwrap();
        manager.lpush(b"mylist".to_vec(), b"a".to_vec()).unwrap();
        manager.rpush(b"mylist".to_vec(), b"b".to_vec()).unwrap();
        manager.lpush(b"mylist".to_vec(), b"c".to_vec()).unwrap();
        manager.set(b"expiring".to_vec(), b"v".to_vec(), 60).unwrap();
        manager.set(b"forever".to_vec(), b"v".to_vec(), 0).unwrap();

        let before = manager.get_total_key_count();
        manager.rebalance(8).unwrap();
        assert_eq!(manager.get_total_key_count(), before);

        assert_eq!(
            manager.lrange(b"mylist", 0, -1).unwrap(),
            vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()]
        );
        assert_eq!(manager.get(b"forever").unwrap().unwrap(), b"v".to_vec());

        // The TTL-bearing key must still carry a live deadline, not "no
        // expiry" — it would otherwise never be evicted or cleaned up.
        let shard = manager.engine_for(b"expiring");
        let entry = shard.raw_entry(b"expiring").expect("key survives rebalance");
        assert!(entry.expires_at.is_some());
    }

    #[test]
    fn rebalance_rejects_zero() {
        let manager = ShardManager::new(4, 100).unwrap();
        assert!(manager.rebalance(0).is_err());
    }
}
