//! # In-Memory Engine
//!
//! The per-shard bounded key-value map: string and list entries behind
//! an internal lock-striped table, TTL-aware on every access, with
//! capacity-based eviction and an optional write-through provider.
//!
//! ## Design Principles
//!
//! 1. **Lock striping**: the entry table is split into internal lock
//!    shards so unrelated keys never contend on the same `RwLock`.
//! 2. **Earliest-expiry eviction**: instead of LRU, the victim is the
//!    live entry with the smallest expiry rank (no-TTL entries rank
//!    first). Bounded work per write, biases removal toward ephemeral
//!    data.
//! 3. **Arc-backed keys**: map keys and slot keys share one `Arc<[u8]>`
//!    to avoid duplicate allocations.
//! 4. **Provider is best-effort**: write-through/read-fallback never
//!    fails the local operation; failures are logged.
//!
//! ## Structure Overview
//!
//! ```text
//! MemoryEngine
//!   ├── shards: Vec<LockShard>
//!   │     └── LockShard
//!   │           └── inner: RwLock<ShardInner>
//!   │                 ├── map: HashMap<Arc<[u8]>, usize>
//!   │                 ├── slots: Vec<Option<Slot>>
//!   │                 ├── free: Vec<usize>
//!   │                 └── rank_index: BTreeMap<(rank, seq), usize>
//!   └── provider: RwLock<Option<Box<dyn Provider>>>
//! ```

use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::RwLock;

use lunarkv_common::{HkvError, HkvResult};

use crate::engine::KVEngine;
use crate::entry::{Entry, EntryValue};
use crate::provider::Provider;

/// Default internal lock shards = CPU count * multiplier, to reduce
/// contention without the caller needing to reason about it.
const DEFAULT_SHARD_MULTIPLIER: usize = 4;

/// A rank used to order entries by "evict first". `None` in the first
/// component sorts before any `Some`: a no-TTL entry never expires and
/// so is evicted only after everything with a deadline.
type Rank = (Option<u128>, u64);

#[derive(Debug)]
struct Slot {
    key: Arc<[u8]>,
    entry: Entry,
    rank: Rank,
}

/// Lock-shard-local storage: a hash map for lookups and a dense slot
/// arena plus an expiry-rank index for eviction.
#[derive(Debug)]
struct ShardInner {
    map: HashMap<Arc<[u8]>, usize, RandomState>,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    rank_index: BTreeMap<Rank, usize>,
}

impl ShardInner {
    fn new(hash_state: RandomState) -> Self {
        ShardInner {
            map: HashMap::with_hasher(hash_state),
            slots: Vec::new(),
            free: Vec::new(),
            rank_index: BTreeMap::new(),
        }
    }

    fn alloc_slot(&mut self) -> usize {
        self.free.pop().unwrap_or_else(|| {
            self.slots.push(None);
            self.slots.len() - 1
        })
    }

    /// Inserts a brand-new key, returning its slot index.
    fn insert_new(&mut self, key: Arc<[u8]>, entry: Entry, rank: Rank) -> usize {
        let idx = self.alloc_slot();
        self.slots[idx] = Some(Slot {
            key: Arc::clone(&key),
            entry,
            rank,
        });
        self.rank_index.insert(rank, idx);
        self.map.insert(key, idx);
        idx
    }

    /// Replaces the entry at `idx` in place, re-keying the rank index.
    fn replace_entry(&mut self, idx: usize, entry: Entry, rank: Rank) {
        if let Some(slot) = self.slots[idx].as_mut() {
            self.rank_index.remove(&slot.rank);
            slot.entry = entry;
            slot.rank = rank;
            self.rank_index.insert(rank, idx);
        }
    }

    fn remove_idx(&mut self, idx: usize) -> Option<Entry> {
        let slot = self.slots[idx].take()?;
        self.rank_index.remove(&slot.rank);
        self.map.remove(slot.key.as_ref());
        self.free.push(idx);
        Some(slot.entry)
    }

    /// Removes and returns the (key, entry) with the smallest rank.
    fn pop_earliest(&mut self) -> Option<(Arc<[u8]>, Entry)> {
        let (&rank, &idx) = self.rank_index.iter().next()?;
        let _ = rank;
        let slot = self.slots[idx].take()?;
        self.rank_index.remove(&slot.rank);
        self.map.remove(slot.key.as_ref());
        self.free.push(idx);
        Some((slot.key, slot.entry))
    }
}

struct LockShard {
    inner: RwLock<ShardInner>,
}

/// Sharded in-memory implementation of a single [`KVEngine`] (spec C2).
///
/// The internal lock striping is a concurrency mechanism only; the
/// capacity invariant (`size() <= capacity`) applies to the engine as
/// a whole, not to any one internal shard.
pub struct MemoryEngine {
    shards: Vec<LockShard>,
    shard_mask: usize,
    hash_state: RandomState,
    capacity: usize,
    used_count: AtomicUsize,
    eviction_cursor: AtomicUsize,
    seq: AtomicU64,
    start: Instant,
    provider: RwLock<Option<Box<dyn Provider>>>,
}

impl MemoryEngine {
    /// Creates an engine with a default internal shard count and the
    /// given entry capacity (must be > 0 per spec).
    pub fn new(capacity: usize) -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_shard_count(threads.saturating_mul(DEFAULT_SHARD_MULTIPLIER), capacity)
    }

    pub fn with_shard_count(shards: usize, capacity: usize) -> Self {
        let shard_count = normalize_shard_count(shards);
        let hash_state = RandomState::new();
        let mut shard_vec = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shard_vec.push(LockShard {
                inner: RwLock::new(ShardInner::new(hash_state.clone())),
            });
        }

        MemoryEngine {
            shards: shard_vec,
            shard_mask: shard_count - 1,
            hash_state,
            capacity: capacity.max(1),
            used_count: AtomicUsize::new(0),
            eviction_cursor: AtomicUsize::new(0),
            seq: AtomicU64::new(0),
            start: Instant::now(),
            provider: RwLock::new(None),
        }
    }

    /// Attaches a provider if it reports itself connected. Returns
    /// whether the attach succeeded, mirroring
    /// `original_source/src/cache.h`'s `attachProvider`.
    pub fn attach_provider(&self, provider: Box<dyn Provider>) -> bool {
        if !provider.is_connected() {
            return false;
        }
        *self.provider.write() = Some(provider);
        true
    }

    pub fn detach_provider(&self) {
        *self.provider.write() = None;
    }

    pub fn has_provider(&self) -> bool {
        self.provider.read().is_some()
    }

    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = self.hash_state.build_hasher();
        hasher.write(key);
        (hasher.finish() as usize) & self.shard_mask
    }

    fn shard_for(&self, key: &[u8]) -> &LockShard {
        &self.shards[self.shard_index(key)]
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn rank_for(&self, expires_at: Option<Instant>) -> Rank {
        let ttl_rank = expires_at.map(|deadline| deadline.saturating_duration_since(self.start).as_nanos());
        (ttl_rank, self.next_seq())
    }

    /// Serializes an entry's value the way the provider expects: raw
    /// bytes for a string, newline-joined elements for a list.
    fn serialize_for_provider(value: &EntryValue) -> Vec<u8> {
        match value {
            EntryValue::Str(bytes) => bytes.clone(),
            EntryValue::List(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend_from_slice(item);
                    out.push(b'\n');
                }
                out
            }
        }
    }

    fn sync_provider_set(&self, key: &[u8], entry: &Entry) {
        let guard = self.provider.read();
        if let Some(provider) = guard.as_ref() {
            let ttl_secs = entry
                .expires_at
                .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_secs())
                .unwrap_or(0);
            let payload = Self::serialize_for_provider(&entry.value);
            if !provider.set(key, &payload, ttl_secs) {
                tracing::warn!(key = %String::from_utf8_lossy(key), "provider write-through failed");
            }
        }
    }

    fn sync_provider_del(&self, key: &[u8]) {
        let guard = self.provider.read();
        if let Some(provider) = guard.as_ref() {
            if !provider.del(key) {
                tracing::warn!(key = %String::from_utf8_lossy(key), "provider delete failed");
            }
        }
    }

    /// Evicts entries until within capacity, ranking by soonest expiry
    /// rather than recency.
    fn evict_if_needed(&self) {
        loop {
            if self.used_count.load(Ordering::Relaxed) <= self.capacity {
                break;
            }

            let start = self.eviction_cursor.fetch_add(1, Ordering::Relaxed);
            let mut evicted = false;

            for offset in 0..self.shards.len() {
                let idx = (start + offset) & self.shard_mask;
                let mut inner = self.shards[idx].inner.write();
                if let Some((key, _entry)) = inner.pop_earliest() {
                    drop(inner);
                    self.used_count.fetch_sub(1, Ordering::Relaxed);
                    self.sync_provider_del(&key);
                    evicted = true;
                    break;
                }
            }

            if !evicted {
                break;
            }
        }
    }

    fn make_ttl(ttl_seconds: u64) -> Option<Instant> {
        if ttl_seconds == 0 {
            None
        } else {
            Some(Instant::now() + std::time::Duration::from_secs(ttl_seconds))
        }
    }

    fn get_string_local(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();

        let idx = match inner.map.get(key) {
            Some(&idx) => idx,
            None => return Ok(None),
        };

        let expired = inner.slots[idx]
            .as_ref()
            .map(|slot| slot.entry.is_expired(now))
            .unwrap_or(false);
        if expired {
            inner.remove_idx(idx);
            drop(inner);
            self.used_count.fetch_sub(1, Ordering::Relaxed);
            return Ok(None);
        }

        match inner.slots[idx].as_ref().map(|slot| &slot.entry.value) {
            Some(EntryValue::Str(bytes)) => Ok(Some(bytes.clone())),
            Some(EntryValue::List(_)) => Ok(None),
            None => Ok(None),
        }
    }

    /// Returns a clone of the raw entry for `key` regardless of its
    /// value variant, without the provider read-through `get` does.
    /// Used by shard rebalancing, which must move every entry — string
    /// or list — and its expiry intact.
    pub(crate) fn raw_entry(&self, key: &[u8]) -> Option<Entry> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();

        let idx = *inner.map.get(key)?;
        let expired = inner.slots[idx]
            .as_ref()
            .map(|slot| slot.entry.is_expired(now))
            .unwrap_or(false);
        if expired {
            inner.remove_idx(idx);
            drop(inner);
            self.used_count.fetch_sub(1, Ordering::Relaxed);
            return None;
        }

        inner.slots[idx].as_ref().map(|slot| slot.entry.clone())
    }

    /// Inserts `entry` for `key` as-is, preserving its expiry and value
    /// variant. Used by shard rebalancing to carry a drained entry into
    /// its new shard without going through `set`'s ttl-seconds-from-now
    /// conversion.
    pub(crate) fn raw_insert(&self, key: Vec<u8>, entry: Entry) {
        let shard = self.shard_for(&key);
        let key_arc: Arc<[u8]> = Arc::from(key.as_slice());
        let rank = self.rank_for(entry.expires_at);

        {
            let mut inner = shard.inner.write();
            if let Some(&idx) = inner.map.get(key_arc.as_ref()) {
                inner.replace_entry(idx, entry.clone(), rank);
            } else {
                inner.insert_new(Arc::clone(&key_arc), entry.clone(), rank);
                self.used_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.sync_provider_set(&key_arc, &entry);
        self.evict_if_needed();
    }
}

impl KVEngine for MemoryEngine {
    fn set(&self, key: Vec<u8>, value: Vec<u8>, ttl_seconds: u64) -> HkvResult<()> {
        let expires_at = Self::make_ttl(ttl_seconds);
        let shard = self.shard_for(&key);
        let key_arc: Arc<[u8]> = Arc::from(key.as_slice());
        let entry = Entry::new_str(value, expires_at);

        {
            let mut inner = shard.inner.write();
            let rank = self.rank_for(expires_at);
            if let Some(&idx) = inner.map.get(key_arc.as_ref()) {
                inner.replace_entry(idx, entry.clone(), rank);
            } else {
                inner.insert_new(Arc::clone(&key_arc), entry.clone(), rank);
                self.used_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.sync_provider_set(&key_arc, &entry);
        self.evict_if_needed();
        Ok(())
    }

    fn get(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        if let Some(value) = self.get_string_local(key)? {
            return Ok(Some(value));
        }

        // Local miss: fall back to the provider and cache the result,
        // per original_source/src/cache.cpp's `get`.
        let provider_value = {
            let guard = self.provider.read();
            guard.as_ref().and_then(|provider| provider.get(key))
        };

        if let Some(value) = provider_value {
            self.set(key.to_vec(), value.clone(), 0)?;
            return Ok(Some(value));
        }

        Ok(None)
    }

    fn del(&self, key: &[u8]) -> HkvResult<bool> {
        let shard = self.shard_for(key);
        let removed = {
            let mut inner = shard.inner.write();
            match inner.map.get(key) {
                Some(&idx) => inner.remove_idx(idx).is_some(),
                None => false,
            }
        };

        if removed {
            self.used_count.fetch_sub(1, Ordering::Relaxed);
            self.sync_provider_del(key);
        }
        Ok(removed)
    }

    fn clear(&self) {
        for shard in &self.shards {
            let mut inner = shard.inner.write();
            inner.map.clear();
            inner.slots.clear();
            inner.free.clear();
            inner.rank_index.clear();
        }
        self.used_count.store(0, Ordering::Relaxed);
    }

    fn size(&self) -> usize {
        self.used_count.load(Ordering::Relaxed)
    }

    fn keys(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        for shard in &self.shards {
            let inner = shard.inner.read();
            for &idx in inner.map.values() {
                if let Some(slot) = inner.slots[idx].as_ref() {
                    out.push(slot.key.to_vec());
                }
            }
        }
        out
    }

    fn mset(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> HkvResult<()> {
        for (key, value) in pairs {
            self.set(key, value, 0)?;
        }
        Ok(())
    }

    fn mget(&self, keys: &[Vec<u8>]) -> HkvResult<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key)?);
        }
        Ok(out)
    }

    fn lpush(&self, key: Vec<u8>, value: Vec<u8>) -> HkvResult<()> {
        self.push(key, value, true)
    }

    fn rpush(&self, key: Vec<u8>, value: Vec<u8>) -> HkvResult<()> {
        self.push(key, value, false)
    }

    fn lpop(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        self.pop(key, true)
    }

    fn rpop(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>> {
        self.pop(key, false)
    }

    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> HkvResult<Vec<Vec<u8>>> {
        let shard = self.shard_for(key);
        let inner = shard.inner.read();

        let idx = match inner.map.get(key) {
            Some(&idx) => idx,
            None => return Ok(Vec::new()),
        };

        match inner.slots[idx].as_ref().map(|slot| &slot.entry.value) {
            Some(EntryValue::List(items)) => {
                let len = items.len() as i64;
                if len == 0 {
                    return Ok(Vec::new());
                }

                let norm = |i: i64| -> i64 { if i < 0 { len + i } else { i } };
                let start = norm(start).clamp(0, len - 1);
                let stop = norm(stop).clamp(0, len - 1);

                if start > stop {
                    return Ok(Vec::new());
                }

                Ok(items
                    .iter()
                    .skip(start as usize)
                    .take((stop - start + 1) as usize)
                    .cloned()
                    .collect())
            }
            Some(EntryValue::Str(_)) => Err(HkvError::WrongType),
            None => Ok(Vec::new()),
        }
    }

    fn llen(&self, key: &[u8]) -> HkvResult<usize> {
        let shard = self.shard_for(key);
        let inner = shard.inner.read();

        match inner.map.get(key) {
            Some(&idx) => match inner.slots[idx].as_ref().map(|slot| &slot.entry.value) {
                Some(EntryValue::List(items)) => Ok(items.len()),
                Some(EntryValue::Str(_)) => Err(HkvError::WrongType),
                None => Ok(0),
            },
            None => Ok(0),
        }
    }

    fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed_keys: Vec<Arc<[u8]>> = Vec::new();

        for shard in &self.shards {
            let mut inner = shard.inner.write();
            let expired: Vec<usize> = inner
                .map
                .values()
                .copied()
                .filter(|&idx| {
                    inner.slots[idx]
                        .as_ref()
                        .map(|slot| slot.entry.is_expired(now))
                        .unwrap_or(false)
                })
                .collect();

            for idx in expired {
                let key = inner.slots[idx].as_ref().map(|slot| Arc::clone(&slot.key));
                if inner.remove_idx(idx).is_some() {
                    if let Some(key) = key {
                        removed_keys.push(key);
                    }
                }
            }
        }

        self.used_count.fetch_sub(removed_keys.len(), Ordering::Relaxed);
        for key in &removed_keys {
            self.sync_provider_del(key);
        }
        removed_keys.len()
    }
}

impl MemoryEngine {
    /// Shared implementation for `lpush`/`rpush`: create a single-element
    /// list if absent, prepend/append if present, fail `WrongType` on a
    /// string entry.
    fn push(&self, key: Vec<u8>, value: Vec<u8>, front: bool) -> HkvResult<()> {
        let shard = self.shard_for(&key);
        let key_arc: Arc<[u8]> = Arc::from(key.as_slice());

        let synced_entry = {
            let mut inner = shard.inner.write();

            if let Some(&idx) = inner.map.get(key_arc.as_ref()) {
                let is_str = matches!(
                    inner.slots[idx].as_ref().map(|slot| &slot.entry.value),
                    Some(EntryValue::Str(_))
                );
                if is_str {
                    return Err(HkvError::WrongType);
                }

                if let Some(slot) = inner.slots[idx].as_mut() {
                    if let EntryValue::List(items) = &mut slot.entry.value {
                        if front {
                            items.push_front(value);
                        } else {
                            items.push_back(value);
                        }
                    }
                    slot.entry.clone()
                } else {
                    return Ok(());
                }
            } else {
                let entry = Entry::new_list(value);
                let rank = self.rank_for(None);
                inner.insert_new(Arc::clone(&key_arc), entry.clone(), rank);
                self.used_count.fetch_add(1, Ordering::Relaxed);
                entry
            }
        };

        self.sync_provider_set(&key_arc, &synced_entry);
        self.evict_if_needed();
        Ok(())
    }

    /// Shared implementation for `lpop`/`rpop`: pop the head/tail
    /// element, dropping the entry entirely when the list empties.
    fn pop(&self, key: &[u8], front: bool) -> HkvResult<Option<Vec<u8>>> {
        let shard = self.shard_for(key);

        enum Outcome {
            Missing,
            Popped(Vec<u8>, bool, Entry),
        }

        let outcome = {
            let mut inner = shard.inner.write();
            let idx = match inner.map.get(key) {
                Some(&idx) => idx,
                None => return Ok(None),
            };

            let is_str = matches!(
                inner.slots[idx].as_ref().map(|slot| &slot.entry.value),
                Some(EntryValue::Str(_))
            );
            if is_str {
                return Err(HkvError::WrongType);
            }

            let popped = if let Some(slot) = inner.slots[idx].as_mut() {
                if let EntryValue::List(items) = &mut slot.entry.value {
                    if front { items.pop_front() } else { items.pop_back() }
                } else {
                    None
                }
            } else {
                None
            };

            match popped {
                None => Outcome::Missing,
                Some(value) => {
                    let now_empty = matches!(
                        inner.slots[idx].as_ref().map(|slot| &slot.entry.value),
                        Some(EntryValue::List(items)) if items.is_empty()
                    );

                    if now_empty {
                        inner.remove_idx(idx);
                        self.used_count.fetch_sub(1, Ordering::Relaxed);
                        Outcome::Popped(value, true, Entry::new_str(Vec::new(), None))
                    } else {
                        let remaining = inner.slots[idx].as_ref().unwrap().entry.clone();
                        Outcome::Popped(value, false, remaining)
                    }
                }
            }
        };

        match outcome {
            Outcome::Missing => Ok(None),
            Outcome::Popped(value, emptied, remaining) => {
                if emptied {
                    self.sync_provider_del(key);
                } else {
                    self.sync_provider_set(key, &remaining);
                }
                Ok(Some(value))
            }
        }
    }
}

/// Normalizes shard counts to a power of two for fast masking.
fn normalize_shard_count(count: usize) -> usize {
    count.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn set_get_roundtrip() {
        let engine = MemoryEngine::with_shard_count(4, 100);
        engine.set(b"alpha".to_vec(), b"value".to_vec(), 0).unwrap();
        assert_eq!(engine.get(b"alpha").unwrap().unwrap(), b"value");
    }

    #[test]
    fn delete_removes_key() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.set(b"alpha".to_vec(), b"value".to_vec(), 0).unwrap();
        assert!(engine.del(b"alpha").unwrap());
        assert!(engine.get(b"alpha").unwrap().is_none());
    }

    #[test]
    fn expire_hides_value() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.set(b"alpha".to_vec(), b"value".to_vec(), 1).unwrap();
        assert!(engine.get(b"alpha").unwrap().is_some());
        std::thread::sleep(Duration::from_millis(1100));
        assert!(engine.get(b"alpha").unwrap().is_none());
    }

    #[test]
    fn cleanup_expired_removes_entries() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.set(b"alpha".to_vec(), b"value".to_vec(), 1).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(engine.cleanup_expired(), 1);
        assert_eq!(engine.size(), 0);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.set(b"alpha".to_vec(), b"value".to_vec(), 1).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(engine.cleanup_expired(), 1);
        assert_eq!(engine.cleanup_expired(), 0);
    }

    #[test]
    fn evicts_earliest_expiry_first() {
        let engine = MemoryEngine::with_shard_count(1, 2);
        engine.set(b"a".to_vec(), b"1".to_vec(), 100).unwrap();
        engine.set(b"b".to_vec(), b"1".to_vec(), 1).unwrap();
        // Writing a third key over capacity must evict the earliest-rank entry.
        engine.set(b"c".to_vec(), b"1".to_vec(), 100).unwrap();
        assert!(engine.size() <= 2);
    }

    #[test]
    fn list_push_pop_and_range() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.lpush(b"nums".to_vec(), b"1".to_vec()).unwrap();
        engine.lpush(b"nums".to_vec(), b"2".to_vec()).unwrap();
        engine.rpush(b"nums".to_vec(), b"3".to_vec()).unwrap();

        let range = engine.lrange(b"nums", 0, -1).unwrap();
        assert_eq!(range, vec![b"2".to_vec(), b"1".to_vec(), b"3".to_vec()]);
        assert_eq!(engine.llen(b"nums").unwrap(), 3);

        assert_eq!(engine.lpop(b"nums").unwrap().unwrap(), b"2".to_vec());
        assert_eq!(engine.rpop(b"nums").unwrap().unwrap(), b"3".to_vec());

        let range = engine.lrange(b"nums", 0, -1).unwrap();
        assert_eq!(range, vec![b"1".to_vec()]);
    }

    #[test]
    fn list_pop_to_empty_removes_entry() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.lpush(b"nums".to_vec(), b"1".to_vec()).unwrap();
        assert_eq!(engine.lpop(b"nums").unwrap().unwrap(), b"1".to_vec());
        assert_eq!(engine.llen(b"nums").unwrap(), 0);
        assert_eq!(engine.size(), 0);
    }

    #[test]
    fn wrong_type_errors() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine.set(b"s".to_vec(), b"hello".to_vec(), 0).unwrap();
        assert!(matches!(
            engine.lpush(b"s".to_vec(), b"x".to_vec()),
            Err(HkvError::WrongType)
        ));
        assert_eq!(engine.get(b"s").unwrap().unwrap(), b"hello".to_vec());
    }

    #[test]
    fn mset_mget_roundtrip() {
        let engine = MemoryEngine::with_shard_count(2, 100);
        engine
            .mset(vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
            ])
            .unwrap();

        let values = engine.mget(&[b"a".to_vec(), b"b".to_vec(), b"missing".to_vec()]).unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), Some(b"2".to_vec()), None]);
    }
}
