//! # KVEngine trait
//!
//! The operation surface every per-shard storage backend implements.
//! `ttl_seconds == 0` means "no expiry", matching the line protocol's
//! `SET k v [ttl]` convention.

use lunarkv_common::HkvResult;

pub trait KVEngine: Send + Sync {
    fn set(&self, key: Vec<u8>, value: Vec<u8>, ttl_seconds: u64) -> HkvResult<()>;
    fn get(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>>;
    fn del(&self, key: &[u8]) -> HkvResult<bool>;
    fn clear(&self);
    fn size(&self) -> usize;
    fn keys(&self) -> Vec<Vec<u8>>;

    fn mset(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> HkvResult<()>;
    fn mget(&self, keys: &[Vec<u8>]) -> HkvResult<Vec<Option<Vec<u8>>>>;

    fn lpush(&self, key: Vec<u8>, value: Vec<u8>) -> HkvResult<()>;
    fn rpush(&self, key: Vec<u8>, value: Vec<u8>) -> HkvResult<()>;
    fn lpop(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>>;
    fn rpop(&self, key: &[u8]) -> HkvResult<Option<Vec<u8>>>;
    fn lrange(&self, key: &[u8], start: i64, stop: i64) -> HkvResult<Vec<Vec<u8>>>;
    fn llen(&self, key: &[u8]) -> HkvResult<usize>;

    /// Drops every entry whose expiry has passed. Returns the count removed.
    fn cleanup_expired(&self) -> usize;
}
