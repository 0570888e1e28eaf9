//! # Provider
//!
//! An optional write-through/read-fallback capability attached to an
//! engine. Grounded on `original_source/src/providers/provider.hpp`'s
//! nine-method abstract interface; the engine never fails a local
//! operation because of a provider error, it only logs.

/// Connection parameters for a provider backend.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// A pluggable secondary backend an engine can mirror writes to.
///
/// Implementations are expected to be cheap to call and safe to share
/// behind a single engine; the engine serializes access to its
/// provider behind its own per-shard lock.
pub trait Provider: Send + Sync {
    fn connect(&mut self, config: &ProviderConfig) -> bool;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;

    fn set(&self, key: &[u8], value: &[u8], ttl_seconds: u64) -> bool;
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn del(&self, key: &[u8]) -> bool;

    fn mset(&self, kvs: &[(Vec<u8>, Vec<u8>)]) -> bool;
    fn mget(&self, keys: &[Vec<u8>]) -> Vec<Option<Vec<u8>>>;

    fn sync(&self) -> bool;
    fn backup(&self, path: &str) -> bool;
    fn restore(&self, path: &str) -> bool;
}
