//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing commands to the
//! LunarKV line server over the plain-text line protocol.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling and protocol details.
//! 2. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **Performance First**: Prefer direct TCP writes and buffer reuse.
//!
//! `KEYS` and `LRANGE` are deliberately not exposed here: the line
//! protocol has no length prefix for responses whose line count isn't
//! fixed by the request (unlike `MGET`, where it equals the number of
//! keys sent). Reach them over the raw line protocol or the HTTP JSON
//! surface instead, both of which return well-formed lists.

use std::fmt;
use std::time::Duration;

use crate::pool::{ConnectionPool, PoolConfig};
use crate::protocol::{as_error, NIL};

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    Io(std::io::Error),
    /// Line framing error (e.g. connection closed mid-response).
    Protocol,
    /// Server returned an `ERR ...` reply.
    Server { message: Vec<u8> },
    /// Response did not match what the command expected.
    UnexpectedResponse,
    /// Pool is at capacity and no idle connections are available.
    PoolExhausted,
    /// Address could not be parsed into a socket address.
    InvalidAddress,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(err) => write!(f, "io error: {}", err),
            ClientError::Protocol => write!(f, "protocol error"),
            ClientError::Server { message } => {
                write!(f, "server error: {}", String::from_utf8_lossy(message))
            }
            ClientError::UnexpectedResponse => write!(f, "unexpected response"),
            ClientError::PoolExhausted => write!(f, "connection pool exhausted"),
            ClientError::InvalidAddress => write!(f, "invalid address"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

/// Configuration for the synchronous client and its pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:7878".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:7878".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
        }
    }
}

/// Synchronous client with connection pooling.
///
/// This is a facade over the pool and line-protocol encoder/decoder.
/// Each call acquires a connection, executes one command, and returns
/// the connection to the pool.
pub struct KVClient {
    pool: ConnectionPool,
}

fn to_u64_bytes(value: u64) -> Vec<u8> {
    value.to_string().into_bytes()
}

fn check_error(line: &[u8]) -> ClientResult<()> {
    if let Some(message) = as_error(line) {
        return Err(ClientError::Server { message: message.to_vec() });
    }
    Ok(())
}

impl KVClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let mut config = ClientConfig::default();
        config.addr = addr.into();
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool = ConnectionPool::new(PoolConfig {
            addr: config.addr,
            max_idle: config.max_idle,
            max_total: config.max_total,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            connect_timeout: config.connect_timeout,
        })?;
        Ok(KVClient { pool })
    }

    /// Fetches a value by key. Returns `Ok(None)` when the key is missing.
    pub fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"GET", key])?;
        check_error(&line)?;
        if line == NIL {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    /// Sets a value for a key without expiration.
    pub fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"SET", key, value])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Sets a value with a TTL in seconds.
    pub fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        let ttl_bytes = to_u64_bytes(ttl.as_secs());
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"SET", key, value, &ttl_bytes])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Deletes a key. Returns true when a key was removed.
    pub fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"DEL", key])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(true)
        } else if line == NIL {
            Ok(false)
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Batched set. Semantically identical to calling `set` in order.
    pub fn mset(&self, pairs: &[(&[u8], &[u8])]) -> ClientResult<()> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(1 + pairs.len() * 2);
        args.push(b"MSET");
        for (key, value) in pairs {
            args.push(key);
            args.push(value);
        }
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&args)?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Batched get. Returns one entry per requested key, in order.
    pub fn mget(&self, keys: &[&[u8]]) -> ClientResult<Vec<Option<Vec<u8>>>> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(1 + keys.len());
        args.push(b"MGET");
        args.extend_from_slice(keys);

        let mut conn = self.pool.acquire()?;
        let lines = conn.exec_lines(&args, keys.len())?;
        lines
            .into_iter()
            .map(|line| {
                check_error(&line)?;
                Ok(if line == NIL { None } else { Some(line) })
            })
            .collect()
    }

    /// Prepends `value` to the list at `key`, creating it if absent.
    pub fn lpush(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        self.push(b"LPUSH", key, value)
    }

    /// Appends `value` to the list at `key`, creating it if absent.
    pub fn rpush(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        self.push(b"RPUSH", key, value)
    }

    fn push(&self, cmd: &[u8], key: &[u8], value: &[u8]) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[cmd, key, value])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Pops and returns the head of the list at `key`.
    pub fn lpop(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.pop(b"LPOP", key)
    }

    /// Pops and returns the tail of the list at `key`.
    pub fn rpop(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.pop(b"RPOP", key)
    }

    fn pop(&self, cmd: &[u8], key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[cmd, key])?;
        check_error(&line)?;
        if line == NIL {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    /// Length of the list at `key`; 0 if absent.
    pub fn llen(&self, key: &[u8]) -> ClientResult<i64> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"LLEN", key])?;
        check_error(&line)?;
        parse_decimal(&line)
    }

    /// Current live entry count across the whole keyspace.
    pub fn size(&self) -> ClientResult<i64> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"SIZE"])?;
        check_error(&line)?;
        parse_decimal(&line)
    }

    /// Drops every entry. Does not touch an attached provider.
    pub fn clear(&self) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"CLEAR"])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Sweeps expired entries immediately.
    pub fn cleanup(&self) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"CLEANUP"])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Writes a snapshot of all string entries to `path` on the server.
    pub fn save(&self, path: &str) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"SAVE", path.as_bytes()])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Loads a snapshot from `path` on the server into the live keyspace.
    pub fn load(&self, path: &str) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"LOAD", path.as_bytes()])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }

    /// Pings the server, returning `true` on `PONG!`.
    pub fn ping(&self) -> ClientResult<bool> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"PING"])?;
        check_error(&line)?;
        Ok(line == b"PONG!")
    }

    /// Returns (active, queued) worker counts from the server's task queue.
    pub fn threads(&self) -> ClientResult<(i64, i64)> {
        let mut conn = self.pool.acquire()?;
        let lines = conn.exec_lines(&[b"THREADS"], 2)?;
        check_error(&lines[0])?;
        Ok((parse_decimal(&lines[0])?, parse_decimal(&lines[1])?))
    }

    /// Returns (shard_count, total_key_count) from `SHARD INFO`.
    pub fn shard_info(&self) -> ClientResult<(i64, i64)> {
        let mut conn = self.pool.acquire()?;
        let lines = conn.exec_lines(&[b"SHARD", b"INFO"], 2)?;
        check_error(&lines[0])?;
        let shards = parse_decimal_after_colon(&lines[0])?;
        let keys = parse_decimal_after_colon(&lines[1])?;
        Ok((shards, keys))
    }

    /// Returns the shard index a key currently hashes to.
    pub fn shard_locate(&self, key: &[u8]) -> ClientResult<i64> {
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"SHARD", b"LOCATE", key])?;
        check_error(&line)?;
        parse_decimal(&line)
    }

    /// Triggers a shard-count rebalance.
    pub fn shard_rebalance(&self, new_shard_count: usize) -> ClientResult<()> {
        let count_bytes = to_u64_bytes(new_shard_count as u64);
        let mut conn = self.pool.acquire()?;
        let line = conn.exec(&[b"SHARD", b"REBALANCE", &count_bytes])?;
        check_error(&line)?;
        if line == b"OK" {
            Ok(())
        } else {
            Err(ClientError::UnexpectedResponse)
        }
    }
}

fn parse_decimal(line: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ClientError::UnexpectedResponse)
}

fn parse_decimal_after_colon(line: &[u8]) -> ClientResult<i64> {
    let text = std::str::from_utf8(line).map_err(|_| ClientError::UnexpectedResponse)?;
    let value = text.rsplit(':').next().ok_or(ClientError::UnexpectedResponse)?;
    value.trim().parse::<i64>().map_err(|_| ClientError::UnexpectedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_lines() {
        assert_eq!(parse_decimal(b"42").unwrap(), 42);
        assert!(parse_decimal(b"nope").is_err());
    }

    #[test]
    fn parses_labelled_colon_lines() {
        assert_eq!(parse_decimal_after_colon(b"shards: 4").unwrap(), 4);
        assert_eq!(parse_decimal_after_colon(b"keys: 100").unwrap(), 100);
    }
}
