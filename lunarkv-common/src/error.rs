use thiserror::Error;

/// Errors surfaced across the engine, server, and client crates.
///
/// Transport adapters (line protocol, HTTP) translate these into their own
/// wire representations; callers never need to match on the originating
/// component.
#[derive(Debug, Error)]
pub enum HkvError {
    #[error("key not found")]
    NotFound,

    #[error("wrong type for key")]
    WrongType,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("malformed input: {0}")]
    BadFormat(String),

    #[error("truncated data")]
    Truncated,

    #[error("shard count must be greater than 0")]
    InvalidShardCount,

    #[error("server is stopped")]
    Stopped,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HkvResult<T> = std::result::Result<T, HkvError>;
