// lunarkv-common - Shared error types and configuration for LunarKV

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::{HkvError, HkvResult};
