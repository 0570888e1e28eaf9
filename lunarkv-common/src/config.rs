use serde::{Deserialize, Serialize};

/// Configuration for the line-protocol and HTTP servers, loadable from a
/// TOML file via `--config <path>` and overridable by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub http_port: u16,
    pub shard_count: usize,
    pub capacity_per_shard: usize,
    pub max_clients: usize,
    pub worker_threads: usize,
    pub snapshot_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            http_port: 8080,
            shard_count: 4,
            capacity_per_shard: 250,
            max_clients: 1024,
            worker_threads: num_cpus(),
            snapshot_path: "autosave.db".to_string(),
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ServerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 7878);
        assert!(cfg.shard_count > 0);
        assert!(cfg.capacity_per_shard > 0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = ServerConfig::from_toml_str("port = 9999\n").unwrap();
        assert_eq!(cfg.port, 9999);
        assert_eq!(cfg.host, "127.0.0.1");
    }
}
