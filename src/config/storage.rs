//! Storage configuration types.

use serde::Deserialize;

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. Parent directories are created on connect.
    pub path: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_secs: u64,
    /// Use WAL journaling so readers keep the previous snapshot while a
    /// reload transaction is open.
    /// Default: true
    pub wal: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/sessionflow.db".to_string(),
            max_connections: 4,
            busy_timeout_secs: 5,
            wal: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let storage = StorageConfig::default();
        assert_eq!(storage.path, "data/sessionflow.db");
        assert_eq!(storage.max_connections, 4);
        assert_eq!(storage.busy_timeout_secs, 5);
        assert!(storage.wal);
    }
}
