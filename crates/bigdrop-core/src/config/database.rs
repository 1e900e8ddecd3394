//! Database configuration.

use serde::{Deserialize, Serialize};

/// Transfer registry backend and connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Registry backend: `"postgres"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// PostgreSQL connection URL. Ignored by the memory backend.
    #[serde(default)]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Idle connection timeout in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Whether the registry lives in process memory.
    pub fn is_memory(&self) -> bool {
        self.provider.eq_ignore_ascii_case("memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

fn default_provider() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}
